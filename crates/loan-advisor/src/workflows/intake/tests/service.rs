use super::common::*;
use std::sync::Arc;
use std::time::Duration;

use crate::workflows::intake::domain::{
    DocumentSlot, FieldId, PreconditionError, ValidationError, WizardPhase,
};
use crate::workflows::intake::engine::{EngineSettings, WizardError};
use crate::workflows::intake::repository::{RepositoryError, SessionId};
use crate::workflows::intake::{DocumentError, IntakeService, IntakeServiceError};

#[tokio::test]
async fn start_registers_sessions_with_sequential_ids() {
    let (service, repository, _) = build_service(Duration::ZERO, Duration::ZERO);

    let (first, snapshot) = service.start().expect("first session");
    let (second, _) = service.start().expect("second session");

    assert!(first.0.starts_with("session-"));
    assert_ne!(first, second);
    assert_eq!(repository.len(), 2);
    assert_eq!(snapshot.phase, WizardPhase::Collecting { position: 0 });
    assert_eq!(snapshot.transcript.len(), 1);
    assert_eq!(
        snapshot.current_field.map(|spec| spec.id),
        Some(FieldId::Name)
    );
}

#[tokio::test]
async fn unknown_sessions_are_reported_as_not_found() {
    let (service, _, _) = build_service(Duration::ZERO, Duration::ZERO);
    let missing = SessionId("session-999999".to_string());

    let err = service.snapshot(&missing).await.expect_err("no session");

    assert_eq!(err, IntakeServiceError::Repository(RepositoryError::NotFound));
}

#[tokio::test]
async fn full_session_produces_a_verdict() {
    let (service, _, notifier) = build_service(Duration::ZERO, Duration::ZERO);
    let (id, _) = service.start().expect("session starts");
    drive_to_documents(&service, &id).await;

    let verdict = service.evaluate(&id).await.expect("evaluation succeeds");

    assert!(verdict.eligible);
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, WizardPhase::Complete);
    assert_eq!(snapshot.verdict, Some(verdict));
    assert_eq!(snapshot.summary.len(), 8);
    assert!(snapshot.documents.salary_slip && snapshot.documents.aadhaar_card);
    assert_eq!(
        notifier.titles(),
        vec!["File Uploaded".to_string(), "File Uploaded".to_string()]
    );
}

#[tokio::test]
async fn rejected_advance_leaves_the_session_in_place() {
    let (service, _, notifier) = build_service(Duration::ZERO, Duration::ZERO);
    let (id, _) = service.start().expect("session starts");

    let err = service.advance(&id).await.expect_err("name is empty");

    assert_eq!(
        err,
        IntakeServiceError::Wizard(WizardError::Validation(
            ValidationError::RequiredFieldMissing {
                field: FieldId::Name
            }
        ))
    );
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.position, 0);
    assert_eq!(notifier.titles(), vec!["Required Field".to_string()]);
}

#[tokio::test]
async fn uploads_validate_the_file_format() {
    let (service, _, _) = build_service(Duration::ZERO, Duration::ZERO);
    let (id, _) = service.start().expect("session starts");
    drive_to_documents(&service, &id).await;

    let err = service
        .upload(&id, DocumentSlot::SalarySlip, "salary.docx".to_string())
        .await
        .expect_err("docx is not accepted");

    assert!(matches!(
        err,
        IntakeServiceError::Wizard(WizardError::Document(
            DocumentError::UnsupportedFormat { .. }
        ))
    ));
}

#[tokio::test(start_paused = true)]
async fn evaluation_waits_for_every_simulated_delay() {
    let (service, _, _) = build_service(Duration::from_millis(1500), Duration::from_secs(2));
    let (id, _) = service.start().expect("session starts");
    drive_to_documents(&service, &id).await;

    let started = tokio::time::Instant::now();
    service.evaluate(&id).await.expect("evaluation succeeds");

    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn processing_is_observable_and_cancellable() {
    let (service, _, _) = build_service(Duration::from_millis(1500), Duration::from_secs(2));
    let service = Arc::new(service);
    let (id, _) = service.start().expect("session starts");
    drive_to_documents(&service, &id).await;
    let mut updates = service.subscribe(&id).await.expect("subscription");

    let task = tokio::spawn({
        let service = service.clone();
        let id = id.clone();
        async move { service.evaluate(&id).await }
    });

    updates
        .wait_for(|snapshot| snapshot.processing)
        .await
        .expect("engine alive");
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert!(snapshot.processing);
    assert_eq!(snapshot.phase, WizardPhase::Evaluating);
    assert_eq!(
        service
            .upload(&id, DocumentSlot::SalarySlip, "new.pdf".to_string())
            .await
            .map(|_| ()),
        Err(IntakeServiceError::Wizard(WizardError::Precondition(
            PreconditionError::EvaluationInProgress
        )))
    );

    service.cancel(&id).expect("cancel accepted");
    let outcome = task.await.expect("evaluation task joins");

    assert_eq!(
        outcome,
        Err(IntakeServiceError::Wizard(WizardError::Cancelled))
    );
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert!(!snapshot.processing);
    assert_eq!(snapshot.phase, WizardPhase::AwaitingDocuments);
    assert!(snapshot.verdict.is_none());
}

#[tokio::test]
async fn cancel_without_an_evaluation_is_a_precondition_error() {
    let (service, _, _) = build_service(Duration::ZERO, Duration::ZERO);
    let (id, _) = service.start().expect("session starts");

    assert_eq!(
        service.cancel(&id),
        Err(IntakeServiceError::Wizard(WizardError::Precondition(
            PreconditionError::NotEvaluating
        )))
    );
}

#[tokio::test]
async fn failed_document_processing_allows_a_retry() {
    let repository = Arc::new(MemorySessions::default());
    let service = IntakeService::new(
        repository,
        Arc::new(MemoryNotifier::default()),
        Arc::new(FailingProcessor {
            rejected: DocumentSlot::SalarySlip,
        }),
        EngineSettings::default(),
    );
    let (id, _) = service.start().expect("session starts");
    for (field, value) in eligible_answers() {
        service
            .set_field(&id, field, value.to_string())
            .await
            .expect("field");
        service.advance(&id).await.expect("advance");
    }
    for (slot, name) in [
        (DocumentSlot::SalarySlip, "slip.pdf"),
        (DocumentSlot::AadhaarCard, "aadhaar.pdf"),
    ] {
        service
            .upload(&id, slot, name.to_string())
            .await
            .expect("upload");
    }

    let err = service.evaluate(&id).await.expect_err("slip rejected");

    assert!(matches!(
        err,
        IntakeServiceError::Wizard(WizardError::Document(
            DocumentError::ProcessingFailed { .. }
        ))
    ));
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, WizardPhase::AwaitingDocuments);
    assert!(snapshot.can_evaluate);
}

#[tokio::test]
async fn close_drops_the_session() {
    let (service, repository, _) = build_service(Duration::ZERO, Duration::ZERO);
    let (id, _) = service.start().expect("session starts");

    service.close(&id).expect("session closes");

    assert_eq!(repository.len(), 0);
    assert_eq!(
        service.close(&id),
        Err(IntakeServiceError::Repository(RepositoryError::NotFound))
    );
}

#[tokio::test]
async fn repository_outages_surface_as_repository_errors() {
    let service = IntakeService::new(
        Arc::new(UnavailableSessions),
        Arc::new(MemoryNotifier::default()),
        Arc::new(crate::workflows::intake::SimulatedDocumentProcessor::default()),
        EngineSettings::default(),
    );

    assert!(matches!(
        service.start(),
        Err(IntakeServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_evaluation_releases_the_session() {
    let (service, _, _) = build_service(Duration::from_millis(1500), Duration::from_secs(2));
    let (id, _) = service.start().expect("session starts");
    drive_to_documents(&service, &id).await;

    let timed_out =
        tokio::time::timeout(Duration::from_millis(100), service.evaluate(&id)).await;
    assert!(timed_out.is_err());

    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, WizardPhase::AwaitingDocuments);
    assert!(!snapshot.processing);
    assert_eq!(
        service.cancel(&id),
        Err(IntakeServiceError::Wizard(WizardError::Precondition(
            PreconditionError::NotEvaluating
        )))
    );

    let verdict = service.evaluate(&id).await.expect("retry succeeds");
    assert!(verdict.eligible);
    let snapshot = service.snapshot(&id).await.expect("snapshot");
    assert_eq!(snapshot.phase, WizardPhase::Complete);
}
