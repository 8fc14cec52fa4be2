use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::intake::documents::{DocumentError, DocumentHandle, DocumentProcessor};
use crate::workflows::intake::domain::{ApplicantRecord, DocumentSlot, FieldId};
use crate::workflows::intake::engine::{EngineSettings, WizardEngine};
use crate::workflows::intake::notifications::{Notification, Notifier, NotifyError};
use crate::workflows::intake::repository::{
    RepositoryError, SessionId, SessionRepository, SharedEngine,
};
use crate::workflows::intake::{
    intake_router, IntakeBlueprint, IntakeService, SimulatedDocumentProcessor,
};

/// Field values for an applicant who clears the default thresholds.
pub(super) fn eligible_answers() -> Vec<(FieldId, &'static str)> {
    vec![
        (FieldId::Name, "Asha Rao"),
        (FieldId::Age, "34"),
        (FieldId::Income, "50000"),
        (FieldId::LoanType, "Home Loan"),
        (FieldId::LoanAmount, "2500000"),
        (FieldId::Emis, "5000"),
        (FieldId::CreditScore, "700"),
        (FieldId::PanNumber, "ABCDE1234F"),
    ]
}

pub(super) fn answers_with(
    overrides: &[(FieldId, &'static str)],
) -> Vec<(FieldId, &'static str)> {
    eligible_answers()
        .into_iter()
        .map(|(field, value)| {
            let value = overrides
                .iter()
                .find(|(candidate, _)| *candidate == field)
                .map_or(value, |(_, replacement)| *replacement);
            (field, value)
        })
        .collect()
}

pub(super) fn record_from(answers: &[(FieldId, &'static str)]) -> ApplicantRecord {
    answers.iter().copied().collect()
}

pub(super) fn engine_with(notifier: Arc<MemoryNotifier>, settings: EngineSettings) -> WizardEngine {
    WizardEngine::new(Arc::new(IntakeBlueprint::standard()), settings, notifier)
}

/// Set and advance every field in blueprint order.
pub(super) fn collect_all(engine: &mut WizardEngine, answers: &[(FieldId, &'static str)]) {
    for (field, value) in answers {
        engine.set_field(*field, *value).expect("field accepts value");
        engine.advance().expect("field advances");
    }
}

pub(super) fn attach_documents(engine: &mut WizardEngine) {
    engine
        .set_document(DocumentSlot::SalarySlip, handle("salary-slip.pdf"))
        .expect("salary slip attaches");
    engine
        .set_document(DocumentSlot::AadhaarCard, handle("aadhaar.png"))
        .expect("aadhaar attaches");
}

pub(super) fn handle(file_name: &str) -> DocumentHandle {
    DocumentHandle::from_file_name(file_name).expect("supported document")
}

/// Engine ready for evaluation with the given answers.
pub(super) fn ready_engine(answers: &[(FieldId, &'static str)]) -> WizardEngine {
    let mut engine = engine_with(Arc::new(MemoryNotifier::default()), EngineSettings::default());
    collect_all(&mut engine, answers);
    attach_documents(&mut engine);
    engine
}

pub(super) type TestService =
    IntakeService<MemorySessions, MemoryNotifier, SimulatedDocumentProcessor>;

pub(super) fn build_service(
    document_delay: Duration,
    analysis_delay: Duration,
) -> (TestService, Arc<MemorySessions>, Arc<MemoryNotifier>) {
    let repository = Arc::new(MemorySessions::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = IntakeService::new(
        repository.clone(),
        notifier.clone(),
        Arc::new(SimulatedDocumentProcessor::new(document_delay)),
        EngineSettings {
            analysis_delay,
            ..EngineSettings::default()
        },
    );
    (service, repository, notifier)
}

pub(super) async fn drive_to_documents(service: &TestService, id: &SessionId) {
    for (field, value) in eligible_answers() {
        service
            .set_field(id, field, value.to_string())
            .await
            .expect("field accepts value");
        service.advance(id).await.expect("field advances");
    }
    service
        .upload(id, DocumentSlot::SalarySlip, "salary-slip.pdf".to_string())
        .await
        .expect("salary slip uploads");
    service
        .upload(id, DocumentSlot::AadhaarCard, "aadhaar.jpg".to_string())
        .await
        .expect("aadhaar uploads");
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    intake_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemorySessions {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, SharedEngine>>>,
}

impl MemorySessions {
    pub(super) fn len(&self) -> usize {
        self.sessions.lock().expect("repository mutex poisoned").len()
    }
}

impl SessionRepository for MemorySessions {
    fn insert(&self, id: SessionId, engine: SharedEngine) -> Result<SharedEngine, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(id, engine.clone());
        Ok(engine)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableSessions;

impl SessionRepository for UnavailableSessions {
    fn insert(
        &self,
        _id: SessionId,
        _engine: SharedEngine,
    ) -> Result<SharedEngine, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        Err(RepositoryError::Unavailable("session store offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn titles(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|notification| notification.title)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl Notifier for OfflineNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("toast channel closed".to_string()))
    }
}

/// Processor that rejects one slot and accepts the rest.
pub(super) struct FailingProcessor {
    pub(super) rejected: DocumentSlot,
}

#[async_trait]
impl DocumentProcessor for FailingProcessor {
    async fn process(
        &self,
        slot: DocumentSlot,
        _handle: &DocumentHandle,
    ) -> Result<(), DocumentError> {
        if slot == self.rejected {
            return Err(DocumentError::ProcessingFailed {
                slot,
                reason: "image too blurry".to_string(),
            });
        }
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
