use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::blueprint::{
    IntakeBlueprint, DOCUMENTS_PROCESSED_NOTICE, EVALUATION_CANCELLED_NOTICE,
    EVALUATION_FAILED_NOTICE, PROCESSING_NOTICE, UPLOAD_ANNOUNCEMENT,
};
use super::documents::{DocumentError, DocumentHandle, DocumentProcessor};
use super::domain::{
    ApplicantRecord, DocumentSet, DocumentSlot, FieldId, FieldKind, FieldSpec, PreconditionError,
    ValidationError, WizardPhase,
};
use super::eligibility::{
    rules, EligibilityConfig, EligibilityError, EligibilityEvaluator, EligibilityVerdict,
    NumericInputPolicy,
};
use super::notifications::{Notification, Notifier, SilentNotifier};
use super::snapshot::{DocumentStatus, WizardSnapshot};
use super::transcript::Transcript;

/// Tunables applied to every engine built by a service.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    /// Pause between document verification and the verdict.
    pub analysis_delay: Duration,
    pub eligibility: EligibilityConfig,
}

/// Error raised by wizard operations. Every failure leaves the engine state unchanged,
/// except evaluation failures which roll the engine back to `AwaitingDocuments`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error("eligibility evaluation was cancelled")]
    Cancelled,
}

/// Proof that an evaluation has started; consumed when it finishes or aborts.
#[derive(Debug)]
pub struct EvaluationTicket {
    documents: Vec<(DocumentSlot, DocumentHandle)>,
    analysis_delay: Duration,
    verified: bool,
}

impl EvaluationTicket {
    pub fn documents(&self) -> &[(DocumentSlot, DocumentHandle)] {
        &self.documents
    }

    pub fn analysis_delay(&self) -> Duration {
        self.analysis_delay
    }
}

/// Run the external verification step for each attached document, stopping on cancellation.
pub async fn verify_documents<P>(
    processor: &P,
    ticket: &EvaluationTicket,
    cancel: &CancellationToken,
) -> Result<(), WizardError>
where
    P: DocumentProcessor + ?Sized,
{
    for (slot, handle) in ticket.documents() {
        if cancel.is_cancelled() {
            return Err(WizardError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WizardError::Cancelled),
            result = processor.process(*slot, handle) => result.map_err(WizardError::from),
        };
        outcome?;
    }

    Ok(())
}

/// Wait out the analysis latency unless cancelled first.
pub async fn analysis_pause(
    ticket: &EvaluationTicket,
    cancel: &CancellationToken,
) -> Result<(), WizardError> {
    if cancel.is_cancelled() {
        return Err(WizardError::Cancelled);
    }
    if ticket.analysis_delay.is_zero() {
        return Ok(());
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WizardError::Cancelled),
        _ = tokio::time::sleep(ticket.analysis_delay) => Ok(()),
    }
}

async fn external_steps<P>(
    engine: &mut WizardEngine,
    ticket: &mut EvaluationTicket,
    processor: &P,
    cancel: &CancellationToken,
) -> Result<(), WizardError>
where
    P: DocumentProcessor + ?Sized,
{
    verify_documents(processor, ticket, cancel).await?;
    engine.documents_verified(ticket)?;
    analysis_pause(ticket, cancel).await
}

/// Holds the ticket of a running [`WizardEngine::evaluate`]; aborts it if dropped unfinished.
struct InFlightEvaluation<'a> {
    engine: &'a mut WizardEngine,
    ticket: Option<EvaluationTicket>,
}

impl Drop for InFlightEvaluation<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            warn!("evaluation dropped before completion");
            self.engine.abort_evaluation(ticket, &WizardError::Cancelled);
        }
    }
}

#[derive(Debug, Clone)]
struct WizardState {
    phase: WizardPhase,
    record: ApplicantRecord,
    transcript: Transcript,
    documents: DocumentSet,
    processing: bool,
    verdict: Option<EligibilityVerdict>,
}

impl WizardState {
    fn position(&self, blueprint: &IntakeBlueprint) -> usize {
        match self.phase {
            WizardPhase::Collecting { position } => position,
            _ => blueprint.step_count(),
        }
    }

    fn snapshot(&self, blueprint: &IntakeBlueprint) -> WizardSnapshot {
        let current_field = match self.phase {
            WizardPhase::Collecting { position } => blueprint.field_at(position).cloned(),
            _ => None,
        };

        WizardSnapshot {
            phase: self.phase,
            position: self.position(blueprint),
            step_count: blueprint.step_count(),
            current_field,
            record: self.record.clone(),
            summary: blueprint.summary(&self.record),
            transcript: self.transcript.entries().to_vec(),
            documents: DocumentStatus::from(&self.documents),
            processing: self.processing,
            can_evaluate: self.documents.is_complete(),
            verdict: self.verdict.clone(),
        }
    }
}

/// Single-owner state machine driving one intake conversation.
///
/// `Collecting(k)` advances to `Collecting(k + 1)` and then `AwaitingDocuments`; evaluation
/// moves through `Evaluating` to `Complete`. The record is writable only while collecting and
/// documents only while awaiting them. Every successful operation publishes a fresh
/// [`WizardSnapshot`] to subscribers.
pub struct WizardEngine {
    blueprint: Arc<IntakeBlueprint>,
    evaluator: EligibilityEvaluator,
    analysis_delay: Duration,
    notifier: Arc<dyn Notifier>,
    state: WizardState,
    updates: watch::Sender<WizardSnapshot>,
}

impl fmt::Debug for WizardEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardEngine")
            .field("phase", &self.state.phase)
            .field("processing", &self.state.processing)
            .field("transcript_len", &self.state.transcript.len())
            .finish_non_exhaustive()
    }
}

impl WizardEngine {
    pub fn new(
        blueprint: Arc<IntakeBlueprint>,
        settings: EngineSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut transcript = Transcript::default();
        let phase = match blueprint.field_at(0) {
            Some(first) => {
                transcript.advisor(first.prompt);
                WizardPhase::Collecting { position: 0 }
            }
            None => {
                transcript.advisor(UPLOAD_ANNOUNCEMENT);
                WizardPhase::AwaitingDocuments
            }
        };

        let state = WizardState {
            phase,
            record: ApplicantRecord::empty(),
            transcript,
            documents: DocumentSet::default(),
            processing: false,
            verdict: None,
        };
        let (updates, _) = watch::channel(state.snapshot(&blueprint));

        Self {
            blueprint,
            evaluator: EligibilityEvaluator::new(settings.eligibility),
            analysis_delay: settings.analysis_delay,
            notifier,
            state,
            updates,
        }
    }

    /// Engine over the standard blueprint with default thresholds, no delay and no notifications.
    pub fn standard() -> Self {
        Self::new(
            Arc::new(IntakeBlueprint::standard()),
            EngineSettings::default(),
            Arc::new(SilentNotifier),
        )
    }

    pub fn blueprint(&self) -> &IntakeBlueprint {
        &self.blueprint
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase
    }

    pub fn position(&self) -> usize {
        self.state.position(&self.blueprint)
    }

    pub fn step_count(&self) -> usize {
        self.blueprint.step_count()
    }

    pub fn current_field(&self) -> Option<&FieldSpec> {
        match self.state.phase {
            WizardPhase::Collecting { position } => self.blueprint.field_at(position),
            _ => None,
        }
    }

    pub fn record(&self) -> &ApplicantRecord {
        &self.state.record
    }

    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    pub fn documents(&self) -> &DocumentSet {
        &self.state.documents
    }

    pub fn processing(&self) -> bool {
        self.state.processing
    }

    pub fn verdict(&self) -> Option<&EligibilityVerdict> {
        self.state.verdict.as_ref()
    }

    pub fn can_evaluate(&self) -> bool {
        self.state.documents.is_complete()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        self.state.snapshot(&self.blueprint)
    }

    /// Receive a snapshot after every successful operation.
    pub fn subscribe(&self) -> watch::Receiver<WizardSnapshot> {
        self.updates.subscribe()
    }

    /// Store a value for a field that has not been advanced past yet.
    pub fn set_field(&mut self, field: FieldId, value: impl Into<String>) -> Result<(), WizardError> {
        self.ensure_idle()?;

        let WizardPhase::Collecting { position } = self.state.phase else {
            return Err(ValidationError::FieldLocked { field }.into());
        };
        let index = self
            .blueprint
            .position_of(field)
            .ok_or_else(|| ValidationError::UnknownField(field.key().to_string()))?;
        if index < position {
            return Err(ValidationError::FieldLocked { field }.into());
        }

        self.state.record.set(field, value.into());
        debug!(%field, "field value stored");
        self.publish();
        Ok(())
    }

    /// Commit the current field and move to the next step, or to the document phase.
    pub fn advance(&mut self) -> Result<WizardPhase, WizardError> {
        self.ensure_idle()?;

        let WizardPhase::Collecting { position } = self.state.phase else {
            return Err(ValidationError::CollectionFinished.into());
        };
        let blueprint = Arc::clone(&self.blueprint);
        let field = blueprint
            .field_at(position)
            .ok_or(ValidationError::CollectionFinished)?;

        let value = self.state.record.get(field.id).to_string();
        if value.is_empty() {
            warn!(field = %field.id, "advance rejected: required field missing");
            self.notify(Notification::required_field());
            return Err(ValidationError::RequiredFieldMissing { field: field.id }.into());
        }
        if self.rejects_numeric(field, &value) {
            warn!(field = %field.id, "advance rejected: value is not a whole number");
            self.notify(Notification::invalid_number(field));
            return Err(ValidationError::InvalidNumber {
                field: field.id,
                value,
            }
            .into());
        }

        self.state.transcript.applicant(value);
        let next = position + 1;
        match blueprint.field_at(next) {
            Some(next_field) => {
                self.state.transcript.advisor(next_field.prompt);
                self.state.phase = WizardPhase::Collecting { position: next };
                debug!(field = %next_field.id, position = next, "advanced to next field");
            }
            None => {
                self.state.transcript.advisor(UPLOAD_ANNOUNCEMENT);
                self.state.phase = WizardPhase::AwaitingDocuments;
                info!(steps = blueprint.step_count(), "all fields collected; awaiting documents");
            }
        }

        self.publish();
        Ok(self.state.phase)
    }

    /// Attach (or replace) a document while the upload phase is open.
    pub fn set_document(
        &mut self,
        slot: DocumentSlot,
        handle: DocumentHandle,
    ) -> Result<(), WizardError> {
        self.ensure_idle()?;

        if self.state.phase != WizardPhase::AwaitingDocuments {
            return Err(PreconditionError::UploadPhaseInactive {
                phase: self.state.phase.label(),
            }
            .into());
        }

        info!(%slot, file = %handle.file_name, "document attached");
        self.state.documents.set(slot, handle);
        self.notify(Notification::document_uploaded(slot));
        self.publish();
        Ok(())
    }

    /// Full evaluation: verify documents, wait out the analysis latency, then apply the
    /// eligibility rule. Cancellation is checked before each step.
    ///
    /// Cancel safe: dropping the future before it resolves rolls the engine back to
    /// `AwaitingDocuments` as if the token had been cancelled.
    pub async fn evaluate<P>(
        &mut self,
        processor: &P,
        cancel: &CancellationToken,
    ) -> Result<EligibilityVerdict, WizardError>
    where
        P: DocumentProcessor + ?Sized,
    {
        let ticket = self.begin_evaluation()?;
        let mut in_flight = InFlightEvaluation {
            engine: self,
            ticket: Some(ticket),
        };

        let outcome = match in_flight.ticket.as_mut() {
            Some(ticket) => {
                external_steps(&mut *in_flight.engine, ticket, processor, cancel).await
            }
            None => Err(PreconditionError::NotEvaluating.into()),
        };

        let ticket = in_flight
            .ticket
            .take()
            .ok_or(PreconditionError::NotEvaluating)?;
        match outcome {
            Ok(()) => in_flight.engine.finish_evaluation(ticket),
            Err(err) => {
                in_flight.engine.abort_evaluation(ticket, &err);
                Err(err)
            }
        }
    }

    /// Enter `Evaluating`. Fails without side effects unless both documents are attached.
    pub fn begin_evaluation(&mut self) -> Result<EvaluationTicket, WizardError> {
        if self.state.processing {
            return Err(PreconditionError::EvaluationInProgress.into());
        }
        if self.state.phase == WizardPhase::Complete {
            return Err(PreconditionError::AlreadyComplete.into());
        }

        let missing = self.state.documents.missing();
        if !missing.is_empty() {
            warn!(?missing, "evaluation rejected: documents missing");
            self.notify(Notification::missing_documents());
            return Err(PreconditionError::DocumentsMissing { missing }.into());
        }

        self.state.processing = true;
        self.state.phase = WizardPhase::Evaluating;
        self.state.transcript.advisor(PROCESSING_NOTICE);
        info!("eligibility evaluation started");
        self.publish();

        Ok(EvaluationTicket {
            documents: self.state.documents.present(),
            analysis_delay: self.analysis_delay,
            verified: false,
        })
    }

    /// Record that the external document step succeeded.
    pub fn documents_verified(&mut self, ticket: &mut EvaluationTicket) -> Result<(), WizardError> {
        if self.state.phase != WizardPhase::Evaluating {
            return Err(PreconditionError::NotEvaluating.into());
        }
        if ticket.verified {
            return Ok(());
        }

        ticket.verified = true;
        self.state.transcript.advisor(DOCUMENTS_PROCESSED_NOTICE);
        debug!("documents verified");
        self.publish();
        Ok(())
    }

    /// Apply the eligibility rule and move to `Complete`.
    pub fn finish_evaluation(
        &mut self,
        ticket: EvaluationTicket,
    ) -> Result<EligibilityVerdict, WizardError> {
        if self.state.phase != WizardPhase::Evaluating {
            return Err(PreconditionError::NotEvaluating.into());
        }
        if !ticket.verified {
            return Err(PreconditionError::DocumentsUnverified.into());
        }

        match self.evaluator.try_evaluate(&self.state.record) {
            Ok(verdict) => {
                self.state.transcript.advisor(verdict.rationale.clone());
                self.state.verdict = Some(verdict.clone());
                self.state.processing = false;
                self.state.phase = WizardPhase::Complete;
                info!(eligible = verdict.eligible, "eligibility evaluation complete");
                self.publish();
                Ok(verdict)
            }
            Err(err) => {
                let err = WizardError::from(err);
                self.abort_evaluation(ticket, &err);
                Err(err)
            }
        }
    }

    /// Roll an in-flight evaluation back to `AwaitingDocuments` so it can be retried.
    pub fn abort_evaluation(&mut self, ticket: EvaluationTicket, reason: &WizardError) {
        drop(ticket);
        if self.state.phase != WizardPhase::Evaluating {
            return;
        }

        let notice = match reason {
            WizardError::Cancelled => EVALUATION_CANCELLED_NOTICE,
            _ => EVALUATION_FAILED_NOTICE,
        };
        self.state.transcript.advisor(notice);
        self.state.processing = false;
        self.state.phase = WizardPhase::AwaitingDocuments;
        warn!(error = %reason, "eligibility evaluation aborted");
        self.publish();
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.state.processing {
            return Err(PreconditionError::EvaluationInProgress.into());
        }
        Ok(())
    }

    fn rejects_numeric(&self, field: &FieldSpec, value: &str) -> bool {
        self.evaluator.config().numeric_inputs == NumericInputPolicy::Reject
            && matches!(field.kind, FieldKind::Number)
            && rules::parse_strict_integer(value).is_none()
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.notify(notification) {
            warn!(error = %err, "notification delivery failed");
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
