use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::blueprint::IntakeBlueprint;
use super::documents::{DocumentHandle, DocumentProcessor};
use super::domain::{DocumentSlot, FieldId, PreconditionError};
use super::eligibility::EligibilityVerdict;
use super::engine::{
    analysis_pause, verify_documents, EngineSettings, EvaluationTicket, WizardEngine, WizardError,
};
use super::notifications::Notifier;
use super::repository::{RepositoryError, SessionId, SessionRepository, SharedEngine};
use super::snapshot::WizardSnapshot;

/// Service owning one wizard engine per session plus the collaborators every engine shares.
pub struct IntakeService<R, N, P> {
    repository: Arc<R>,
    notifier: Arc<N>,
    processor: Arc<P>,
    blueprint: Arc<IntakeBlueprint>,
    settings: EngineSettings,
    evaluations: EvaluationTokens,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

impl<R, N, P> IntakeService<R, N, P>
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        processor: Arc<P>,
        settings: EngineSettings,
    ) -> Self {
        Self::with_blueprint(
            IntakeBlueprint::standard(),
            repository,
            notifier,
            processor,
            settings,
        )
    }

    pub fn with_blueprint(
        blueprint: IntakeBlueprint,
        repository: Arc<R>,
        notifier: Arc<N>,
        processor: Arc<P>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repository,
            notifier,
            processor,
            blueprint: Arc::new(blueprint),
            settings,
            evaluations: EvaluationTokens::default(),
        }
    }

    pub fn blueprint(&self) -> &IntakeBlueprint {
        &self.blueprint
    }

    /// Open a new session and return its initial snapshot.
    pub fn start(&self) -> Result<(SessionId, WizardSnapshot), IntakeServiceError> {
        let notifier: Arc<dyn Notifier> = self.notifier.clone();
        let engine = WizardEngine::new(self.blueprint.clone(), self.settings.clone(), notifier);
        let snapshot = engine.snapshot();

        let id = next_session_id();
        self.repository
            .insert(id.clone(), Arc::new(AsyncMutex::new(engine)))?;
        info!(session = %id, "intake session started");
        Ok((id, snapshot))
    }

    pub async fn snapshot(&self, id: &SessionId) -> Result<WizardSnapshot, IntakeServiceError> {
        let engine = self.engine(id)?;
        let guard = engine.lock().await;
        Ok(guard.snapshot())
    }

    pub async fn subscribe(
        &self,
        id: &SessionId,
    ) -> Result<watch::Receiver<WizardSnapshot>, IntakeServiceError> {
        let engine = self.engine(id)?;
        let guard = engine.lock().await;
        Ok(guard.subscribe())
    }

    pub async fn set_field(
        &self,
        id: &SessionId,
        field: FieldId,
        value: String,
    ) -> Result<WizardSnapshot, IntakeServiceError> {
        let engine = self.engine(id)?;
        let mut guard = engine.lock().await;
        guard.set_field(field, value)?;
        Ok(guard.snapshot())
    }

    pub async fn advance(&self, id: &SessionId) -> Result<WizardSnapshot, IntakeServiceError> {
        let engine = self.engine(id)?;
        let mut guard = engine.lock().await;
        guard.advance()?;
        Ok(guard.snapshot())
    }

    /// Validate the file name and attach it to the given slot.
    pub async fn upload(
        &self,
        id: &SessionId,
        slot: DocumentSlot,
        file_name: String,
    ) -> Result<WizardSnapshot, IntakeServiceError> {
        let engine = self.engine(id)?;
        let handle = DocumentHandle::from_file_name(file_name).map_err(WizardError::from)?;
        let mut guard = engine.lock().await;
        guard.set_document(slot, handle)?;
        Ok(guard.snapshot())
    }

    /// Run an evaluation to completion. The session lock is released while the document
    /// processor and the analysis delay are awaited, so readers see `processing == true`.
    ///
    /// Cancel safe: if the returned future is dropped early the session is rolled back to
    /// `AwaitingDocuments` and its cancellation token is released.
    pub async fn evaluate(
        &self,
        id: &SessionId,
    ) -> Result<EligibilityVerdict, IntakeServiceError> {
        let engine = self.engine(id)?;
        let cancel = CancellationToken::new();

        let mut pending = {
            let mut guard = engine.lock().await;
            let ticket = guard.begin_evaluation()?;
            self.evaluations.insert(id, cancel.clone());
            EvaluationGuard {
                session: id.clone(),
                engine: engine.clone(),
                tokens: self.evaluations.clone(),
                ticket: Some(ticket),
                tracked: true,
            }
        };

        let outcome = match pending.ticket.as_mut() {
            Some(ticket) => self.run_external_steps(&engine, ticket, &cancel).await,
            None => Err(PreconditionError::NotEvaluating.into()),
        };
        pending.untrack();

        let mut guard = engine.lock().await;
        let ticket = pending
            .ticket
            .take()
            .ok_or(PreconditionError::NotEvaluating)?;
        match outcome {
            Ok(()) => Ok(guard.finish_evaluation(ticket)?),
            Err(err) => {
                guard.abort_evaluation(ticket, &err);
                Err(err.into())
            }
        }
    }

    /// Signal an in-flight evaluation to stop at its next checkpoint.
    pub fn cancel(&self, id: &SessionId) -> Result<(), IntakeServiceError> {
        self.engine(id)?;
        if !self.evaluations.cancel(id) {
            return Err(PreconditionError::NotEvaluating.into());
        }
        info!(session = %id, "evaluation cancellation requested");
        Ok(())
    }

    /// Drop a session, cancelling any evaluation still running for it.
    pub fn close(&self, id: &SessionId) -> Result<(), IntakeServiceError> {
        if let Some(token) = self.evaluations.remove(id) {
            token.cancel();
        }

        self.repository
            .remove(id)?
            .ok_or(RepositoryError::NotFound)?;
        info!(session = %id, "intake session closed");
        Ok(())
    }

    fn engine(&self, id: &SessionId) -> Result<SharedEngine, IntakeServiceError> {
        let engine = self.repository.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        Ok(engine)
    }

    async fn run_external_steps(
        &self,
        engine: &SharedEngine,
        ticket: &mut EvaluationTicket,
        cancel: &CancellationToken,
    ) -> Result<(), WizardError> {
        verify_documents(self.processor.as_ref(), ticket, cancel).await?;
        engine.lock().await.documents_verified(ticket)?;
        analysis_pause(ticket, cancel).await
    }
}

/// Cancellation tokens of the evaluations currently running, keyed by session.
#[derive(Debug, Clone, Default)]
struct EvaluationTokens {
    inner: Arc<Mutex<HashMap<SessionId, CancellationToken>>>,
}

impl EvaluationTokens {
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, CancellationToken>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: &SessionId, token: CancellationToken) {
        self.lock().insert(id.clone(), token);
    }

    fn remove(&self, id: &SessionId) -> Option<CancellationToken> {
        self.lock().remove(id)
    }

    fn cancel(&self, id: &SessionId) -> bool {
        match self.lock().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Owns the ticket while an evaluation runs outside the session lock. Dropping it before the
/// ticket is handed back aborts the evaluation.
struct EvaluationGuard {
    session: SessionId,
    engine: SharedEngine,
    tokens: EvaluationTokens,
    ticket: Option<EvaluationTicket>,
    tracked: bool,
}

impl EvaluationGuard {
    fn untrack(&mut self) {
        if self.tracked {
            self.tokens.remove(&self.session);
            self.tracked = false;
        }
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        self.untrack();
        let Some(ticket) = self.ticket.take() else {
            return;
        };

        warn!(session = %self.session, "evaluation dropped before completion");
        if let Ok(mut engine) = self.engine.try_lock() {
            engine.abort_evaluation(ticket, &WizardError::Cancelled);
            return;
        }

        // Someone else holds the session lock; finish the rollback once it is released.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let engine = self.engine.clone();
                runtime.spawn(async move {
                    engine
                        .lock()
                        .await
                        .abort_evaluation(ticket, &WizardError::Cancelled);
                });
            }
            Err(_) => {
                warn!(session = %self.session, "no runtime to roll back dropped evaluation");
            }
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeServiceError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PreconditionError> for IntakeServiceError {
    fn from(error: PreconditionError) -> Self {
        Self::Wizard(error.into())
    }
}
