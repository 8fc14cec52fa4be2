use loan_advisor::config::AdvisorConfig;
use loan_advisor::workflows::intake::{
    IntakeService, Notification, NotificationSeverity, Notifier, NotifyError, RepositoryError,
    SessionId, SessionRepository, SharedEngine, SimulatedDocumentProcessor,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub(crate) type ApiIntakeService =
    IntakeService<InMemorySessionRepository, TracingNotifier, SimulatedDocumentProcessor>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, SharedEngine>>>,
}

impl InMemorySessionRepository {
    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<SessionId, SharedEngine>>, RepositoryError> {
        self.sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, id: SessionId, engine: SharedEngine) -> Result<SharedEngine, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(id, engine.clone());
        Ok(engine)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<SharedEngine>, RepositoryError> {
        let mut guard = self.lock()?;
        Ok(guard.remove(id))
    }
}

/// Forwards toasts to the log; HTTP clients read state from snapshots instead.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        match notification.severity {
            NotificationSeverity::Info => {
                info!(title = %notification.title, "{}", notification.description)
            }
            NotificationSeverity::Critical => {
                warn!(title = %notification.title, "{}", notification.description)
            }
        }
        Ok(())
    }
}

pub(crate) fn intake_service(advisor: &AdvisorConfig) -> ApiIntakeService {
    IntakeService::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(TracingNotifier),
        Arc::new(SimulatedDocumentProcessor::new(advisor.document_delay)),
        advisor.engine_settings(),
    )
}
