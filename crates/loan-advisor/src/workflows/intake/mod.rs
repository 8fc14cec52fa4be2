//! Conversational loan intake: field collection, document upload and eligibility evaluation.

pub mod blueprint;
pub mod documents;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod notifications;
pub mod repository;
pub mod router;
pub mod service;
pub mod snapshot;
pub mod transcript;

#[cfg(test)]
mod tests;

pub use blueprint::{IntakeBlueprint, SummaryLine, LOAN_TYPES};
pub use documents::{
    DocumentError, DocumentFormat, DocumentHandle, DocumentProcessor, SimulatedDocumentProcessor,
};
pub use domain::{
    ApplicantRecord, DocumentSet, DocumentSlot, FieldId, FieldKind, FieldSpec, PreconditionError,
    TranscriptEntry, TranscriptRole, ValidationError, WizardPhase,
};
pub use eligibility::{
    evaluate, EligibilityConfig, EligibilityError, EligibilityEvaluator, EligibilityVerdict,
    NumericInputPolicy, APPROVAL_RATIONALE, DENIAL_RATIONALE,
};
pub use engine::{
    analysis_pause, verify_documents, EngineSettings, EvaluationTicket, WizardEngine, WizardError,
};
pub use notifications::{Notification, NotificationSeverity, Notifier, NotifyError, SilentNotifier};
pub use repository::{RepositoryError, SessionId, SessionRepository, SharedEngine};
pub use router::intake_router;
pub use service::{IntakeService, IntakeServiceError};
pub use snapshot::{DocumentStatus, WizardSnapshot};
pub use transcript::Transcript;
