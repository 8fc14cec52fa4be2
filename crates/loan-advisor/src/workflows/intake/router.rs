use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::documents::DocumentProcessor;
use super::domain::{DocumentSlot, FieldId, ValidationError};
use super::eligibility::EligibilityVerdict;
use super::engine::WizardError;
use super::notifications::Notifier;
use super::repository::{RepositoryError, SessionId, SessionRepository};
use super::service::{IntakeService, IntakeServiceError};
use super::snapshot::WizardSnapshot;

type SharedService<R, N, P> = Arc<IntakeService<R, N, P>>;

/// Router builder exposing the intake conversation over HTTP.
pub fn intake_router<R, N, P>(service: SharedService<R, N, P>) -> Router
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    Router::new()
        .route("/api/v1/intake/sessions", post(start_handler::<R, N, P>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(snapshot_handler::<R, N, P>).delete(close_handler::<R, N, P>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/fields/:field",
            put(set_field_handler::<R, N, P>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/advance",
            post(advance_handler::<R, N, P>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/documents/:slot",
            put(upload_handler::<R, N, P>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/evaluate",
            post(evaluate_handler::<R, N, P>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/cancel",
            post(cancel_handler::<R, N, P>),
        )
        .with_state(service)
}

/// Snapshot tagged with the session it belongs to.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub snapshot: WizardSnapshot,
}

#[derive(Debug, Serialize)]
pub struct EvaluationView {
    pub session_id: SessionId,
    pub verdict: EligibilityVerdict,
}

#[derive(Debug, Deserialize)]
pub struct FieldValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
}

impl IntakeServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            Self::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Wizard(WizardError::Validation(
                ValidationError::UnknownField(_) | ValidationError::UnknownDocumentSlot(_),
            )) => StatusCode::NOT_FOUND,
            Self::Wizard(
                WizardError::Validation(_) | WizardError::Document(_) | WizardError::Eligibility(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Wizard(WizardError::Precondition(_) | WizardError::Cancelled) => {
                StatusCode::CONFLICT
            }
        }
    }
}

impl IntoResponse for IntakeServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = json!({
            "error": self.to_string(),
        });
        (status, axum::Json(payload)).into_response()
    }
}

fn session_view(session_id: SessionId, snapshot: WizardSnapshot, status: StatusCode) -> Response {
    (status, axum::Json(SessionView { session_id, snapshot })).into_response()
}

pub(crate) async fn start_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    match service.start() {
        Ok((session_id, snapshot)) => session_view(session_id, snapshot, StatusCode::CREATED),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn snapshot_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    match service.snapshot(&id).await {
        Ok(snapshot) => session_view(id, snapshot, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn set_field_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path((session_id, field)): Path<(String, String)>,
    axum::Json(body): axum::Json<FieldValue>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    let field = match FieldId::from_str(&field) {
        Ok(field) => field,
        Err(err) => return IntakeServiceError::from(WizardError::from(err)).into_response(),
    };

    match service.set_field(&id, field, body.value).await {
        Ok(snapshot) => session_view(id, snapshot, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn advance_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    match service.advance(&id).await {
        Ok(snapshot) => session_view(id, snapshot, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn upload_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path((session_id, slot)): Path<(String, String)>,
    axum::Json(body): axum::Json<DocumentUpload>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    let slot = match DocumentSlot::from_str(&slot) {
        Ok(slot) => slot,
        Err(err) => return IntakeServiceError::from(WizardError::from(err)).into_response(),
    };

    match service.upload(&id, slot, body.file_name).await {
        Ok(snapshot) => session_view(id, snapshot, StatusCode::OK),
        Err(err) => err.into_response(),
    }
}

/// Evaluation runs on its own task so a dropped connection cannot strand the session
/// in `Evaluating`.
pub(crate) async fn evaluate_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    let task = {
        let id = id.clone();
        tokio::spawn(async move { service.evaluate(&id).await })
    };

    match task.await {
        Ok(Ok(verdict)) => {
            (StatusCode::OK, axum::Json(EvaluationView { session_id: id, verdict })).into_response()
        }
        Ok(Err(err)) => err.into_response(),
        Err(join_error) => {
            error!(session = %id, error = %join_error, "evaluation task failed");
            let payload = json!({
                "error": "evaluation task failed",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn cancel_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    match service.cancel(&id) {
        Ok(()) => {
            let payload = json!({
                "session_id": id,
                "status": "cancelling",
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn close_handler<R, N, P>(
    State(service): State<SharedService<R, N, P>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    N: Notifier + 'static,
    P: DocumentProcessor + 'static,
{
    let id = SessionId(session_id);
    match service.close(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
