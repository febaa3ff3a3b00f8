use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::auth::{AdminAuthorizer, ADMIN_CREDENTIAL_HEADER};
use super::domain::{ReviewRequest, SubmissionId, SubmissionIntake};
use super::repository::{ReviewerNotifier, SubmissionRepository};
use super::service::{ModerationError, ModerationService};

/// Shared handler state: the moderation service and the admin gate in front of it.
pub struct SubmissionApi<R, N> {
    service: Arc<ModerationService<R, N>>,
    authorizer: Arc<dyn AdminAuthorizer>,
}

impl<R, N> Clone for SubmissionApi<R, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            authorizer: Arc::clone(&self.authorizer),
        }
    }
}

impl<R, N> SubmissionApi<R, N> {
    pub fn new(
        service: Arc<ModerationService<R, N>>,
        authorizer: Arc<dyn AdminAuthorizer>,
    ) -> Self {
        Self {
            service,
            authorizer,
        }
    }

    fn require_admin(&self, headers: &HeaderMap) -> Result<(), Response> {
        let credential = headers
            .get(ADMIN_CREDENTIAL_HEADER)
            .and_then(|value| value.to_str().ok());
        self.authorizer.authorize(credential).map_err(|err| {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
    }
}

/// Router builder exposing public intake, admin moderation, and aggregate read endpoints.
pub fn submission_router<R, N>(
    service: Arc<ModerationService<R, N>>,
    authorizer: Arc<dyn AdminAuthorizer>,
) -> Router
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    Router::new()
        .route("/api/submissions", post(submit_handler::<R, N>))
        .route("/api/submissions/pending", get(pending_handler::<R, N>))
        .route("/api/submissions/approved", get(approved_handler::<R, N>))
        .route(
            "/api/submissions/:submission_id",
            axum::routing::delete(delete_handler::<R, N>),
        )
        .route(
            "/api/submissions/:submission_id/approve",
            put(approve_handler::<R, N>),
        )
        .route(
            "/api/submissions/:submission_id/reject",
            put(reject_handler::<R, N>),
        )
        .route("/api/wait-times/current", get(current_handler::<R, N>))
        .route("/api/wait-times/history", get(history_handler::<R, N>))
        .route("/api/wait-times/trends", get(trends_handler::<R, N>))
        .route("/api/notifications/reviewer", post(notify_handler::<R, N>))
        .route("/send-email", post(notify_handler::<R, N>))
        .with_state(SubmissionApi::new(service, authorizer))
}

pub(crate) async fn submit_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    payload: Result<Json<SubmissionIntake>, JsonRejection>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    let Json(intake) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_body(rejection),
    };
    // Submission may notify the reviewer, which can block on the mail relay.
    let service = Arc::clone(&api.service);
    match tokio::task::spawn_blocking(move || service.submit(intake)).await {
        Ok(Ok(receipt)) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => blocking_failure(join_error),
    }
}

pub(crate) async fn pending_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    if let Err(denied) = api.require_admin(&headers) {
        return denied;
    }
    match api.service.list_pending() {
        Ok(pending) => (StatusCode::OK, Json(pending)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approved_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    if let Err(denied) = api.require_admin(&headers) {
        return denied;
    }
    match api.service.list_approved() {
        Ok(approved) => (StatusCode::OK, Json(approved)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approve_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    if let Err(denied) = api.require_admin(&headers) {
        return denied;
    }
    match api.service.approve(&SubmissionId(submission_id)) {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    if let Err(denied) = api.require_admin(&headers) {
        return denied;
    }
    match api.service.reject(&SubmissionId(submission_id)) {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    if let Err(denied) = api.require_admin(&headers) {
        return denied;
    }
    let id = SubmissionId(submission_id);
    match api.service.remove(&id) {
        Ok(()) => {
            let payload = json!({
                "deleted": id.0,
                "message": "submission deleted",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn current_handler<R, N>(State(api): State<SubmissionApi<R, N>>) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    match api.service.current_wait_times() {
        Ok(current) => (StatusCode::OK, Json(current)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(State(api): State<SubmissionApi<R, N>>) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    match api.service.approved_history() {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn trends_handler<R, N>(State(api): State<SubmissionApi<R, N>>) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    match api.service.trends_by_weekday() {
        Ok(trends) => (StatusCode::OK, Json(trends)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn notify_handler<R, N>(
    State(api): State<SubmissionApi<R, N>>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response
where
    R: SubmissionRepository + 'static,
    N: ReviewerNotifier + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_body(rejection),
    };
    let service = Arc::clone(&api.service);
    match tokio::task::spawn_blocking(move || service.notify_reviewer(&request)).await {
        Err(join_error) => blocking_failure(join_error),
        Ok(Ok(_)) => {
            let payload = json!({ "success": true, "message": "Email sent" });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Ok(Err(ModerationError::Notification(err))) => {
            error!(error = %err, "reviewer notification failed");
            let payload = json!({ "success": false, "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
        Ok(Err(other)) => error_response(other),
    }
}

fn blocking_failure(join_error: tokio::task::JoinError) -> Response {
    error!(error = %join_error, "submission task aborted");
    let payload = json!({ "error": "internal error" });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn malformed_body(rejection: JsonRejection) -> Response {
    let payload = json!({ "error": rejection.body_text() });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn error_response(err: ModerationError) -> Response {
    let status = match &err {
        ModerationError::Validation(_) => StatusCode::BAD_REQUEST,
        ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
        ModerationError::StoreUnavailable(_) | ModerationError::Notification(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        error!(error = %err, "submission request failed");
    }
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
