use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::announcement::AnnouncementDraft;
use super::domain::{
    Actor, AnnouncementId, ApplicationId, ApplicationStatus, ApplicationType, FeedbackId, FileId,
    OrganizationId, Role, UserId,
};
use super::notify::Notifier;
use super::repository::{RegistrationRepository, RepositoryError};
use super::service::{
    DocumentReceipt, DocumentUpload, FileReview, RegistrationError, RegistrationService,
    StatusRefresh,
};
use super::throttle::AttemptLimiter;

pub const USER_HEADER: &str = "x-portal-user";
pub const ROLE_HEADER: &str = "x-portal-role";

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared handler state: the service plus the upload limiter.
pub struct RegistrationState<R, N> {
    pub service: Arc<RegistrationService<R, N>>,
    pub limiter: Arc<AttemptLimiter>,
}

type SharedState<R, N> = State<Arc<RegistrationState<R, N>>>;

/// Router builder exposing the registration and review endpoints.
pub fn registration_router<R, N>(
    service: Arc<RegistrationService<R, N>>,
    limiter: Arc<AttemptLimiter>,
) -> Router
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/requirements/:kind",
            get(requirements_handler::<R, N>),
        )
        .route("/api/v1/organizations", post(register_handler::<R, N>))
        .route(
            "/api/v1/organizations/:organization_id",
            get(overview_handler::<R, N>),
        )
        .route(
            "/api/v1/organizations/:organization_id/renewals",
            post(renewal_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/files",
            get(files_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/documents/:key",
            put(upload_handler::<R, N>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/v1/applications/:application_id/logo/carry-forward",
            post(carry_forward_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/logo/previous",
            get(previous_logo_handler::<R, N>),
        )
        .route(
            "/api/v1/applications/:application_id/feedback",
            get(feedback_handler::<R, N>),
        )
        .route(
            "/api/v1/feedback/:feedback_id/read",
            post(feedback_read_handler::<R, N>),
        )
        .route(
            "/api/v1/files/:file_id/status",
            patch(review_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/applications",
            get(queue_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/expiry-check",
            post(expiry_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/announcements",
            get(announcements_handler::<R, N>).post(send_announcement_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/announcements/:announcement_id",
            get(announcement_details_handler::<R, N>).delete(delete_announcement_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/announcements/:announcement_id/recipients",
            get(announcement_recipients_handler::<R, N>),
        )
        .with_state(Arc::new(RegistrationState { service, limiter }))
}

/// Identity forwarded by the user store in front of the portal.
pub fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers
        .get(USER_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    let role = Role::parse(headers.get(ROLE_HEADER)?.to_str().ok()?)?;
    Some(Actor::new(UserId(user_id), role))
}

fn authenticate(headers: &HeaderMap) -> Result<Actor, Response> {
    actor_from_headers(headers).ok_or_else(|| {
        error_body(
            StatusCode::UNAUTHORIZED,
            "missing or invalid portal identity".to_string(),
        )
    })
}

/// `{"error": message}` with the given status.
fn error_body(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, Json(payload)).into_response()
}

fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, Response> {
    path.map(|Path(value)| value)
        .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))
}

fn error_response(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistrationError::Forbidden(_) => StatusCode::FORBIDDEN,
        RegistrationError::NotFound(_) | RegistrationError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        RegistrationError::Conflict(_) | RegistrationError::Repository(RepositoryError::Conflict) => {
            StatusCode::CONFLICT
        }
        RegistrationError::Repository(RepositoryError::Unavailable(_)) => {
            error!(%error, "registration request failed");
            return error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            );
        }
    };
    error_body(status, error.to_string())
}

fn refresh_payload(refresh: &StatusRefresh) -> Value {
    match refresh {
        StatusRefresh::Updated(outcome) => json!(outcome),
        StatusRefresh::Failed(_) => json!({
            "error": "status refresh failed",
        }),
    }
}

fn document_payload(receipt: &DocumentReceipt) -> Value {
    json!({
        "file": receipt.file,
        "replaced": receipt.replaced,
        "status": refresh_payload(&receipt.refresh),
    })
}

pub(crate) async fn requirements_handler<R, N>(
    State(state): SharedState<R, N>,
    path: Result<Path<String>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let kind = match path_param(path) {
        Ok(kind) => kind,
        Err(response) => return response,
    };
    let Some(kind) = ApplicationType::parse(&kind) else {
        return error_body(
            StatusCode::BAD_REQUEST,
            format!("unknown application type '{kind}'"),
        );
    };
    let payload = json!({
        "kind": kind,
        "documents": state.service.requirements().documents(kind),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterOrganization {
    name: String,
}

pub(crate) async fn register_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    body: Result<Json<RegisterOrganization>, JsonRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let request = match json_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    match state
        .service
        .register_organization(&actor, &request.name, Utc::now())
    {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn overview_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let organization_id = match path_param(path) {
        Ok(id) => OrganizationId(id),
        Err(response) => return response,
    };
    match state
        .service
        .organization_overview(&actor, &organization_id, Utc::now())
    {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn renewal_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let organization_id = match path_param(path) {
        Ok(id) => OrganizationId(id),
        Err(response) => return response,
    };
    match state
        .service
        .open_renewal(&actor, &organization_id, Utc::now())
    {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let application_id = match path_param(path) {
        Ok(id) => ApplicationId(id),
        Err(response) => return response,
    };
    match state.service.application_status(&actor, &application_id) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn files_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let application_id = match path_param(path) {
        Ok(id) => ApplicationId(id),
        Err(response) => return response,
    };
    match state.service.application_files(&actor, &application_id) {
        Ok(files) => (StatusCode::OK, Json(files)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    filename: String,
}

pub(crate) async fn upload_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<(u64, String)>, PathRejection>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    body: Bytes,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let (application_id, key) = match path_param(path) {
        Ok(params) => params,
        Err(response) => return response,
    };
    let query = match query_params(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let now = Utc::now();
    if let Err(throttled) = state
        .limiter
        .check(&format!("user:{}", actor.user_id), now)
    {
        let mut response = error_body(StatusCode::TOO_MANY_REQUESTS, throttled.to_string());
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(throttled.retry_after_secs),
        );
        return response;
    }

    let upload = DocumentUpload {
        key,
        original_filename: query.filename,
        content: body.to_vec(),
    };
    match state
        .service
        .upload_document(&actor, &ApplicationId(application_id), upload, now)
    {
        Ok(receipt) => {
            let status = if receipt.replaced {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(document_payload(&receipt))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn carry_forward_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let application_id = match path_param(path) {
        Ok(id) => ApplicationId(id),
        Err(response) => return response,
    };
    match state
        .service
        .carry_forward_logo(&actor, &application_id, Utc::now())
    {
        Ok(receipt) => (StatusCode::OK, Json(document_payload(&receipt))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn previous_logo_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let application_id = match path_param(path) {
        Ok(id) => ApplicationId(id),
        Err(response) => return response,
    };
    match state.service.previous_logo(&actor, &application_id) {
        Ok(preview) => (StatusCode::OK, Json(preview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn feedback_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let application_id = match path_param(path) {
        Ok(id) => ApplicationId(id),
        Err(response) => return response,
    };
    match state.service.application_feedback(&actor, &application_id) {
        Ok(feedback) => (StatusCode::OK, Json(feedback)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn feedback_read_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let feedback_id = match path_param(path) {
        Ok(id) => FeedbackId(id),
        Err(response) => return response,
    };
    match state.service.mark_feedback_read(&actor, &feedback_id) {
        Ok(feedback) => (StatusCode::OK, Json(feedback)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
    body: Result<Json<FileReview>, JsonRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let file_id = match path_param(path) {
        Ok(id) => FileId(id),
        Err(response) => return response,
    };
    let review = match json_body(body) {
        Ok(review) => review,
        Err(response) => return response,
    };
    match state
        .service
        .review_file(&actor, &file_id, review, Utc::now())
    {
        Ok(receipt) => {
            let payload = json!({
                "file": receipt.file,
                "feedback": receipt.feedback,
                "status": refresh_payload(&receipt.refresh),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueQuery {
    kind: Option<ApplicationType>,
    status: Option<ApplicationStatus>,
}

pub(crate) async fn queue_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    query: Result<Query<QueueQuery>, QueryRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let query = match query_params(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let status = query.status.unwrap_or(ApplicationStatus::Pending);
    match state.service.review_queue(&actor, query.kind, status) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expiry_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.trigger_expiry_sweep(&actor, Utc::now()) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn send_announcement_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    body: Result<Json<AnnouncementDraft>, JsonRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let draft = match json_body(body) {
        Ok(draft) => draft,
        Err(response) => return response,
    };
    match state.service.send_announcement(&actor, draft, Utc::now()) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn announcements_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match state.service.announcements(&actor) {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn announcement_details_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let announcement_id = match path_param(path) {
        Ok(id) => AnnouncementId(id),
        Err(response) => return response,
    };
    match state.service.announcement_details(&actor, &announcement_id) {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn announcement_recipients_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let announcement_id = match path_param(path) {
        Ok(id) => AnnouncementId(id),
        Err(response) => return response,
    };
    match state
        .service
        .announcement_recipients(&actor, &announcement_id)
    {
        Ok(recipients) => (StatusCode::OK, Json(recipients)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_announcement_handler<R, N>(
    State(state): SharedState<R, N>,
    headers: HeaderMap,
    path: Result<Path<u64>, PathRejection>,
) -> Response
where
    R: RegistrationRepository + 'static,
    N: Notifier + 'static,
{
    let actor = match authenticate(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let announcement_id = match path_param(path) {
        Ok(id) => AnnouncementId(id),
        Err(response) => return response,
    };
    match state
        .service
        .delete_announcement(&actor, &announcement_id)
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}
