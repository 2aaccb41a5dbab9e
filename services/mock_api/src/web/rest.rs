//! services/mock_api/src/web/rest.rs
//!
//! Contains the handlers for the presign, repository, health and reset
//! endpoints, and the master definition for the OpenAPI specification.

use crate::error::ErrorBody;
use crate::web::protocol::{
    DomainRecord, HealthResponse, NewDomainRecord, NewQuestionRecord, NewSessionRecord,
    OptionInput, OptionRecord, PresignRequest, PresignResponse, QuestionPatchRecord,
    QuestionRecord, RepositoryRecord, SessionPatchRecord, SessionRecord, StatusEntryRecord,
    TopicPageRangeRecord, TopicRecord,
};
use crate::web::state::AppState;
use crate::web::{domains, questions, sessions, uploads};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use chrono::Utc;
use quiz_pipeline_core::domain::{PendingUpload, ResourceRepository};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        presign_handler,
        uploads::upload_handler,
        create_repository_handler,
        sessions::list_sessions_handler,
        sessions::create_sessions_handler,
        sessions::update_session_handler,
        domains::list_domains_handler,
        domains::create_domains_handler,
        questions::list_questions_handler,
        questions::create_questions_handler,
        questions::update_question_handler,
        health_handler,
        reset_handler,
    ),
    components(
        schemas(
            PresignRequest, PresignResponse, RepositoryRecord, HealthResponse, ErrorBody,
            SessionRecord, NewSessionRecord, SessionPatchRecord, StatusEntryRecord,
            TopicPageRangeRecord, TopicRecord,
            DomainRecord, NewDomainRecord,
            QuestionRecord, NewQuestionRecord, QuestionPatchRecord, OptionRecord, OptionInput,
        )
    ),
    tags(
        (name = "Mock Pipeline API", description = "Simulated upload, OCR and quiz-generation backend for frontend development.")
    )
)]
pub struct ApiDoc;

pub const DEFAULT_FILENAME: &str = "document.pdf";
pub const DEFAULT_CONTENT_TYPE: &str = "application/pdf";

//=========================================================================================
// Presign
//=========================================================================================

/// Reserve an upload slot for a document.
///
/// The body is optional; a missing or malformed body falls back to the defaults.
#[utoipa::path(
    post,
    path = "/presign",
    request_body(content = PresignRequest, description = "Optional upload metadata."),
    responses(
        (status = 200, description = "Upload slot reserved", body = PresignResponse)
    )
)]
pub async fn presign_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let request: PresignRequest = if body.is_empty() {
        PresignRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("Ignoring malformed presign body: {}", e);
            PresignRequest::default()
        })
    };

    let filename = request
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string();
    let content_type = request
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let job_id = Uuid::new_v4().to_string();
    let key = upload_key(&job_id, &filename);
    let upload_url = format!("{}/{}", app_state.config.public_url, key);

    app_state
        .store
        .register_upload(PendingUpload {
            job_id: job_id.clone(),
            filename,
            content_type,
            repository_id: request.resource_repository_id.clone(),
            registered_at: Utc::now(),
        })
        .await;
    info!(job_id = %job_id, key = %key, "Presigned upload");

    Json(PresignResponse {
        upload_url,
        key,
        job_id,
        resource_repository_id: request.resource_repository_id,
    })
}

/// `uploads/<YYYY-MM-DD>/<job id>/<filename>`
pub fn upload_key(job_id: &str, filename: &str) -> String {
    format!("uploads/{}/{}/{}", Utc::now().format("%Y-%m-%d"), job_id, filename)
}

//=========================================================================================
// Repositories
//=========================================================================================

/// Mint a new resource repository.
#[utoipa::path(
    post,
    path = "/rest/v1/resource_repositories",
    responses(
        (status = 201, description = "Repository created", body = RepositoryRecord)
    )
)]
pub async fn create_repository_handler() -> impl IntoResponse {
    let now = Utc::now();
    let repository = ResourceRepository {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
    };
    info!(repository_id = %repository.id, "Created resource repository");
    (StatusCode::CREATED, Json(RepositoryRecord::from(repository)))
}

//=========================================================================================
// Health & Maintenance
//=========================================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Drop every session and cancel every running sequence.
#[utoipa::path(
    post,
    path = "/admin/reset",
    responses(
        (status = 204, description = "Store cleared")
    )
)]
pub async fn reset_handler(State(app_state): State<Arc<AppState>>) -> StatusCode {
    app_state.store.clear().await;
    StatusCode::NO_CONTENT
}
