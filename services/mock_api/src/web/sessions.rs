//! services/mock_api/src/web/sessions.rs
//!
//! `/rest/v1/resource_sessions`: query, bulk insert and update.

use crate::error::{error_response, port_error, ErrorBody, HandlerError};
use crate::web::postgrest::Filters;
use crate::web::protocol::{NewSessionRecord, OneOrMany, SessionPatchRecord, SessionRecord};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use quiz_pipeline_core::ports::PortResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Query sessions.
///
/// `id` and `file_path` answer a single object or `null`;
/// `resource_repository_id` answers an array, newest first. Without a
/// recognised filter the answer is an empty array.
#[utoipa::path(
    get,
    path = "/rest/v1/resource_sessions",
    params(
        ("id" = Option<String>, Query, description = "`eq.<id>`"),
        ("file_path" = Option<String>, Query, description = "`eq.<storage path>`"),
        ("resource_repository_id" = Option<String>, Query, description = "`eq.<repository id>`"),
    ),
    responses(
        (status = 200, description = "A session, null, or an array of sessions", body = Vec<SessionRecord>)
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let filters = Filters::from(params);
    let store = &app_state.store;

    if let Some(id) = filters.eq("id") {
        let session = store.get_session_by_id(id).await;
        return Json(session.map(SessionRecord::from)).into_response();
    }
    if let Some(file_path) = filters.eq("file_path") {
        let session = store.get_session_by_file_path(file_path).await;
        return Json(session.map(SessionRecord::from)).into_response();
    }
    if let Some(repository_id) = filters.eq("resource_repository_id") {
        let sessions: Vec<SessionRecord> = store
            .get_sessions_by_repository_id(repository_id)
            .await
            .into_iter()
            .map(SessionRecord::from)
            .collect();
        return Json(sessions).into_response();
    }
    Json(Vec::<SessionRecord>::new()).into_response()
}

/// Insert one session or an array of sessions.
#[utoipa::path(
    post,
    path = "/rest/v1/resource_sessions",
    request_body(content = Vec<NewSessionRecord>, description = "One session object or an array of them"),
    responses(
        (status = 201, description = "The created sessions", body = Vec<SessionRecord>),
        (status = 400, description = "Unknown status label", body = ErrorBody),
        (status = 409, description = "Duplicate id or file_path", body = ErrorBody)
    )
)]
pub async fn create_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<OneOrMany<NewSessionRecord>>,
) -> Result<impl IntoResponse, HandlerError> {
    let now = Utc::now();
    let sessions = body
        .into_vec()
        .into_iter()
        .map(|record| record.into_domain(now))
        .collect::<PortResult<Vec<_>>>()
        .map_err(port_error)?;

    // The batch is stored whole or not at all.
    app_state
        .store
        .add_sessions(sessions.clone())
        .await
        .map_err(port_error)?;
    info!(count = sessions.len(), "Sessions inserted");

    let created: Vec<SessionRecord> = sessions.into_iter().map(SessionRecord::from).collect();
    Ok((StatusCode::CREATED, Json(created)))
}

/// Merge fields into the session named by `id=eq.<id>`.
#[utoipa::path(
    patch,
    path = "/rest/v1/resource_sessions",
    params(("id" = String, Query, description = "`eq.<id>`")),
    request_body = SessionPatchRecord,
    responses(
        (status = 200, description = "The updated session, array-wrapped", body = Vec<SessionRecord>),
        (status = 400, description = "Missing id filter or unknown status", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody)
    )
)]
pub async fn update_session_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<SessionPatchRecord>,
) -> Result<Json<Vec<SessionRecord>>, HandlerError> {
    let filters = Filters::from(params);
    let id = filters.required_id()?;
    let patch = body.into_domain().map_err(port_error)?;

    // A terminal status also stops any running sequence.
    match app_state.store.update_session(id, patch).await {
        Some(session) => {
            info!(session_id = %id, status = %session.status, "Session updated");
            Ok(Json(vec![SessionRecord::from(session)]))
        }
        None => {
            warn!(session_id = %id, "Update for unknown session");
            Err(error_response(StatusCode::NOT_FOUND, "Session not found"))
        }
    }
}
