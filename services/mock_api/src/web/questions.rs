//! services/mock_api/src/web/questions.rs
//!
//! `/rest/v1/resource_session_questions`: query, bulk insert and update.

use crate::error::{error_response, port_error, ErrorBody, HandlerError};
use crate::web::postgrest::{collection, wants_exact_count, Filters};
use crate::web::protocol::{NewQuestionRecord, OneOrMany, QuestionPatchRecord, QuestionRecord};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use quiz_pipeline_core::ports::PortResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Query questions by session or by repository, optionally by `is_sample`.
#[utoipa::path(
    get,
    path = "/rest/v1/resource_session_questions",
    params(
        ("resource_session_id" = Option<String>, Query, description = "`eq.<session id>`"),
        ("resource_repository_id" = Option<String>, Query, description = "`eq.<repository id>`"),
        ("is_sample" = Option<String>, Query, description = "`eq.true` or `eq.false`"),
        ("Prefer" = Option<String>, Header, description = "`count=exact` answers an empty body and a Content-Range count"),
    ),
    responses(
        (status = 200, description = "Matching questions", body = Vec<QuestionRecord>),
        (status = 400, description = "Malformed is_sample filter", body = ErrorBody)
    )
)]
pub async fn list_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let filters = Filters::from(params);
    let is_sample = filters.eq_bool("is_sample")?;

    let questions = if let Some(session_id) = filters.eq("resource_session_id") {
        let mut questions = app_state.store.get_questions_by_session_id(session_id).await;
        if let Some(flag) = is_sample {
            questions.retain(|q| q.is_sample == flag);
        }
        questions
    } else if let Some(repository_id) = filters.eq("resource_repository_id") {
        app_state
            .store
            .get_questions_by_repository_id(repository_id, is_sample)
            .await
    } else {
        Vec::new()
    };
    debug!(rows = questions.len(), ?is_sample, "Question query");

    let rows: Vec<QuestionRecord> = questions.into_iter().map(QuestionRecord::from).collect();
    Ok(collection(rows, wants_exact_count(&headers)))
}

/// Insert one question or an array of questions. Questions whose session
/// does not exist are dropped.
#[utoipa::path(
    post,
    path = "/rest/v1/resource_session_questions",
    request_body(content = Vec<NewQuestionRecord>, description = "One question object or an array of them"),
    responses(
        (status = 201, description = "The created questions", body = Vec<QuestionRecord>),
        (status = 400, description = "Unknown difficulty", body = ErrorBody),
        (status = 409, description = "Duplicate question id", body = ErrorBody)
    )
)]
pub async fn create_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<OneOrMany<NewQuestionRecord>>,
) -> Result<impl IntoResponse, HandlerError> {
    let now = Utc::now();
    let questions = body
        .into_vec()
        .into_iter()
        .map(|record| record.into_domain(now))
        .collect::<PortResult<Vec<_>>>()
        .map_err(port_error)?;
    let stored = app_state
        .store
        .add_questions(questions)
        .await
        .map_err(port_error)?;
    info!(count = stored.len(), "Questions inserted");

    let rows: Vec<QuestionRecord> = stored.into_iter().map(QuestionRecord::from).collect();
    Ok((StatusCode::CREATED, Json(rows)))
}

/// Merge fields into the question named by `id=eq.<id>`.
#[utoipa::path(
    patch,
    path = "/rest/v1/resource_session_questions",
    params(("id" = String, Query, description = "`eq.<id>`")),
    request_body = QuestionPatchRecord,
    responses(
        (status = 200, description = "The updated question, array-wrapped", body = Vec<QuestionRecord>),
        (status = 400, description = "Missing id filter or unknown difficulty", body = ErrorBody),
        (status = 404, description = "Question not found", body = ErrorBody)
    )
)]
pub async fn update_question_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<QuestionPatchRecord>,
) -> Result<Json<Vec<QuestionRecord>>, HandlerError> {
    let filters = Filters::from(params);
    let id = filters.required_id()?;
    let patch = body.into_domain().map_err(port_error)?;

    match app_state.store.update_question(id, patch).await {
        Some(question) => {
            info!(question_id = %id, "Question updated");
            Ok(Json(vec![QuestionRecord::from(question)]))
        }
        None => {
            warn!(question_id = %id, "Update for unknown question");
            Err(error_response(StatusCode::NOT_FOUND, "Question not found"))
        }
    }
}
