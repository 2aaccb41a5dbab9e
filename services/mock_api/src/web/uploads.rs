//! services/mock_api/src/web/uploads.rs
//!
//! The raw upload endpoint. Accepting an upload is what creates a session,
//! fills it with generated content and starts its state sequence.

use crate::error::{port_error, ErrorBody, HandlerError};
use crate::web::rest::DEFAULT_CONTENT_TYPE;
use crate::web::sequencer_task::sequence_for;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
};
use bytes::Bytes;
use chrono::Utc;
use quiz_pipeline_core::domain::Session;
use quiz_pipeline_core::sequence::StateMachine;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The pieces of an upload key: `<date>/<job id>/<filename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub job_id: String,
    pub file_path: String,
    pub filename: String,
}

impl UploadTarget {
    /// Reads the job id from the second key segment. Keys of any other shape
    /// get a freshly minted id.
    pub fn from_key(key: &str) -> Self {
        let key = key.trim_matches('/');
        let segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
        let job_id = match segments.as_slice() {
            [_, job_id, _, ..] => job_id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let filename = segments.last().copied().unwrap_or_default().to_string();
        Self {
            job_id,
            file_path: format!("uploads/{key}"),
            filename,
        }
    }
}

/// Accept a raw document upload.
///
/// The bytes are ignored. The session is created in `processing` and the
/// state sequence is armed before the empty `200` is returned.
#[utoipa::path(
    put,
    path = "/uploads/{key}",
    params(("key" = String, Path, description = "Upload key below `uploads/`, usually `<date>/<jobId>/<filename>`")),
    responses(
        (status = 200, description = "Upload accepted, or skipped as a re-upload"),
        (status = 409, description = "The job id is already taken by another path", body = ErrorBody)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let target = UploadTarget::from_key(&key);

    // 1. A path that already has a session is not processed twice
    if let Some(existing) = app_state.store.get_session_by_file_path(&target.file_path).await {
        warn!(file_path = %target.file_path, session_id = %existing.id, "Re-upload skipped");
        return Ok(StatusCode::OK);
    }

    // 2. Attach whatever the presign step recorded
    let pending = app_state.store.take_upload(&target.job_id).await;
    let mime_type = pending
        .as_ref()
        .map(|p| p.content_type.clone())
        .or_else(|| {
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    let repository_id = pending.as_ref().and_then(|p| p.repository_id.clone());
    let name = pending
        .map(|p| p.filename)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| target.filename.clone());

    // 3. Build the session and its generated content
    let now = Utc::now();
    let content = {
        let mut rng = rand::rng();
        app_state
            .generator
            .generate(&mut rng, &target.job_id, repository_id.as_deref(), now)
    };
    let mut session = Session::new(&target.job_id, name, &target.file_path, mime_type, now);
    session.url = Some(format!("{}/{}", app_state.config.public_url, target.file_path));
    session.resource_repository_id = repository_id;
    session.topic_page_range = content.topics.clone();

    let sequence = sequence_for(app_state.config.state_sequence, &content);
    let (domain_count, question_count) = (content.domains.len(), content.questions.len());

    app_state
        .store
        .add_session(session, content.domains, content.questions)
        .await
        .map_err(port_error)?;

    info!(
        session_id = %target.job_id,
        file_path = %target.file_path,
        bytes = body.len(),
        domains = domain_count,
        questions = question_count,
        "Upload accepted"
    );

    // 4. Start the simulated pipeline
    app_state
        .sequencer
        .arm(&target.job_id, StateMachine::new(sequence))
        .await;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_comes_from_the_second_segment() {
        let target = UploadTarget::from_key("2024-01-01/job-123/doc.pdf");
        assert_eq!(target.job_id, "job-123");
        assert_eq!(target.file_path, "uploads/2024-01-01/job-123/doc.pdf");
        assert_eq!(target.filename, "doc.pdf");
    }

    #[test]
    fn short_keys_get_a_minted_id() {
        let a = UploadTarget::from_key("doc.pdf");
        let b = UploadTarget::from_key("doc.pdf");
        assert_ne!(a.job_id, b.job_id);
        assert_eq!(a.file_path, "uploads/doc.pdf");
        assert_eq!(a.filename, "doc.pdf");
    }
}
