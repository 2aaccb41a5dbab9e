//! services/mock_api/src/web/protocol.rs
//!
//! Defines the JSON records exchanged with the frontend. They mirror the rows
//! the real backend-as-a-service returns, and convert to and from the pure
//! domain types of the `core` crate.

use chrono::{DateTime, Utc};
use quiz_pipeline_core::domain::{
    Difficulty, Domain, Question, QuestionOption, QuestionPatch, ResourceRepository, Session,
    SessionPatch, TopicRange, DEFAULT_QUESTION_KIND,
};
use quiz_pipeline_core::ports::{PortError, PortResult};
use quiz_pipeline_core::status::SessionStatus;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lets a patch tell "field absent" (`None`) from "set to null" (`Some(None)`).
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn parse_status(label: &str) -> PortResult<SessionStatus> {
    label.parse().map_err(|e| PortError::Invalid(format!("{e}")))
}

fn parse_difficulty(label: &str) -> PortResult<Difficulty> {
    label.parse().map_err(|e| PortError::Invalid(format!("{e}")))
}

//=========================================================================================
// Bulk Insert Bodies
//=========================================================================================

/// Insert endpoints take either one object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

//=========================================================================================
// Sessions
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopicRecord {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

/// `{ "topics": [...] }`, as stored in the session's `topic_page_range` column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TopicPageRangeRecord {
    pub topics: Vec<TopicRecord>,
}

impl TopicPageRangeRecord {
    fn from_domain(topics: &[TopicRange]) -> Self {
        Self {
            topics: topics
                .iter()
                .map(|t| TopicRecord {
                    name: t.name.clone(),
                    start: t.start,
                    end: t.end,
                })
                .collect(),
        }
    }

    fn into_domain(self) -> Vec<TopicRange> {
        self.topics
            .into_iter()
            .map(|t| TopicRange {
                name: t.name,
                start: t.start,
                end: t.end,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusEntryRecord {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionRecord {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub mime_type: String,
    pub url: Option<String>,
    pub status: String,
    pub status_history: Vec<StatusEntryRecord>,
    pub topic_page_range: TopicPageRangeRecord,
    pub resource_repository_id: Option<String>,
    pub unparsable: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionRecord {
    fn from(s: Session) -> Self {
        Self {
            status: s.status.to_string(),
            status_history: s
                .status_history
                .iter()
                .map(|c| StatusEntryRecord {
                    status: c.status.to_string(),
                    timestamp: c.timestamp,
                })
                .collect(),
            topic_page_range: TopicPageRangeRecord::from_domain(&s.topic_page_range),
            id: s.id,
            name: s.name,
            file_path: s.file_path,
            mime_type: s.mime_type,
            url: s.url,
            resource_repository_id: s.resource_repository_id,
            unparsable: s.unparsable,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewSessionRecord {
    pub id: Option<String>,
    pub name: String,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub topic_page_range: Option<TopicPageRangeRecord>,
    pub resource_repository_id: Option<String>,
}

impl NewSessionRecord {
    pub fn into_domain(self, now: DateTime<Utc>) -> PortResult<Session> {
        let status = match self.status.as_deref() {
            Some(label) => parse_status(label)?,
            None => SessionStatus::Processing,
        };
        let mut session = Session::with_status(
            self.id.unwrap_or_else(new_id),
            self.name,
            self.file_path,
            self.mime_type.unwrap_or_else(|| "application/pdf".to_string()),
            status,
            now,
        );
        session.url = self.url;
        session.topic_page_range = self.topic_page_range.unwrap_or_default().into_domain();
        session.resource_repository_id = self.resource_repository_id;
        Ok(session)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SessionPatchRecord {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub url: Option<Option<String>>,
    pub mime_type: Option<String>,
    pub status: Option<String>,
    pub topic_page_range: Option<TopicPageRangeRecord>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub resource_repository_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub unparsable: Option<Option<String>>,
}

impl SessionPatchRecord {
    pub fn into_domain(self) -> PortResult<SessionPatch> {
        Ok(SessionPatch {
            status: self.status.as_deref().map(parse_status).transpose()?,
            name: self.name,
            url: self.url,
            mime_type: self.mime_type,
            topic_page_range: self.topic_page_range.map(TopicPageRangeRecord::into_domain),
            resource_repository_id: self.resource_repository_id,
            unparsable: self.unparsable,
        })
    }
}

//=========================================================================================
// Domains
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DomainRecord {
    pub id: String,
    pub resource_session_id: String,
    pub resource_repository_id: Option<String>,
    pub name: String,
    pub page_range_start: u32,
    pub page_range_end: u32,
    pub created_at: DateTime<Utc>,
}

impl From<Domain> for DomainRecord {
    fn from(d: Domain) -> Self {
        Self {
            id: d.id,
            resource_session_id: d.session_id,
            resource_repository_id: d.repository_id,
            name: d.name,
            page_range_start: d.page_range_start,
            page_range_end: d.page_range_end,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewDomainRecord {
    pub id: Option<String>,
    pub resource_session_id: String,
    pub resource_repository_id: Option<String>,
    pub name: String,
    pub page_range_start: u32,
    pub page_range_end: u32,
}

impl NewDomainRecord {
    pub fn into_domain(self, now: DateTime<Utc>) -> Domain {
        Domain {
            id: self.id.unwrap_or_else(new_id),
            session_id: self.resource_session_id,
            repository_id: self.resource_repository_id,
            name: self.name,
            page_range_start: self.page_range_start,
            page_range_end: self.page_range_end,
            created_at: now,
        }
    }
}

//=========================================================================================
// Questions
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptionRecord {
    pub label: String,
    pub is_correct: bool,
}

/// Options are accepted structured, or as legacy strings tagged with `[correct]`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum OptionInput {
    Structured(OptionRecord),
    Tagged(String),
}

impl From<OptionInput> for QuestionOption {
    fn from(input: OptionInput) -> Self {
        match input {
            OptionInput::Structured(o) => QuestionOption::new(o.label, o.is_correct),
            OptionInput::Tagged(raw) => QuestionOption::from_tagged(&raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionRecord {
    pub id: String,
    pub resource_session_id: String,
    pub resource_session_domain_id: Option<String>,
    pub resource_repository_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub body: String,
    pub options: Vec<OptionRecord>,
    pub explanation: Option<String>,
    pub difficulty: String,
    pub is_sample: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            resource_session_id: q.session_id,
            resource_session_domain_id: q.domain_id,
            resource_repository_id: q.repository_id,
            kind: q.kind,
            body: q.body,
            options: q
                .options
                .into_iter()
                .map(|o| OptionRecord {
                    label: o.label,
                    is_correct: o.is_correct,
                })
                .collect(),
            explanation: q.explanation,
            difficulty: q.difficulty.to_string(),
            is_sample: q.is_sample,
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewQuestionRecord {
    pub id: Option<String>,
    pub resource_session_id: String,
    pub resource_session_domain_id: Option<String>,
    pub resource_repository_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub body: String,
    #[serde(default)]
    pub options: Vec<OptionInput>,
    pub explanation: Option<String>,
    pub difficulty: Option<String>,
    pub is_sample: Option<bool>,
}

impl NewQuestionRecord {
    pub fn into_domain(self, now: DateTime<Utc>) -> PortResult<Question> {
        let difficulty = match self.difficulty.as_deref() {
            Some(label) => parse_difficulty(label)?,
            None => Difficulty::Medium,
        };
        Ok(Question {
            id: self.id.unwrap_or_else(new_id),
            session_id: self.resource_session_id,
            domain_id: self.resource_session_domain_id,
            repository_id: self.resource_repository_id,
            kind: self.kind.unwrap_or_else(|| DEFAULT_QUESTION_KIND.to_string()),
            body: self.body,
            options: self.options.into_iter().map(QuestionOption::from).collect(),
            explanation: self.explanation,
            difficulty,
            is_sample: self.is_sample.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuestionPatchRecord {
    pub body: Option<String>,
    pub options: Option<Vec<OptionInput>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub explanation: Option<Option<String>>,
    pub difficulty: Option<String>,
    pub is_sample: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub resource_session_domain_id: Option<Option<String>>,
}

impl QuestionPatchRecord {
    pub fn into_domain(self) -> PortResult<QuestionPatch> {
        Ok(QuestionPatch {
            difficulty: self.difficulty.as_deref().map(parse_difficulty).transpose()?,
            body: self.body,
            options: self
                .options
                .map(|options| options.into_iter().map(QuestionOption::from).collect()),
            explanation: self.explanation,
            is_sample: self.is_sample,
            domain_id: self.resource_session_domain_id,
        })
    }
}

//=========================================================================================
// Repositories, Presign, Health
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepositoryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResourceRepository> for RepositoryRecord {
    fn from(r: ResourceRepository) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PresignRequest {
    pub filename: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub resource_repository_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresignResponse {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    pub key: String,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub resource_repository_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_bodies_accept_one_or_many() {
        let one: OneOrMany<NewDomainRecord> = serde_json::from_value(json!({
            "resource_session_id": "s", "name": "Intro", "page_range_start": 1, "page_range_end": 4
        }))
        .unwrap();
        assert_eq!(one.into_vec().len(), 1);

        let many: OneOrMany<NewDomainRecord> = serde_json::from_value(json!([
            { "resource_session_id": "s", "name": "A", "page_range_start": 1, "page_range_end": 2 },
            { "resource_session_id": "s", "name": "B", "page_range_start": 3, "page_range_end": 4 }
        ]))
        .unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }

    #[test]
    fn legacy_option_strings_are_converted() {
        let record: NewQuestionRecord = serde_json::from_value(json!({
            "resource_session_id": "s",
            "body": "Capital of France?",
            "options": ["Lyon", "Paris [correct]", { "label": "Nice", "is_correct": false }]
        }))
        .unwrap();
        let question = record.into_domain(Utc::now()).unwrap();
        assert_eq!(question.correct_option().map(|o| o.label.as_str()), Some("Paris"));
        assert_eq!(question.options.len(), 3);
        assert!(!question.is_sample);
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: SessionPatchRecord =
            serde_json::from_value(json!({ "url": null, "status": "failed" })).unwrap();
        let patch = patch.into_domain().unwrap();
        assert_eq!(patch.url, Some(None));
        assert_eq!(patch.unparsable, None);
        assert_eq!(patch.status, Some(SessionStatus::Failed));
    }

    #[test]
    fn unknown_status_is_invalid() {
        let patch: SessionPatchRecord =
            serde_json::from_value(json!({ "status": "uploading" })).unwrap();
        assert!(matches!(patch.into_domain(), Err(PortError::Invalid(_))));
    }

    #[test]
    fn question_record_uses_type_on_the_wire() {
        let record: NewQuestionRecord = serde_json::from_value(json!({
            "resource_session_id": "s", "body": "?", "difficulty": "hard"
        }))
        .unwrap();
        let json = serde_json::to_value(QuestionRecord::from(record.into_domain(Utc::now()).unwrap())).unwrap();
        assert_eq!(json["type"], "multiple_options");
        assert_eq!(json["difficulty"], "hard");
    }
}
