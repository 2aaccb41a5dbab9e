//! crates/quiz_pipeline_core/src/domain.rs
//!
//! Defines the pure, core data structures for the mock pipeline.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::status::SessionStatus;

/// Suffix used by the legacy wire format to flag the correct option.
pub const CORRECT_OPTION_TAG: &str = "[correct]";

/// Question type stamped on generated and created questions.
pub const DEFAULT_QUESTION_KIND: &str = "multiple_options";

/// One entry in a session's topic/page-range map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRange {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

/// A status write, kept in order on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: SessionStatus,
    pub timestamp: DateTime<Utc>,
}

/// One simulated document-processing job. The id doubles as the job id.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub mime_type: String,
    pub url: Option<String>,
    pub status: SessionStatus,
    pub status_history: Vec<StatusChange>,
    pub topic_page_range: Vec<TopicRange>,
    pub resource_repository_id: Option<String>,
    /// Diagnostic text recorded alongside a `failed` status.
    pub unparsable: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session in the `processing` state with a one-entry history.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
        mime_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_status(id, name, file_path, mime_type, SessionStatus::Processing, now)
    }

    pub fn with_status(
        id: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
        mime_type: impl Into<String>,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            file_path: file_path.into(),
            mime_type: mime_type.into(),
            url: None,
            status_history: vec![StatusChange {
                status: status.clone(),
                timestamp: now,
            }],
            status,
            topic_page_range: Vec::new(),
            resource_repository_id: None,
            unparsable: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Writes a new status, appends it to the history and bumps `updated_at`.
    pub fn set_status(&mut self, status: SessionStatus, at: DateTime<Utc>) {
        self.status_history.push(StatusChange {
            status: status.clone(),
            timestamp: at,
        });
        self.status = status;
        self.updated_at = at;
    }

    /// Merges the provided fields in place.
    pub fn apply(&mut self, patch: SessionPatch, at: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(mime_type) = patch.mime_type {
            self.mime_type = mime_type;
        }
        if let Some(topics) = patch.topic_page_range {
            self.topic_page_range = topics;
        }
        if let Some(repository_id) = patch.resource_repository_id {
            self.resource_repository_id = repository_id;
        }
        if let Some(unparsable) = patch.unparsable {
            self.unparsable = unparsable;
        }
        match patch.status {
            Some(status) if status != self.status => self.set_status(status, at),
            _ => self.updated_at = at,
        }
    }
}

/// Partial update of a session. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub url: Option<Option<String>>,
    pub mime_type: Option<String>,
    pub status: Option<SessionStatus>,
    pub topic_page_range: Option<Vec<TopicRange>>,
    pub resource_repository_id: Option<Option<String>>,
    pub unparsable: Option<Option<String>>,
}

/// A topic within a session, covering a contiguous page range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub id: String,
    pub session_id: String,
    pub repository_id: Option<String>,
    pub name: String,
    pub page_range_start: u32,
    pub page_range_end: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown difficulty: {0}")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownDifficulty(s.to_string()))
    }
}

/// One answer choice of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
    pub label: String,
    pub is_correct: bool,
}

impl QuestionOption {
    pub fn new(label: impl Into<String>, is_correct: bool) -> Self {
        Self {
            label: label.into(),
            is_correct,
        }
    }

    /// Reads the legacy string form, where a trailing `[correct]` marks the answer.
    pub fn from_tagged(raw: &str) -> Self {
        match raw.trim_end().strip_suffix(CORRECT_OPTION_TAG) {
            Some(label) => Self::new(label.trim_end(), true),
            None => Self::new(raw, false),
        }
    }
}

/// A generated or created quiz question.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub session_id: String,
    pub domain_id: Option<String>,
    pub repository_id: Option<String>,
    pub kind: String,
    pub body: String,
    pub options: Vec<QuestionOption>,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub is_sample: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Question {
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    pub fn apply(&mut self, patch: QuestionPatch, at: DateTime<Utc>) {
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(options) = patch.options {
            self.options = options;
        }
        if let Some(explanation) = patch.explanation {
            self.explanation = explanation;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(is_sample) = patch.is_sample {
            self.is_sample = is_sample;
        }
        if let Some(domain_id) = patch.domain_id {
            self.domain_id = domain_id;
        }
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub body: Option<String>,
    pub options: Option<Vec<QuestionOption>>,
    pub explanation: Option<Option<String>>,
    pub difficulty: Option<Difficulty>,
    pub is_sample: Option<bool>,
    pub domain_id: Option<Option<String>>,
}

/// Groups several sessions.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata announced at presign time, consumed by the matching upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub job_id: String,
    pub filename: String,
    pub content_type: String,
    pub repository_id: Option<String>,
    pub registered_at: DateTime<Utc>,
}
