//! crates/quiz_pipeline_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the mock pipeline.
//! The store and its timers are reached only through these traits, so the
//! HTTP layer and the sequencer never depend on a concrete registry.

use async_trait::async_trait;

use crate::domain::{
    Domain, PendingUpload, Question, QuestionPatch, Session, SessionPatch,
};
use crate::status::SessionStatus;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for port operations that can be refused.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A pending delayed transition owned by a session.
pub trait StateTimer: Send + Sync {
    /// Stops the timer. Calling it on a fired or cancelled timer does nothing.
    fn cancel(&self);

    /// Whether the timer may still write to its session.
    fn is_pending(&self) -> bool;
}

/// The authoritative registry of sessions and everything they own.
///
/// Reads of missing keys return `None` or an empty collection; writes to
/// missing keys are silent no-ops.
#[async_trait]
pub trait SessionStore: Send + Sync {
    // --- Sessions ---
    /// Inserts a session with its domains and questions. Refuses a duplicate
    /// id or storage path instead of overwriting.
    async fn add_session(
        &self,
        session: Session,
        domains: Vec<Domain>,
        questions: Vec<Question>,
    ) -> PortResult<()>;

    /// Inserts a batch of bare sessions, all or nothing. A duplicate id or
    /// path, against the store or within the batch, refuses the whole batch.
    async fn add_sessions(&self, sessions: Vec<Session>) -> PortResult<()>;

    async fn get_session_by_id(&self, id: &str) -> Option<Session>;

    async fn get_session_by_file_path(&self, file_path: &str) -> Option<Session>;

    async fn update_session_status(&self, id: &str, status: SessionStatus);

    /// Merges `patch`. A patch into a terminal status also cancels the
    /// session's timer, so a running sequence cannot overwrite it.
    async fn update_session(&self, id: &str, patch: SessionPatch) -> Option<Session>;

    /// Newest-created first.
    async fn get_sessions_by_repository_id(&self, repository_id: &str) -> Vec<Session>;

    // --- Timers ---
    /// Installs `timer` for the session, cancelling any timer already there.
    async fn set_state_timer(&self, id: &str, timer: Box<dyn StateTimer>);

    async fn clear_state_timer(&self, id: &str);

    async fn has_pending_timer(&self, id: &str) -> bool;

    // --- Domains ---
    /// Appends to the owning sessions, stamping each with its session's
    /// repository id; returns the domains that were stored.
    async fn add_domains(&self, domains: Vec<Domain>) -> Vec<Domain>;

    async fn get_domains_by_session_id(&self, session_id: &str) -> Vec<Domain>;

    /// Ordered by page-range start.
    async fn get_domains_by_repository_id(&self, repository_id: &str) -> Vec<Domain>;

    // --- Questions ---
    /// Appends to the owning sessions, stamping each with its session's
    /// repository id; returns the questions that were stored. A question id
    /// that is already stored, or repeated in the batch, refuses the batch.
    async fn add_questions(&self, questions: Vec<Question>) -> PortResult<Vec<Question>>;

    async fn update_question(&self, id: &str, patch: QuestionPatch) -> Option<Question>;

    async fn get_questions_by_session_id(&self, session_id: &str) -> Vec<Question>;

    /// Ordered by creation time, optionally restricted to one `is_sample` value.
    async fn get_questions_by_repository_id(
        &self,
        repository_id: &str,
        is_sample: Option<bool>,
    ) -> Vec<Question>;

    // --- Uploads ---
    /// Records presign metadata. Registrations that were never consumed
    /// expire after a while.
    async fn register_upload(&self, upload: PendingUpload);

    async fn take_upload(&self, job_id: &str) -> Option<PendingUpload>;

    // --- Maintenance ---
    /// Cancels every timer and empties every index.
    async fn clear(&self);
}
