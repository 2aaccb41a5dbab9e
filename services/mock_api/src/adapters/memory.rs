//! services/mock_api/src/adapters/memory.rs
//!
//! This module contains the in-memory store, the concrete implementation of the
//! `SessionStore` port from the `core` crate. Everything lives for the lifetime
//! of the process; `clear` is the only way anything is removed.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use quiz_pipeline_core::domain::{
    Domain, PendingUpload, Question, QuestionPatch, Session, SessionPatch,
};
use quiz_pipeline_core::ports::{PortError, PortResult, SessionStore, StateTimer};
use quiz_pipeline_core::status::SessionStatus;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// How long presign metadata waits for its upload.
pub const PENDING_UPLOAD_TTL_MINUTES: i64 = 60;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A session registry keyed by id, with a secondary index by storage path.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<String, SessionEntry>,
    by_file_path: HashMap<String, String>,
    /// question id -> owning session id
    question_owners: HashMap<String, String>,
    uploads: HashMap<String, PendingUpload>,
    next_seq: u64,
}

struct SessionEntry {
    /// Insertion order, used to break timestamp ties deterministically.
    seq: u64,
    session: Session,
    domains: Vec<Domain>,
    questions: Vec<Question>,
    timer: Option<Box<dyn StateTimer>>,
}

impl StoreInner {
    /// Sessions of a repository in insertion order.
    fn repository_entries(&self, repository_id: &str) -> Vec<&SessionEntry> {
        let mut entries: Vec<&SessionEntry> = self
            .sessions
            .values()
            .filter(|e| e.session.resource_repository_id.as_deref() == Some(repository_id))
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    /// Refuses ids or paths that are already stored or repeated in the batch.
    fn check_new_sessions<'a>(
        &self,
        sessions: impl IntoIterator<Item = &'a Session>,
    ) -> PortResult<()> {
        let mut ids = HashSet::new();
        let mut paths = HashSet::new();
        for session in sessions {
            if self.sessions.contains_key(&session.id) || !ids.insert(session.id.as_str()) {
                return Err(PortError::Conflict(format!(
                    "Session {} already exists",
                    session.id
                )));
            }
            if self.by_file_path.contains_key(&session.file_path)
                || !paths.insert(session.file_path.as_str())
            {
                return Err(PortError::Conflict(format!(
                    "A session for {} already exists",
                    session.file_path
                )));
            }
        }
        Ok(())
    }

    fn check_new_questions<'a>(
        &self,
        questions: impl IntoIterator<Item = &'a Question>,
    ) -> PortResult<()> {
        let mut ids = HashSet::new();
        for question in questions {
            if self.question_owners.contains_key(&question.id) || !ids.insert(question.id.as_str()) {
                return Err(PortError::Conflict(format!(
                    "Question {} already exists",
                    question.id
                )));
            }
        }
        Ok(())
    }

    /// Inserts an already checked session.
    fn insert_session(
        &mut self,
        session: Session,
        mut domains: Vec<Domain>,
        mut questions: Vec<Question>,
    ) {
        let id = session.id.clone();
        for domain in &mut domains {
            domain.repository_id = session.resource_repository_id.clone();
        }
        for question in &mut questions {
            question.repository_id = session.resource_repository_id.clone();
            self.question_owners.insert(question.id.clone(), id.clone());
        }
        self.by_file_path.insert(session.file_path.clone(), id.clone());
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!(
            session_id = %id,
            domains = domains.len(),
            questions = questions.len(),
            "Session stored"
        );
        self.sessions.insert(
            id,
            SessionEntry {
                seq,
                session,
                domains,
                questions,
                timer: None,
            },
        );
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

fn upload_expired(upload: &PendingUpload) -> bool {
    Utc::now() - upload.registered_at > Duration::minutes(PENDING_UPLOAD_TTL_MINUTES)
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn add_session(
        &self,
        session: Session,
        domains: Vec<Domain>,
        questions: Vec<Question>,
    ) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_new_sessions([&session])?;
        inner.check_new_questions(&questions)?;
        inner.insert_session(session, domains, questions);
        Ok(())
    }

    async fn add_sessions(&self, sessions: Vec<Session>) -> PortResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_new_sessions(&sessions)?;
        for session in sessions {
            inner.insert_session(session, Vec::new(), Vec::new());
        }
        Ok(())
    }

    async fn get_session_by_id(&self, id: &str) -> Option<Session> {
        let inner = self.inner.read().await;
        inner.sessions.get(id).map(|e| e.session.clone())
    }

    async fn get_session_by_file_path(&self, file_path: &str) -> Option<Session> {
        let inner = self.inner.read().await;
        let id = inner.by_file_path.get(file_path)?;
        inner.sessions.get(id).map(|e| e.session.clone())
    }

    async fn update_session_status(&self, id: &str, status: SessionStatus) {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(id) {
            Some(entry) => entry.session.set_status(status, Utc::now()),
            None => debug!(session_id = %id, %status, "Status update for unknown session ignored"),
        }
    }

    async fn update_session(&self, id: &str, patch: SessionPatch) -> Option<Session> {
        let mut inner = self.inner.write().await;
        let entry = inner.sessions.get_mut(id)?;
        let stops_sequence = patch.status.as_ref().is_some_and(SessionStatus::is_terminal);
        entry.session.apply(patch, Utc::now());
        if stops_sequence {
            if let Some(timer) = entry.timer.take() {
                timer.cancel();
                info!(session_id = %id, status = %entry.session.status, "State sequence stopped by update");
            }
        }
        Some(entry.session.clone())
    }

    async fn get_sessions_by_repository_id(&self, repository_id: &str) -> Vec<Session> {
        let inner = self.inner.read().await;
        let mut entries = inner.repository_entries(repository_id);
        entries.sort_by_key(|e| Reverse((e.session.created_at, e.seq)));
        entries.into_iter().map(|e| e.session.clone()).collect()
    }

    async fn set_state_timer(&self, id: &str, timer: Box<dyn StateTimer>) {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.sessions.get_mut(id) else {
            warn!(session_id = %id, "Timer for unknown session cancelled");
            timer.cancel();
            return;
        };
        if let Some(previous) = entry.timer.replace(timer) {
            if previous.is_pending() {
                info!(session_id = %id, "Superseding pending state timer");
            }
            previous.cancel();
        }
    }

    async fn clear_state_timer(&self, id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(timer) = inner.sessions.get_mut(id).and_then(|e| e.timer.take()) {
            timer.cancel();
        }
    }

    async fn has_pending_timer(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(id)
            .and_then(|e| e.timer.as_ref())
            .is_some_and(|t| t.is_pending())
    }

    async fn add_domains(&self, domains: Vec<Domain>) -> Vec<Domain> {
        let mut inner = self.inner.write().await;
        let mut stored = Vec::with_capacity(domains.len());
        for mut domain in domains {
            match inner.sessions.get_mut(&domain.session_id) {
                Some(entry) => {
                    domain.repository_id = entry.session.resource_repository_id.clone();
                    entry.domains.push(domain.clone());
                    stored.push(domain);
                }
                None => warn!(
                    session_id = %domain.session_id,
                    "Dropping domain for unknown session"
                ),
            }
        }
        stored
    }

    async fn get_domains_by_session_id(&self, session_id: &str) -> Vec<Domain> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(session_id)
            .map(|e| e.domains.clone())
            .unwrap_or_default()
    }

    async fn get_domains_by_repository_id(&self, repository_id: &str) -> Vec<Domain> {
        let inner = self.inner.read().await;
        let mut domains: Vec<Domain> = inner
            .repository_entries(repository_id)
            .into_iter()
            .flat_map(|e| e.domains.iter().cloned())
            .collect();
        domains.sort_by_key(|d| d.page_range_start);
        domains
    }

    async fn add_questions(&self, questions: Vec<Question>) -> PortResult<Vec<Question>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        inner.check_new_questions(&questions)?;
        let mut stored = Vec::with_capacity(questions.len());
        for mut question in questions {
            match inner.sessions.get_mut(&question.session_id) {
                Some(entry) => {
                    question.repository_id = entry.session.resource_repository_id.clone();
                    entry.questions.push(question.clone());
                    inner
                        .question_owners
                        .insert(question.id.clone(), question.session_id.clone());
                    stored.push(question);
                }
                None => warn!(
                    session_id = %question.session_id,
                    "Dropping question for unknown session"
                ),
            }
        }
        Ok(stored)
    }

    async fn update_question(&self, id: &str, patch: QuestionPatch) -> Option<Question> {
        let mut inner = self.inner.write().await;
        let session_id = inner.question_owners.get(id)?.clone();
        let question = inner
            .sessions
            .get_mut(&session_id)?
            .questions
            .iter_mut()
            .find(|q| q.id == id)?;
        question.apply(patch, Utc::now());
        Some(question.clone())
    }

    async fn get_questions_by_session_id(&self, session_id: &str) -> Vec<Question> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(session_id)
            .map(|e| e.questions.clone())
            .unwrap_or_default()
    }

    async fn get_questions_by_repository_id(
        &self,
        repository_id: &str,
        is_sample: Option<bool>,
    ) -> Vec<Question> {
        let inner = self.inner.read().await;
        let mut questions: Vec<Question> = inner
            .repository_entries(repository_id)
            .into_iter()
            .flat_map(|e| e.questions.iter())
            .filter(|q| is_sample.is_none_or(|wanted| q.is_sample == wanted))
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.created_at);
        questions
    }

    async fn register_upload(&self, upload: PendingUpload) {
        let mut inner = self.inner.write().await;
        let before = inner.uploads.len();
        inner.uploads.retain(|_, u| !upload_expired(u));
        let expired = before - inner.uploads.len();
        if expired > 0 {
            debug!(expired, "Dropped stale presign registrations");
        }
        inner.uploads.insert(upload.job_id.clone(), upload);
    }

    async fn take_upload(&self, job_id: &str) -> Option<PendingUpload> {
        let mut inner = self.inner.write().await;
        inner.uploads.remove(job_id).filter(|u| !upload_expired(u))
    }

    async fn clear(&self) {
        let mut inner = self.inner.write().await;
        for timer in inner.sessions.values_mut().filter_map(|e| e.timer.take()) {
            timer.cancel();
        }
        let cleared = inner.sessions.len();
        *inner = StoreInner::default();
        info!(sessions = cleared, "Store cleared");
    }
}
