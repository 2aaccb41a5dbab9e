//! services/mock_api/src/web/sequencer_task.rs
//!
//! This module contains the background "worker" that walks a session through
//! its state sequence, one delayed step at a time.

use std::sync::Arc;

use quiz_pipeline_core::generator::GeneratedContent;
use quiz_pipeline_core::ports::{SessionStore, StateTimer};
use quiz_pipeline_core::sequence::{SequenceKind, StateMachine, StateSequence};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Topics handled by one simulated question-generation batch.
pub const TOPICS_PER_BATCH: usize = 3;

/// Builds the sequence a new upload is armed with.
pub fn sequence_for(kind: SequenceKind, content: &GeneratedContent) -> StateSequence {
    match kind {
        SequenceKind::Simple => StateSequence::simple(),
        SequenceKind::Detailed => {
            let batches = content.topics.len().div_ceil(TOPICS_PER_BATCH) as u32;
            StateSequence::detailed(content.page_count(), batches)
        }
    }
}

/// The timer handle a running sequence leaves in the store.
pub struct SequenceTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StateTimer for SequenceTimer {
    fn cancel(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    fn is_pending(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Arms state sequences against a store.
#[derive(Clone)]
pub struct Sequencer {
    store: Arc<dyn SessionStore>,
}

impl Sequencer {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Starts walking `session_id` from the machine's current state, replacing
    /// any chain already running for that session. Returns `false`, arming
    /// nothing, when the machine is already at its last state.
    pub async fn arm(&self, session_id: &str, machine: StateMachine) -> bool {
        if machine.is_terminal() {
            debug!(session_id, status = %machine.current(), "Sequence already terminal");
            return false;
        }

        info!(
            session_id,
            from = %machine.current(),
            steps = machine.remaining_steps(),
            delay_ms = machine.step_delay().as_millis() as u64,
            "Arming state sequence"
        );
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_sequence(
            self.store.clone(),
            session_id.to_string(),
            machine,
            token.clone(),
        ));
        self.store
            .set_state_timer(session_id, Box::new(SequenceTimer { token, handle }))
            .await;
        true
    }
}

/// Sleeps one step delay, writes the next state, and repeats until the
/// terminal state is written or the token is cancelled.
async fn run_sequence(
    store: Arc<dyn SessionStore>,
    session_id: String,
    mut machine: StateMachine,
    token: CancellationToken,
) {
    let delay = machine.step_delay();
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(session_id = %session_id, at = %machine.current(), "State sequence cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let Some(status) = machine.next() else {
            break;
        };
        debug!(session_id = %session_id, %status, "Advancing session status");
        store.update_session_status(&session_id, status).await;

        if machine.is_terminal() {
            info!(session_id = %session_id, status = %machine.current(), "State sequence finished");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use chrono::Utc;
    use quiz_pipeline_core::domain::Session;
    use quiz_pipeline_core::status::SessionStatus;
    use quiz_pipeline_core::MockContentGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    async fn store_with_session(id: &str) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let session = Session::new(id, "doc.pdf", format!("uploads/d/{id}/doc.pdf"), "application/pdf", Utc::now());
        store.add_session(session, vec![], vec![]).await.unwrap();
        store
    }

    async fn history_len(store: &InMemoryStore, id: &str) -> usize {
        store.get_session_by_id(id).await.unwrap().status_history.len()
    }

    #[tokio::test(start_paused = true)]
    async fn walks_to_completed_then_disarms() {
        let store = store_with_session("job-1").await;
        let sequencer = Sequencer::new(store.clone());
        let sequence = StateSequence::simple();
        let total = sequence.total_duration();

        assert!(sequencer.arm("job-1", StateMachine::new(sequence)).await);
        assert!(store.has_pending_timer("job-1").await);

        tokio::time::sleep(total + Duration::from_millis(10)).await;

        let session = store.get_session_by_id("job-1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.status_history.len(), 5);
        assert!(!store.has_pending_timer("job-1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn arming_at_the_last_index_is_a_no_op() {
        let store = store_with_session("job-1").await;
        let sequencer = Sequencer::new(store.clone());

        let machine = StateMachine::starting_at(StateSequence::simple(), 4);
        assert!(!sequencer.arm("job-1", machine).await);
        assert!(!store.has_pending_timer("job-1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_supersedes_the_running_chain() {
        let store = store_with_session("job-1").await;
        let sequencer = Sequencer::new(store.clone());
        let delay = StateSequence::simple().step_delay();

        sequencer.arm("job-1", StateMachine::new(StateSequence::simple())).await;
        sequencer.arm("job-1", StateMachine::new(StateSequence::simple())).await;

        tokio::time::sleep(delay + Duration::from_millis(10)).await;
        // One transition per delay window, not two.
        assert_eq!(history_len(&store, "job-1").await, 2);

        tokio::time::sleep(delay).await;
        assert_eq!(history_len(&store, "job-1").await, 3);
    }

    #[test]
    fn detailed_sequence_follows_generated_content() {
        let content = MockContentGenerator::default().generate(
            &mut StdRng::seed_from_u64(1),
            "job-1",
            None,
            Utc::now(),
        );
        let sequence = sequence_for(SequenceKind::Detailed, &content);
        let pages = content.page_count() as usize;
        // processing + pages + ocr_completed + ai_processing + topics + 4 batches + completed
        assert_eq!(sequence.len(), 1 + pages + 3 + 4 + 1);
    }
}
