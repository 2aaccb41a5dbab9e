//! crates/quiz_pipeline_core/src/sequence.rs
//!
//! The ordered status sequences a simulated job walks through, and the
//! finite-state machine that steps over them. Timing is left to the caller:
//! the machine only knows the order and the delay each step should take.

use std::str::FromStr;
use std::time::Duration;

use crate::status::SessionStatus;

/// Delay between steps of the short sequence.
pub const SIMPLE_STEP_DELAY: Duration = Duration::from_millis(2000);

/// Delay between steps of the page/batch-aware sequence.
pub const DETAILED_STEP_DELAY: Duration = Duration::from_millis(400);

/// Which sequence variant a new upload is armed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKind {
    #[default]
    Simple,
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sequence kind '{0}', expected 'simple' or 'detailed'")]
pub struct UnknownSequenceKind(pub String);

impl FromStr for SequenceKind {
    type Err = UnknownSequenceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(SequenceKind::Simple),
            "detailed" => Ok(SequenceKind::Detailed),
            _ => Err(UnknownSequenceKind(s.to_string())),
        }
    }
}

/// An ordered, non-empty list of states ending in `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSequence {
    states: Vec<SessionStatus>,
    step_delay: Duration,
}

impl StateSequence {
    /// `processing → decoding → ocr_completed → ai_processing → completed`
    pub fn simple() -> Self {
        Self {
            states: vec![
                SessionStatus::Processing,
                SessionStatus::Decoding,
                SessionStatus::OcrCompleted,
                SessionStatus::AiProcessing,
                SessionStatus::Completed,
            ],
            step_delay: SIMPLE_STEP_DELAY,
        }
    }

    /// Processing, one marker per OCR'd page, OCR/AI milestones, one marker
    /// per question batch, then completed.
    pub fn detailed(pages: u32, batches: u32) -> Self {
        let mut states = Vec::with_capacity(pages as usize + batches as usize + 5);
        states.push(SessionStatus::Processing);
        states.extend((1..=pages).map(|page| SessionStatus::OcrPage { page, total: pages }));
        states.push(SessionStatus::OcrCompleted);
        states.push(SessionStatus::AiProcessing);
        states.push(SessionStatus::AiTopicsIdentified);
        states.extend((1..=batches).map(|batch| SessionStatus::AiBatch {
            batch,
            total: batches,
        }));
        states.push(SessionStatus::Completed);
        Self {
            states,
            step_delay: DETAILED_STEP_DELAY,
        }
    }

    pub fn states(&self) -> &[SessionStatus] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    /// Time from the first state until the terminal one is written.
    pub fn total_duration(&self) -> Duration {
        self.step_delay * self.states.len().saturating_sub(1) as u32
    }
}

/// A cursor over a [`StateSequence`]. Each call to `next` moves one step and
/// yields the new state; at the last state it yields `None` and stays put.
#[derive(Debug, Clone)]
pub struct StateMachine {
    sequence: StateSequence,
    index: usize,
}

impl StateMachine {
    pub fn new(sequence: StateSequence) -> Self {
        Self { sequence, index: 0 }
    }

    /// Starts at `index`, clamped to the last state.
    pub fn starting_at(sequence: StateSequence, index: usize) -> Self {
        let index = index.min(sequence.len().saturating_sub(1));
        Self { sequence, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &SessionStatus {
        &self.sequence.states[self.index]
    }

    pub fn is_terminal(&self) -> bool {
        self.index + 1 >= self.sequence.len()
    }

    pub fn remaining_steps(&self) -> usize {
        self.sequence.len().saturating_sub(self.index + 1)
    }

    pub fn step_delay(&self) -> Duration {
        self.sequence.step_delay()
    }
}

impl Iterator for StateMachine {
    type Item = SessionStatus;

    fn next(&mut self) -> Option<SessionStatus> {
        if self.is_terminal() {
            return None;
        }
        self.index += 1;
        Some(self.current().clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining_steps();
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_sequence_labels() {
        let labels: Vec<String> = StateSequence::simple()
            .states()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            labels,
            ["processing", "decoding", "ocr_completed", "ai_processing", "completed"]
        );
    }

    #[test]
    fn detailed_sequence_has_page_and_batch_markers() {
        let sequence = StateSequence::detailed(3, 2);
        let labels: Vec<String> = sequence.states().iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            [
                "processing",
                "ocr_page_1_of_3",
                "ocr_page_2_of_3",
                "ocr_page_3_of_3",
                "ocr_completed",
                "ai_processing",
                "ai_topics_identified",
                "ai_batch_1_of_2",
                "ai_batch_2_of_2",
                "completed",
            ]
        );
        assert_eq!(sequence.step_delay(), DETAILED_STEP_DELAY);
    }

    #[test]
    fn machine_reaches_terminal_after_len_minus_one_steps() {
        let sequence = StateSequence::simple();
        let steps = sequence.len() - 1;
        let mut machine = StateMachine::new(sequence);

        let walked: Vec<SessionStatus> = machine.by_ref().collect();
        assert_eq!(walked.len(), steps);
        assert_eq!(machine.current(), &SessionStatus::Completed);
        assert!(machine.is_terminal());

        // Re-invoking at the last index does nothing.
        assert_eq!(machine.next(), None);
        assert_eq!(machine.index(), steps);
    }

    #[test]
    fn starting_index_is_clamped() {
        let machine = StateMachine::starting_at(StateSequence::simple(), 99);
        assert!(machine.is_terminal());
        assert_eq!(machine.remaining_steps(), 0);
    }

    #[test]
    fn total_duration_counts_transitions() {
        assert_eq!(StateSequence::simple().total_duration(), Duration::from_millis(8000));
    }

    #[test]
    fn sequence_kind_parses_case_insensitively() {
        assert_eq!("Detailed".parse::<SequenceKind>(), Ok(SequenceKind::Detailed));
        assert!("fast".parse::<SequenceKind>().is_err());
    }
}
