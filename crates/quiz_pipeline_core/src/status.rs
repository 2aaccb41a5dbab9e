//! crates/quiz_pipeline_core/src/status.rs
//!
//! The textual status vocabulary a resource session moves through while the
//! simulated pipeline runs. Labels are the exact strings clients poll for.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// The status of a resource session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Processing,
    Decoding,
    /// OCR progress marker, `page` is 1-based.
    OcrPage { page: u32, total: u32 },
    OcrCompleted,
    AiProcessing,
    AiTopicsIdentified,
    /// Question generation progress marker, `batch` is 1-based.
    AiBatch { batch: u32, total: u32 },
    Completed,
    /// Declared for clients; nothing in the sequencer produces it.
    Failed,
}

impl SessionStatus {
    /// Whether no further transition is expected from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Processing => f.write_str("processing"),
            SessionStatus::Decoding => f.write_str("decoding"),
            SessionStatus::OcrPage { page, total } => write!(f, "ocr_page_{page}_of_{total}"),
            SessionStatus::OcrCompleted => f.write_str("ocr_completed"),
            SessionStatus::AiProcessing => f.write_str("ai_processing"),
            SessionStatus::AiTopicsIdentified => f.write_str("ai_topics_identified"),
            SessionStatus::AiBatch { batch, total } => write!(f, "ai_batch_{batch}_of_{total}"),
            SessionStatus::Completed => f.write_str("completed"),
            SessionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Returned when a label is not part of the status vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown session status: {0}")]
pub struct UnknownStatus(pub String);

fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(ocr_page|ai_batch)_(\d+)_of_(\d+)$").expect("progress pattern is valid")
    })
}

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let status = match label {
            "processing" => SessionStatus::Processing,
            "decoding" => SessionStatus::Decoding,
            "ocr_completed" => SessionStatus::OcrCompleted,
            "ai_processing" => SessionStatus::AiProcessing,
            "ai_topics_identified" => SessionStatus::AiTopicsIdentified,
            "completed" => SessionStatus::Completed,
            "failed" => SessionStatus::Failed,
            _ => {
                let unknown = || UnknownStatus(label.to_string());
                let caps = progress_pattern().captures(label).ok_or_else(unknown)?;
                let current: u32 = caps[2].parse().map_err(|_| unknown())?;
                let total: u32 = caps[3].parse().map_err(|_| unknown())?;
                if current == 0 || current > total {
                    return Err(unknown());
                }
                match &caps[1] {
                    "ocr_page" => SessionStatus::OcrPage { page: current, total },
                    _ => SessionStatus::AiBatch { batch: current, total },
                }
            }
        };
        Ok(status)
    }
}
