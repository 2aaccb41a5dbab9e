pub mod domain;
pub mod generator;
pub mod ports;
pub mod sequence;
pub mod status;

pub use domain::{
    Difficulty, Domain, PendingUpload, Question, QuestionOption, QuestionPatch,
    ResourceRepository, Session, SessionPatch, StatusChange, TopicRange,
};
pub use generator::{GeneratedContent, MockContentGenerator};
pub use ports::{PortError, PortResult, SessionStore, StateTimer};
pub use sequence::{SequenceKind, StateMachine, StateSequence};
pub use status::SessionStatus;
