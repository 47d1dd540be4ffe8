//! Assessment engine: the session state machine, type-dispatched scoring,
//! and the recommendation engine. All I/O goes through `windward-db`; the
//! clock is always passed in so flows stay deterministic under test.

pub mod engine;
pub mod error;
pub mod recommend;
pub mod scorer;
pub mod snapshot;

pub use engine::{
    AnswerCommand, AnswerOutcome, Completion, EngineActor, EngineSettings, NextQuestion, OverrideItem, StartOutcome,
};
pub use error::EngineError;
pub use scorer::{ScorerError, Scorers, SpeakingEvaluator, WritingEvaluator};
