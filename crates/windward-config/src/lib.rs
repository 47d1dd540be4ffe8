//! Typed assessment tunables. Raw JSON from the `assessment_config` row is
//! decoded into these structs at the edge; the engine only sees typed
//! values.

pub mod adaptive;
pub mod diagnostic;
pub mod error;

pub use adaptive::{AdaptiveParams, GeneralParams, SkillArea, StoppingCriterion};
pub use diagnostic::{BandCut, DiagnosticParams, SubmissionMode};
pub use error::ConfigError;
