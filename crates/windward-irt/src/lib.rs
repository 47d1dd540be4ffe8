//! Item Response Theory kernel: response probability, Fisher information,
//! EAP ability estimation, item selection, termination, and CEFR banding.
//! Pure and deterministic; no I/O.

pub mod cefr;
pub mod estimate;
pub mod model;
pub mod select;
pub mod terminate;

pub use cefr::{CefrLevel, ProficiencyRange};
pub use estimate::{AbilityEstimate, QuadratureGrid, ScoredResponse};
pub use model::{IrtModel, ItemParams, ParamError};
pub use select::{CandidateItem, SkillQuota, select_next};
pub use terminate::{StopReason, StopRule, Termination};

/// Ability estimates are clamped to this range after every update.
pub const THETA_MIN: f64 = -4.0;
pub const THETA_MAX: f64 = 4.0;

/// Probabilities are clamped away from 0 and 1 before taking logs.
pub const PROB_FLOOR: f64 = 1e-9;

/// Tolerance for float comparisons in selection tie-breaking.
pub const COMPARE_TOLERANCE: f64 = 1e-6;
