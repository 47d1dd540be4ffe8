use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to decode stored configuration")]
    Decode(#[from] serde_json::Error),

    #[error("min_questions {min} exceeds max_questions {max}")]
    QuestionLimits { min: u32, max: u32 },

    #[error("top_k_selection must be at least 1")]
    ZeroTopK,

    #[error("skill area \"{0}\" has min_items greater than max_items")]
    SkillQuota(String),

    #[error("criteria weights must be non-empty with positive weights")]
    InvalidWeights,

    #[error("score-to-band mapping must be strictly monotone")]
    NonMonotoneBands,
}
