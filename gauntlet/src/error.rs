use gauntlet_core::ConfigError;
use thiserror::Error;

/// Fatal failure of an evaluation run. Per-request failures never surface here; they are
/// recorded as outcomes.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Request source holds {available} requests but {expected} were requested")]
    SourceTooShort { expected: usize, available: usize },

    #[error("Request source ran dry after {yielded} of {expected} requests")]
    SourceExhausted { expected: usize, yielded: usize },

    #[error("No outcome was recorded for request {0}")]
    MissingOutcome(usize),
}
