use crate::FailureKind;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request. Recorded as an outcome; never aborts a run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    #[error("Request could not be submitted: {0}")]
    Submission(String),

    #[error("No response within {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Service returned an error: {0}")]
    Service(String),
}

impl CallError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CallError::Submission(_) => FailureKind::Submission,
            CallError::Timeout(_) => FailureKind::Timeout,
            CallError::Service(_) => FailureKind::Service,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Percentile {0} is outside of 0..=100")]
    InvalidPercentile(u8),
}
