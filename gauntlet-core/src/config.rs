use crate::{ConfigError, DEFAULT_PERCENTILES, DEFAULT_TIMEOUT, MAX_PERCENTILE};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "serde")]
use serde_with::{serde_as, DurationMilliSeconds};
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

/// Settings for a single evaluation run.
///
/// `requests` is optional; when unset the run uses however many pairs the request source
/// reports.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalConfig {
    pub name: String,
    pub requests: Option<usize>,
    pub concurrency: NonZeroUsize,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationMilliSeconds<u64>"))]
    pub timeout: Duration,
    pub max_rps: Option<NonZeroU32>,
    pub percentiles: Vec<u8>,
}

impl EvalConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Reject settings the dispatcher cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        if let Some(p) = self.percentiles.iter().find(|p| **p > MAX_PERCENTILE) {
            return Err(ConfigError::InvalidPercentile(*p));
        }

        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            name: "evaluation".to_string(),
            requests: None,
            concurrency: NonZeroUsize::MIN,
            timeout: DEFAULT_TIMEOUT,
            max_rps: None,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
        }
    }
}
