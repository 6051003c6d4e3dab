use crate::{FailureKind, Outcome};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Summary of a completed evaluation run.
///
/// Built once every outcome has been recorded, and a pure function of those outcomes: computing
/// it twice from the same outcomes yields identical values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RunStatistics {
    pub total: usize,
    pub succeeded: usize,
    pub correct: usize,
    pub failures: FailureCounts,
    /// Fraction of all requests that were not correctly classified. Failed requests count as
    /// misclassified.
    pub classification_error_rate: f64,
    /// Fraction of all requests that failed.
    pub request_error_rate: f64,
    pub elapsed: Duration,
    /// Requests per second over the whole run.
    pub throughput: f64,
    /// Latency over successful requests only; `None` when nothing succeeded.
    pub latency: Option<LatencySummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FailureCounts {
    pub submission: usize,
    pub timeout: usize,
    pub service: usize,
}

impl FailureCounts {
    pub fn total(&self) -> usize {
        self.submission + self.timeout + self.service
    }

    fn count(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Submission => self.submission += 1,
            FailureKind::Timeout => self.timeout += 1,
            FailureKind::Service => self.service += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LatencySummary {
    pub percentiles: BTreeMap<u8, Duration>,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    /// Sample standard deviation, defined once there are at least two successes.
    pub std_dev: Option<Duration>,
}

impl RunStatistics {
    pub fn from_outcomes(outcomes: &[Outcome], elapsed: Duration, percentiles: &[u8]) -> Self {
        let total = outcomes.len();

        let mut failures = FailureCounts::default();
        let mut latencies = Vec::with_capacity(total);
        let mut correct = 0;
        for outcome in outcomes {
            match outcome {
                Outcome::Success {
                    latency,
                    correct: is_correct,
                } => {
                    latencies.push(*latency);
                    if *is_correct {
                        correct += 1;
                    }
                }
                Outcome::Failure { kind } => failures.count(*kind),
            }
        }

        let succeeded = latencies.len();
        let throughput = if total == 0 || elapsed.is_zero() {
            0.
        } else {
            total as f64 / elapsed.as_secs_f64()
        };

        Self {
            total,
            succeeded,
            correct,
            failures,
            classification_error_rate: ratio(total - correct, total),
            request_error_rate: ratio(total - succeeded, total),
            elapsed,
            throughput,
            latency: LatencySummary::new(latencies, percentiles),
        }
    }

    pub fn percentile(&self, p: u8) -> Option<Duration> {
        self.latency
            .as_ref()
            .and_then(|l| l.percentiles.get(&p).copied())
    }
}

impl LatencySummary {
    fn new(mut latencies: Vec<Duration>, percentiles: &[u8]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        latencies.sort_unstable();

        let secs: Vec<f64> = latencies.iter().map(Duration::as_secs_f64).collect();
        let mean = statistical::mean(&secs);
        let std_dev = if secs.len() > 1 {
            Some(Duration::from_secs_f64(statistical::standard_deviation(
                &secs,
                Some(mean),
            )))
        } else {
            None
        };

        Some(Self {
            percentiles: percentiles
                .iter()
                .map(|p| (*p, percentile(&latencies, *p)))
                .collect(),
            min: latencies[0],
            max: latencies[latencies.len() - 1],
            mean: Duration::from_secs_f64(mean),
            std_dev,
        })
    }
}

/// Linear interpolation between the closest order statistics. `sorted` must be non-empty.
pub fn percentile(sorted: &[Duration], p: u8) -> Duration {
    let rank = f64::from(p.min(100)) / 100. * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    if lo == hi || frac == 0. {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]).mul_f64(frac)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.
    } else {
        part as f64 / total as f64
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Inference error rate: {:.2}%",
            self.classification_error_rate * 100.
        )?;
        writeln!(f, "Request error rate: {:.2}%", self.request_error_rate * 100.)?;
        if self.failures.total() > 0 {
            writeln!(
                f,
                "  submission={}, timeout={}, service={}",
                self.failures.submission, self.failures.timeout, self.failures.service
            )?;
        }
        writeln!(f, "Avg. Throughput: {:.2} reqs/s", self.throughput)?;
        writeln!(
            f,
            "Total time: {}",
            humantime::format_duration(round_micros(self.elapsed))
        )?;

        if let Some(latency) = &self.latency {
            writeln!(f, "Request Latency (percentiles):")?;
            for (p, dur) in &latency.percentiles {
                writeln!(
                    f,
                    "  {p}th ....... {}",
                    humantime::format_duration(round_micros(*dur))
                )?;
            }
        }
        Ok(())
    }
}

fn round_micros(dur: Duration) -> Duration {
    Duration::from_micros(dur.as_micros() as u64)
}
