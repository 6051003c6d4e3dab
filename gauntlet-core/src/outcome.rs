#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Terminal record of one request.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Outcome {
    Success { latency: Duration, correct: bool },
    Failure { kind: FailureKind },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            Outcome::Success { latency, .. } => Some(*latency),
            Outcome::Failure { .. } => None,
        }
    }

    /// Whether the prediction matched the expected label. Failed requests count as misses.
    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Success { correct: true, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailureKind {
    /// The call could not be dispatched at all.
    Submission,
    /// No response arrived before the per-request deadline.
    Timeout,
    /// The service answered with an explicit failure.
    Service,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Submission => "submission",
            FailureKind::Timeout => "timeout",
            FailureKind::Service => "service",
        };
        f.write_str(s)
    }
}

/// Fixed-size table of write-once outcome cells, one per request index.
///
/// The table is sized before dispatch begins and never grows. Each completion handler owns a
/// distinct index, so cells are never contended; a second write to the same index is refused.
#[derive(Debug)]
pub struct OutcomeTable {
    cells: Box<[OnceLock<Outcome>]>,
}

impl OutcomeTable {
    pub fn new(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store the outcome for `index`.
    ///
    /// Returns the rejected outcome if the index is out of range or already written.
    pub fn record(&self, index: usize, outcome: Outcome) -> Result<(), Outcome> {
        match self.cells.get(index) {
            Some(cell) => cell.set(outcome),
            None => Err(outcome),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Outcome> {
        self.cells.get(index).and_then(OnceLock::get)
    }

    pub fn recorded(&self) -> usize {
        self.cells.iter().filter(|c| c.get().is_some()).count()
    }

    /// Copy out every outcome in index order, or the first index that was never written.
    pub fn to_vec(&self) -> Result<Vec<Outcome>, usize> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| cell.get().copied().ok_or(i))
            .collect()
    }
}
