//! Boundaries to the outside world: where requests come from and who answers them.
use futures_util::future::BoxFuture;
use gauntlet_core::CallError;
#[cfg(feature = "http")]
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Handle for one in-flight call.
pub type ResponseFuture<R> = BoxFuture<'static, Result<R, CallError>>;

/// A remote service that answers one request per call.
///
/// `call_async` must not wait for the reply; it either returns a future that resolves to the
/// reply, or fails synchronously when the call cannot be dispatched at all. The stub is expected
/// to honor `timeout`; the harness also bounds the wait with the same deadline.
pub trait ServiceStub: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Prediction + Send + 'static;

    fn call_async(
        &self,
        request: Self::Request,
        timeout: Duration,
    ) -> Result<ResponseFuture<Self::Response>, CallError>;
}

/// A service response that carries a predicted label.
pub trait Prediction {
    type Label: PartialEq + Send + 'static;

    fn predicted_label(&self) -> Self::Label;
}

macro_rules! impl_label_prediction {
    ($($t:ty),*) => {
        $(
            impl Prediction for $t {
                type Label = $t;

                fn predicted_label(&self) -> $t {
                    self.clone()
                }
            }
        )*
    };
}

impl_label_prediction!(u8, u16, u32, u64, usize, i32, i64, String);

/// Finite, ordered supply of `(input, expected_label)` pairs.
///
/// Every [`ExactSizeIterator`] over pairs is a source, so a `Vec<(I, L)>` can be passed in as
/// `vec.into_iter()`.
pub trait RequestSource {
    type Input;
    type Label;

    /// Number of pairs still available.
    fn available(&self) -> usize;

    fn next_request(&mut self) -> Option<(Self::Input, Self::Label)>;
}

impl<T, I, L> RequestSource for T
where
    T: ExactSizeIterator<Item = (I, L)>,
{
    type Input = I;
    type Label = L;

    fn available(&self) -> usize {
        self.len()
    }

    fn next_request(&mut self) -> Option<(I, L)> {
        self.next()
    }
}

/// Per-class scores returned by a classifier. The predicted label is the index of the highest
/// score (first one wins on ties, NaN never wins over a number).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "http", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "http", serde(try_from = "Vec<f32>", into = "Vec<f32>"))]
pub struct ClassScores(Vec<f32>);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("score vector is empty")]
pub struct EmptyScores;

impl ClassScores {
    pub fn scores(&self) -> &[f32] {
        &self.0
    }

    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, score) in self.0.iter().enumerate().skip(1) {
            if *score > self.0[best] || (self.0[best].is_nan() && !score.is_nan()) {
                best = i;
            }
        }
        best
    }
}

impl TryFrom<Vec<f32>> for ClassScores {
    type Error = EmptyScores;

    fn try_from(scores: Vec<f32>) -> Result<Self, Self::Error> {
        if scores.is_empty() {
            Err(EmptyScores)
        } else {
            Ok(Self(scores))
        }
    }
}

impl From<ClassScores> for Vec<f32> {
    fn from(scores: ClassScores) -> Self {
        scores.0
    }
}

impl Prediction for ClassScores {
    type Label = usize;

    fn predicted_label(&self) -> usize {
        self.argmax()
    }
}
