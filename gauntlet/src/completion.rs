use crate::admission::AdmissionSlot;
use crate::service::{Prediction, ResponseFuture};
use gauntlet_core::{CallError, Outcome, OutcomeTable};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

#[cfg(feature = "metrics")]
const LATENCY_METRIC: &str = "gauntlet_request_latency";
#[cfg(feature = "metrics")]
const SUCCESS_METRIC: &str = "gauntlet_request_success";
#[cfg(feature = "metrics")]
const ERROR_METRIC: &str = "gauntlet_request_error";
#[cfg(feature = "metrics")]
const MISCLASSIFIED_METRIC: &str = "gauntlet_request_misclassified";

/// Everything the completion handler needs to know about its request, moved in by value.
#[derive(Debug)]
pub(crate) struct RequestContext<L> {
    pub index: usize,
    pub expected: L,
    pub started: Instant,
}

/// Wait for one call to resolve, record its outcome, then release its admission slot.
///
/// The slot is held until the outcome has been written, so once the join barrier sees every
/// slot released every outcome is visible.
pub(crate) async fn complete<R>(
    ctx: RequestContext<R::Label>,
    slot: AdmissionSlot,
    call: Result<ResponseFuture<R>, CallError>,
    timeout: Duration,
    outcomes: Arc<OutcomeTable>,
) where
    R: Prediction,
{
    let _slot = slot;

    let result = match call {
        Ok(fut) => match tokio::time::timeout(timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(CallError::Timeout(timeout)),
        },
        Err(err) => Err(err),
    };

    let outcome = resolve(&ctx, result);

    #[cfg(feature = "metrics")]
    record_metrics(&outcome);

    if outcomes.record(ctx.index, outcome).is_err() {
        error!(
            "Outcome for request {} was already recorded. This is a bug in gauntlet.",
            ctx.index
        );
    }
}

pub(crate) fn resolve<R: Prediction>(
    ctx: &RequestContext<R::Label>,
    result: Result<R, CallError>,
) -> Outcome {
    match result {
        Ok(response) => {
            let latency = ctx.started.elapsed();
            let correct = response.predicted_label() == ctx.expected;
            trace!(
                "Request {} completed in {latency:?}, correct={correct}",
                ctx.index
            );
            Outcome::Success { latency, correct }
        }
        Err(err) => {
            warn!("Request {} failed: {err}", ctx.index);
            Outcome::Failure { kind: err.kind() }
        }
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(outcome: &Outcome) {
    match outcome {
        Outcome::Success { latency, correct } => {
            metrics::histogram!(LATENCY_METRIC).record(latency.as_secs_f64());
            metrics::counter!(SUCCESS_METRIC).increment(1);
            if !correct {
                metrics::counter!(MISCLASSIFIED_METRIC).increment(1);
            }
        }
        Outcome::Failure { kind } => {
            metrics::counter!(ERROR_METRIC, "kind" => kind.to_string()).increment(1);
        }
    }
}
