use crate::admission::AdmissionController;
use crate::completion::{self, RequestContext};
use crate::error::RunError;
use crate::limiter::rate_limiter;
use crate::service::{Prediction, RequestSource, ServiceStub};
use gauntlet_core::{EvalConfig, OutcomeTable, RunStatistics};
use std::sync::Arc;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Run one evaluation: submit every request from `source` through `stub` with at most
/// `config.concurrency` in flight, wait for all of them, and summarize the outcomes.
///
/// The submission path only ever waits for admission (and pacing, if `max_rps` is set), never
/// for a reply. Per-request failures are recorded as outcomes; only configuration and source
/// problems fail the run.
#[instrument(name = "evaluation", skip_all, fields(name = %config.name))]
pub async fn run_evaluation<S, Src>(
    stub: &S,
    source: Src,
    config: EvalConfig,
) -> Result<RunStatistics, RunError>
where
    S: ServiceStub,
    Src: RequestSource<Input = S::Request, Label = <S::Response as Prediction>::Label>,
{
    config.validate()?;

    let available = source.available();
    let total = config.requests.unwrap_or(available);
    if available < total {
        return Err(RunError::SourceTooShort {
            expected: total,
            available,
        });
    }

    let admission = AdmissionController::new(config.concurrency);
    dispatch(stub, source, &config, total, &admission).await
}

/// Submission loop and join barrier over a caller-supplied controller.
pub(crate) async fn dispatch<S, Src>(
    stub: &S,
    mut source: Src,
    config: &EvalConfig,
    total: usize,
    admission: &Arc<AdmissionController>,
) -> Result<RunStatistics, RunError>
where
    S: ServiceStub,
    Src: RequestSource<Input = S::Request, Label = <S::Response as Prediction>::Label>,
{
    info!(
        "Running {} requests with concurrency {} and timeout {:?}",
        total, config.concurrency, config.timeout
    );

    let outcomes = Arc::new(OutcomeTable::new(total));
    let limiter = config.max_rps.map(rate_limiter);

    let start = Instant::now();
    let mut submitted = 0;
    for index in 0..total {
        let Some((input, expected)) = source.next_request() else {
            error!("Request source ran dry at request {index} of {total}");
            break;
        };

        if let Some(limiter) = &limiter {
            limiter.until_ready().await;
        }
        let slot = admission.acquire().await;

        let ctx = RequestContext {
            index,
            expected,
            started: Instant::now(),
        };
        let call = stub.call_async(input, config.timeout);
        debug!("Submitted request {index}");

        tokio::spawn(completion::complete(
            ctx,
            slot,
            call,
            config.timeout,
            outcomes.clone(),
        ));
        submitted += 1;
    }

    admission.await_all(submitted).await;
    let elapsed = start.elapsed();
    debug!("Admission counters at join: {:?}", admission.snapshot());

    if submitted < total {
        return Err(RunError::SourceExhausted {
            expected: total,
            yielded: submitted,
        });
    }

    let outcomes = outcomes.to_vec().map_err(RunError::MissingOutcome)?;
    let stats = RunStatistics::from_outcomes(&outcomes, elapsed, &config.percentiles);

    info!(
        "Evaluation complete: {} requests in {:?}, request error rate {:.2}, classification error rate {:.2}",
        stats.total, stats.elapsed, stats.request_error_rate, stats.classification_error_rate
    );

    Ok(stats)
}
