//! Evaluation builder
use crate::dispatcher::run_evaluation;
use crate::error::RunError;
use crate::service::{Prediction, RequestSource, ServiceStub};
use futures_util::future::BoxFuture;
use gauntlet_core::{EvalConfig, RunStatistics};
use std::{
    future::Future,
    num::{NonZeroU32, NonZeroUsize},
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

type RunnerFut = BoxFuture<'static, Result<RunStatistics, RunError>>;

/// A configured evaluation of one service against one labeled request source.
///
/// Nothing is submitted until the evaluation is awaited.
///
/// # Example
/// ```no_run
/// use gauntlet::prelude::*;
/// use std::num::NonZeroUsize;
/// use std::time::Duration;
///
/// # async fn run<S>(stub: S, dataset: Vec<(S::Request, usize)>)
/// # where S: ServiceStub, S::Request: Send, S::Response: Prediction<Label = usize> {
/// let stats = Evaluation::new("mnist", stub, dataset.into_iter())
///     .concurrency(NonZeroUsize::new(8).unwrap())
///     .timeout(Duration::from_secs(5))
///     .await
///     .unwrap();
///
/// println!("{stats}");
/// # }
/// ```
#[pin_project::pin_project]
pub struct Evaluation<S, Src> {
    parts: Option<(S, Src)>,
    runner_fut: Option<RunnerFut>,
    config: EvalConfig,
}

impl<S, Src> Evaluation<S, Src> {
    pub fn new(name: &str, stub: S, source: Src) -> Self {
        Self::with_config(stub, source, EvalConfig::new(name))
    }

    pub fn with_config(stub: S, source: Src, config: EvalConfig) -> Self {
        Self {
            parts: Some((stub, source)),
            runner_fut: None,
            config,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }
}

impl<S, Src> Future for Evaluation<S, Src>
where
    S: ServiceStub,
    Src: RequestSource<Input = S::Request, Label = <S::Response as Prediction>::Label>
        + Send
        + 'static,
{
    type Output = Result<RunStatistics, RunError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Some((stub, source)) = this.parts.take() {
            let config = this.config.clone();
            *this.runner_fut = Some(Box::pin(async move {
                run_evaluation(&stub, source, config).await
            }));
        }

        if let Some(runner) = this.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

pub trait ConfigurableEvaluation<T: Send>: Future<Output = T> + Sized + Send {
    fn concurrency(self, concurrency: NonZeroUsize) -> Self;
    fn requests(self, requests: usize) -> Self;
    fn timeout(self, timeout: Duration) -> Self;
    fn max_rps(self, max_rps: NonZeroU32) -> Self;
    fn percentiles(self, percentiles: impl IntoIterator<Item = u8>) -> Self;
}

impl<S, Src> ConfigurableEvaluation<Result<RunStatistics, RunError>> for Evaluation<S, Src>
where
    S: ServiceStub,
    Src: RequestSource<Input = S::Request, Label = <S::Response as Prediction>::Label>
        + Send
        + 'static,
{
    /// Maximum number of requests in flight at once. Defaults to 1, which fully serializes the
    /// run.
    fn concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Number of requests to send. Defaults to everything the source holds; the source must hold
    /// at least this many.
    fn requests(mut self, requests: usize) -> Self {
        self.config.requests = Some(requests);
        self
    }

    /// Per-request deadline. Defaults to 5 seconds.
    fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Cap the submission rate, in requests per second.
    fn max_rps(mut self, max_rps: NonZeroU32) -> Self {
        self.config.max_rps = Some(max_rps);
        self
    }

    /// Latency percentiles to report, each in `0..=100`. Defaults to 50, 90 and 99.
    fn percentiles(mut self, percentiles: impl IntoIterator<Item = u8>) -> Self {
        self.config.percentiles = percentiles.into_iter().collect();
        self
    }
}
