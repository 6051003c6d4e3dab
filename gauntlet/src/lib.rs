#![cfg_attr(docsrs, feature(doc_cfg))]
//! Bounded-concurrency evaluation harness for request/response services.
//!
//! An [`Evaluation`] pulls labeled requests from a [`RequestSource`](service::RequestSource),
//! submits them through a [`ServiceStub`](service::ServiceStub) with a hard cap on how many are
//! in flight, and summarizes latency and correctness into [`RunStatistics`] once every request
//! has resolved.

pub mod admission;
mod completion;
mod dispatcher;
mod error;
pub mod evaluation;
#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;
mod limiter;
pub mod service;

pub use dispatcher::run_evaluation;
pub use error::RunError;
pub use evaluation::Evaluation;
pub use gauntlet_core::{EvalConfig, RunStatistics};

pub mod prelude {
    pub use crate::evaluation::{ConfigurableEvaluation, Evaluation};
    pub use crate::service::{ClassScores, Prediction, RequestSource, ServiceStub};
    pub use crate::RunError;

    #[cfg(feature = "http")]
    pub use crate::http::HttpStub;

    pub use gauntlet_core::{CallError, EvalConfig, RunStatistics};
}
