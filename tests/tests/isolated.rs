#[allow(unused)]
use utils::*;

use gauntlet::prelude::*;
use gauntlet::service::ResponseFuture;
use rand_distr::{Distribution, Exp};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type Reply = oneshot::Sender<Result<u32, CallError>>;

/// Stub that hands every call to a responder task over a channel. The responder decides when, and
/// whether, each call is answered.
struct ChannelStub {
    tx: mpsc::UnboundedSender<(Job, Reply)>,
}

#[derive(Debug, Clone, Copy)]
struct Job {
    index: usize,
    delay: Duration,
    answer: Option<u32>,
}

impl ServiceStub for ChannelStub {
    type Request = Job;
    type Response = u32;

    fn call_async(&self, job: Job, _timeout: Duration) -> Result<ResponseFuture<u32>, CallError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send((job, reply))
            .map_err(|_| CallError::Submission("responder is gone".into()))?;

        Ok(Box::pin(async move {
            rx.await
                .map_err(|_| CallError::Service("reply dropped".into()))?
        }))
    }
}

#[derive(Debug, Default)]
struct Responder {
    pending: AtomicUsize,
    peak: AtomicUsize,
    answered: AtomicUsize,
}

/// Answer each job after its delay, or drop the reply when it has no answer.
fn spawn_responder() -> (ChannelStub, Arc<Responder>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<(Job, Reply)>();
    let responder = Arc::new(Responder::default());

    let state = responder.clone();
    tokio::spawn(async move {
        while let Some((job, reply)) = rx.recv().await {
            let pending = state.pending.fetch_add(1, Ordering::SeqCst) + 1;
            state.peak.fetch_max(pending, Ordering::SeqCst);

            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(job.delay).await;
                state.pending.fetch_sub(1, Ordering::SeqCst);
                debug!("Answering job {} with {:?}", job.index, job.answer);
                if let Some(answer) = job.answer {
                    state.answered.fetch_add(1, Ordering::SeqCst);
                    let _ = reply.send(Ok(answer));
                }
            });
        }
    });

    (ChannelStub { tx }, responder)
}

fn jobs(n: usize, f: impl Fn(usize) -> (Job, u32)) -> Vec<(Job, u32)> {
    (0..n).map(f).collect()
}

#[tokio::test(start_paused = true)]
async fn replies_out_of_order_keep_their_request() {
    init_logging();
    let (stub, responder) = spawn_responder();

    // Later requests answer first; request 2 comes back with the wrong label.
    let dataset = jobs(10, |i| {
        let label = (i % 3) as u32;
        let answer = if i == 2 { label + 1 } else { label };
        let job = Job {
            index: i,
            delay: Duration::from_millis(10 - i as u64),
            answer: Some(answer),
        };
        (job, label)
    });

    let stats = Evaluation::new("out-of-order", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(10).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.total, 10);
    assert_eq!(stats.succeeded, 10);
    assert_eq!(stats.correct, 9);
    assert_eq!(stats.classification_error_rate, 0.1);
    assert_eq!(stats.request_error_rate, 0.);

    let latency = stats.latency.as_ref().unwrap();
    assert_eq!(latency.min, Duration::from_millis(1));
    assert_eq!(latency.max, Duration::from_millis(10));
    assert_eq!(stats.percentile(50), Some(Duration::from_micros(5_500)));
    assert_eq!(stats.elapsed, Duration::from_millis(10));

    assert_eq!(responder.answered.load(Ordering::SeqCst), 10);
    assert_eq!(responder.peak.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn responder_never_sees_more_than_the_limit() {
    init_logging();
    let (stub, responder) = spawn_responder();

    let dataset = jobs(30, |i| {
        let job = Job {
            index: i,
            delay: Duration::from_millis(1 + (i as u64 * 7) % 13),
            answer: Some(1),
        };
        (job, 1)
    });

    let stats = Evaluation::new("bounded", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(3).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.total, 30);
    assert_eq!(stats.correct, 30);
    assert_eq!(responder.peak.load(Ordering::SeqCst), 3);
    assert_eq!(responder.pending.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_replies_are_service_failures() {
    init_logging();
    let (stub, _responder) = spawn_responder();

    let dataset = jobs(8, |i| {
        let job = Job {
            index: i,
            delay: Duration::from_millis(2),
            answer: (i % 2 == 0).then_some(4),
        };
        (job, 4)
    });

    let stats = Evaluation::new("dropped", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(2).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.total, 8);
    assert_eq!(stats.succeeded, 4);
    assert_eq!(stats.failures.service, 4);
    assert_eq!(stats.request_error_rate, 0.5);
    assert_eq!(stats.classification_error_rate, 0.5);
}

#[tokio::test(start_paused = true)]
async fn unanswered_calls_time_out() {
    init_logging();
    let (stub, _responder) = spawn_responder();

    let dataset = jobs(4, |i| {
        let job = Job {
            index: i,
            delay: Duration::from_secs(if i == 3 { 60 } else { 1 }),
            answer: Some(0),
        };
        (job, 0)
    });

    let stats = Evaluation::new("timeouts", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(4).unwrap())
        .timeout(Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.failures.timeout, 1);
    assert_eq!(stats.elapsed, Duration::from_secs(5));
}

#[tokio::test]
async fn closed_channel_is_a_submission_failure() {
    init_logging();
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let stub = ChannelStub { tx };

    let dataset = jobs(5, |i| {
        let job = Job {
            index: i,
            delay: Duration::ZERO,
            answer: Some(0),
        };
        (job, 0)
    });

    let stats = Evaluation::new("closed", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(2).unwrap())
        .await
        .unwrap();

    assert_eq!(stats.total, 5);
    assert_eq!(stats.failures.submission, 5);
    assert_eq!(stats.request_error_rate, 1.);
    assert!(stats.latency.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(20_000)]
async fn random_latencies_on_a_threaded_runtime() {
    init_logging();
    let (stub, responder) = spawn_responder();

    let exp = Exp::new(1. / 3.).unwrap();
    let mut rng = rand::thread_rng();
    let dataset: Vec<_> = (0..200)
        .map(|i| {
            let millis: f64 = exp.sample(&mut rng);
            let job = Job {
                index: i,
                delay: Duration::from_micros((millis * 1_000.) as u64),
                answer: Some((i % 10) as u32),
            };
            (job, (i % 10) as u32)
        })
        .collect();

    let stats = Evaluation::new("threaded", stub, dataset.into_iter())
        .concurrency(NonZeroUsize::new(16).unwrap())
        .percentiles([50, 90, 99, 100])
        .await
        .unwrap();

    assert_eq!(stats.total, 200);
    assert_eq!(stats.correct, 200);
    assert!(responder.peak.load(Ordering::SeqCst) <= 16);

    let latency = stats.latency.as_ref().unwrap();
    assert_eq!(stats.percentile(100), Some(latency.max));
    assert!(stats.percentile(50) <= stats.percentile(90));
    assert!(stats.percentile(90) <= stats.percentile(99));
}
