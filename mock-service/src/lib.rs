use axum::{
    debug_handler,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Number of classes in every score vector the service returns.
pub const NUM_CLASSES: usize = 10;

pub mod prelude {
    pub use crate::{ClassifyBody, MockInput, ScoresBody, NUM_CLASSES};
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyBody {
    pub input: MockInput,
}

/// Request payload understood by the mock classifier.
///
/// `label` forces the prediction; without it the prediction is the brightest pixel. `delay_ms`
/// holds the reply back and `fail` answers with a 500.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockInput {
    #[serde(default)]
    pub pixels: Vec<f32>,
    #[serde(default)]
    pub label: Option<usize>,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub fail: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresBody {
    pub scores: Vec<f32>,
}

pub fn router() -> Router {
    Router::new()
        .route("/classify", post(classify))
        .route("/delay/ms/:delay_ms", get(delay))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    serve(listener).await
}

pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    info!("Mock classifier listening on {}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}

#[debug_handler]
pub async fn classify(Json(body): Json<ClassifyBody>) -> Result<Json<ScoresBody>, StatusCode> {
    counter!("mock-service.classify").increment(1);
    let input = body.input;

    if input.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(input.delay_ms)).await;
    }

    if input.fail {
        debug!("Failing request on demand");
        counter!("mock-service.classify.error").increment(1);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let predicted = input
        .label
        .unwrap_or_else(|| brightest(&input.pixels))
        .min(NUM_CLASSES - 1);

    let mut scores = vec![0.; NUM_CLASSES];
    scores[predicted] = 1.;
    Ok(Json(ScoresBody { scores }))
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) {
    counter!("mock-service.delay").increment(1);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

fn brightest(pixels: &[f32]) -> usize {
    pixels
        .iter()
        .enumerate()
        .fold((0, f32::MIN), |(best, max), (i, p)| {
            if *p > max {
                (i, *p)
            } else {
                (best, max)
            }
        })
        .0
}
