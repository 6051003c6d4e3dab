use anyhow::{bail, Context};
use clap::Parser;
use gauntlet::EvalConfig;
use std::fs::File;
use std::io::BufReader;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

pub const MAX_NUM_TESTS: usize = 10_000;
const DEFAULT_NUM_TESTS: usize = 100;

/// Evaluate a remote classification service with bounded concurrency.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct GauntletCli {
    /// Classification service as host:port, or a full base URL.
    #[arg(short, long)]
    pub server: String,

    /// Labeled test set, one `{"input": ..., "label": N}` object per line.
    #[arg(short, long, required_unless_present = "synthetic")]
    pub dataset: Option<PathBuf>,

    /// Generate random inputs instead of reading a dataset (for the mock service).
    #[arg(long, conflicts_with = "dataset")]
    pub synthetic: bool,

    /// Number of test inputs to send.
    #[arg(short, long)]
    pub num_tests: Option<usize>,

    /// Maximum number of concurrent requests.
    #[arg(short, long)]
    pub concurrency: Option<NonZeroUsize>,

    /// Per-request timeout, e.g. `5s` or `250ms`.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Cap on submitted requests per second.
    #[arg(long)]
    pub max_rps: Option<NonZeroU32>,

    /// Comma separated latency percentiles to report.
    #[arg(short, long, value_delimiter = ',')]
    pub percentiles: Option<Vec<u8>>,

    /// JSON evaluation config. Flags take precedence over its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the statistics as JSON.
    #[arg(long)]
    pub json: bool,
}

impl GauntletCli {
    pub fn base_url(&self) -> String {
        if self.server.contains("://") {
            self.server.clone()
        } else {
            format!("http://{}/", self.server)
        }
    }

    /// Evaluation settings from the config file (if any) with flags layered on top.
    pub fn eval_config(&self) -> anyhow::Result<EvalConfig> {
        let base = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening config {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => EvalConfig::new("gauntlet"),
        };
        self.apply(base)
    }

    fn apply(&self, mut config: EvalConfig) -> anyhow::Result<EvalConfig> {
        let requests = self
            .num_tests
            .or(config.requests)
            .unwrap_or(DEFAULT_NUM_TESTS);
        if requests > MAX_NUM_TESTS {
            bail!("num_tests should not be greater than {MAX_NUM_TESTS}");
        }
        config.requests = Some(requests);

        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(max_rps) = self.max_rps {
            config.max_rps = Some(max_rps);
        }
        if let Some(percentiles) = &self.percentiles {
            config.percentiles = percentiles.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
