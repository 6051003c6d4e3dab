use anyhow::Context;
use clap::Parser;
use gauntlet::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

mod cli;
mod dataset;

use cli::GauntletCli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gauntlet=info".into()),
        )
        .init();

    let cli = GauntletCli::parse();
    let config = cli.eval_config()?;
    let num_tests = config.requests.unwrap_or_default();

    let samples = match &cli.dataset {
        Some(path) => dataset::load(path, num_tests)?,
        None => dataset::synthetic(num_tests, &mut SmallRng::from_entropy()),
    };
    info!("Loaded {} test inputs", samples.len());

    let base = cli.base_url();
    let stub = HttpStub::<serde_json::Value>::new(&base)
        .with_context(|| format!("invalid server address {base}"))?;

    let stats = Evaluation::with_config(stub, samples.into_iter(), config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{stats}");
    }
    Ok(())
}
