use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(version, about = "Mock classification service")]
struct Cli {
    #[arg(short, long, default_value = "0.0.0.0:9000")]
    addr: SocketAddr,

    /// Expose Prometheus metrics on this address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_service=debug,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
    }

    mock_service::run(cli.addr).await
}
