//! stream-bench - throughput load test for stream-processing clusters

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use stream_bench::cli::Cli;
use stream_bench::client::{ClusterClient, ControllerClient, LocalCluster};
use stream_bench::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Cli::parse().into_config();
    config.validate()?;

    let client: Arc<dyn ClusterClient> = if config.local {
        tracing::info!("running against the in-process simulated cluster");
        Arc::new(LocalCluster::new(4 * config.workers))
    } else {
        // validate() guarantees the URL is present in remote mode
        let url = config.controller_url.clone().unwrap_or_default();
        tracing::info!(controller = %url, "connecting to cluster controller");
        Arc::new(ControllerClient::new(url))
    };

    let mut session = Session::new(client, config);
    let outcome = session.run_with_signal_handling().await?;

    tracing::info!(
        polls = outcome.polls,
        mean_throughput = outcome.mean_throughput,
        "session complete"
    );
    Ok(())
}
