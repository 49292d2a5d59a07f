//! HostMetrics Agent - publishes this host's OS metrics to an MQTT broker
//!
//! Startup: configuration from the environment, host ID from the network
//! interfaces, then one broker session (`<host_id>_pub`) that lives until
//! the process exits. Any startup failure or metric read failure ends the
//! process with a non-zero status.

use anyhow::{Context, Result};
use hostmetrics_agent::broker;
use hostmetrics_agent::metrics::system::SystemStats;
use hostmetrics_agent::{HostId, MetricPublisher, MetricSampler, PublisherConfig, SampleLoop, SystemClock, Topics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hostmetrics_agent=info")),
        )
        .init();

    info!("📡 HostMetrics Agent v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = PublisherConfig::from_env().context("Invalid configuration")?;

    let host_id = HostId::resolve().context("Error reading MAC address")?;

    let client = broker::connect(&host_id.client_id("pub"), &config.broker)
        .await
        .context("Error connecting to MQTT Broker")?;

    let mut sample_loop = SampleLoop::new(
        MetricSampler::new(SystemStats::new()),
        MetricPublisher::new(client, Topics::new(&host_id)),
        SystemClock,
        config.sampling,
    );

    sample_loop.run().await.context("Sampling stopped")?;
    Ok(())
}
