//! Periodically reads `INFO` (and, optionally, the latest latency spike)
//! from Redis or a Sentinel-managed master, and ships the watched fields to
//! Logstash as one flat JSON document per cycle.
//!
//! Configured entirely through environment variables (a `.env` file is
//! honoured); see `config.rs` for the list.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod collector;
mod config;
mod error;
mod metrics;
mod redis_client;
mod sender;
#[cfg(test)]
mod testing;

use collector::Collector;
use config::Config;
use sender::LogstashSender;

#[tokio::main]
async fn main() {
    // ── 1. Environment & logging ─────────────────────────────────
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redis_healthy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    // ── 2. Resolve configuration ─────────────────────────────────
    let config = Config::from_env().unwrap_or_else(|err| {
        error!(%err, "invalid configuration");
        std::process::exit(1);
    });

    info!(
        sentinel = config.is_sentinel(),
        logstash = %config.logstash,
        protocol = %config.logstash_protocol,
        every_secs = config.ping_frequency,
        watched = config.metrics_to_watch.len(),
        latency = config.latency_threshold.is_some(),
        project = %config.project,
        "configuration loaded"
    );

    // ── 3. Build the collector ───────────────────────────────────
    let sender = LogstashSender::from_config(&config);
    let collector = Collector::new(config, sender).unwrap_or_else(|err| {
        error!(%err, "cannot start collector");
        std::process::exit(1);
    });

    // ── 4. Run until Ctrl-C or the first failure ─────────────────
    if let Err(err) = collector.run().await {
        error!(%err, "collection cycle failed");
        std::process::exit(1);
    }

    info!("finished");
}
