use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, DEFAULT_PING_FREQUENCY, MAX_PING_FREQUENCY};
use crate::error::Error;
use crate::metrics::{latency, InfoParser, MetricSet, LATENCY_KEY};
use crate::redis_client::{self, RedisGateway};
use crate::sender::Sender;

/// Drives the collection cycles.
///
/// Owns everything a cycle needs; nothing else is carried from one cycle to
/// the next.
pub struct Collector<S> {
    config: Config,
    parser: InfoParser,
    sender: S,
}

impl<S: Sender> Collector<S> {
    pub fn new(config: Config, sender: S) -> Result<Self, Error> {
        // names are escaped, so this only fails on absurd sizes
        let parser = InfoParser::new(&config.metrics_to_watch)
            .map_err(|err| ConfigError::MetricsPattern(err.to_string()))?;

        Ok(Self {
            config,
            parser,
            sender,
        })
    }

    // ─── One cycle ───────────────────────────────────────────────

    /// INFO → watched fields → optional latency probe.
    pub async fn collect<G>(&self, gateway: &mut G) -> Result<MetricSet, Error>
    where
        G: RedisGateway + ?Sized,
    {
        let info = gateway.info().await?;
        let mut metrics = self.parser.parse(&info);
        if metrics.is_empty() {
            warn!("none of the watched fields were found in INFO");
        }

        let threshold = self.config.latency_threshold.as_deref();
        if let Some(latency) =
            latency::measure(gateway, threshold, self.config.ping_frequency).await?
        {
            metrics.insert_int(LATENCY_KEY, latency);
        }

        Ok(metrics)
    }

    /// A full cycle: connect, collect, dispatch. The connection is dropped
    /// when this returns, whatever the outcome.
    pub async fn tick(&self) -> Result<usize, Error> {
        let mut gateway = redis_client::connect(&self.config).await?;
        self.dispatch(&mut gateway).await
    }

    async fn dispatch<G>(&self, gateway: &mut G) -> Result<usize, Error>
    where
        G: RedisGateway + ?Sized,
    {
        let metrics = self.collect(gateway).await?;
        debug!(fields = metrics.len(), "collected metrics");
        Ok(self.sender.send(metrics).await?)
    }

    // ─── Scheduler ───────────────────────────────────────────────

    /// Runs a cycle every `ping_frequency` seconds until Ctrl-C or the first
    /// error.
    pub async fn run(self) -> Result<(), Error> {
        schedule(cycle_period(self.config.ping_frequency), || self.tick()).await
    }
}

fn cycle_period(ping_frequency: u64) -> Duration {
    Duration::from_secs(ping_frequency.clamp(1, MAX_PING_FREQUENCY))
}

/// Awaits `cycle` once per `period`, the first time one period from now.
///
/// Each cycle is awaited before the next tick is taken, so cycles never
/// overlap; ticks missed by a slow cycle are pushed back, not bunched.
async fn schedule<F, Fut>(period: Duration, mut cycle: F) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize, Error>>,
{
    let now = Instant::now();
    let (start, period) = match now.checked_add(period) {
        Some(start) => (start, period),
        None => {
            let fallback = Duration::from_secs(DEFAULT_PING_FREQUENCY);
            warn!(?period, ?fallback, "polling period out of range");
            (now + fallback, fallback)
        }
    };
    let mut interval = interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(every_secs = period.as_secs(), "collector running");

    loop {
        tokio::select! {
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }
                cycle().await?;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
