use redis::{from_redis_value, RedisResult, Value};
use tracing::debug;

use crate::redis_client::RedisGateway;

const THRESHOLD_PARAMETER: &str = "latency-monitor-threshold";

/// An entry of `LATENCY LATEST` is `[event, latest, duration, max]`.
const FIELDS_PER_EVENT: usize = 4;

/// The most recent slow event reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySample {
    pub event: String,
    /// Unix timestamp (seconds) of the latest spike.
    pub occurred_at: i64,
    pub duration_ms: i64,
}

impl LatencySample {
    /// Reads the first entry of a `LATENCY LATEST` reply.
    ///
    /// `Ok(None)` when nothing has been recorded yet (or the entry is
    /// truncated); an error when the fields are there but are not numbers.
    pub fn from_reply(reply: &Value) -> RedisResult<Option<Self>> {
        let entry = match reply {
            Value::Bulk(entries) => match entries.first() {
                Some(Value::Bulk(fields)) if fields.len() >= FIELDS_PER_EVENT => fields,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(Self {
            event: from_redis_value(&entry[0])?,
            occurred_at: from_redis_value(&entry[1])?,
            duration_ms: from_redis_value(&entry[2])?,
        }))
    }
}

/// Turns the server's "last slow event" into a per-cycle signal.
///
/// A spike older than one polling period was already reported (or happened
/// before we started), so this cycle reports 0.
pub fn latency_for_cycle(sample: Option<&LatencySample>, now: i64, ping_frequency: u64) -> i64 {
    match sample {
        None => 0,
        Some(sample) => {
            let elapsed = now.saturating_sub(sample.occurred_at);
            if elapsed > i64::try_from(ping_frequency).unwrap_or(i64::MAX) {
                0
            } else {
                sample.duration_ms
            }
        }
    }
}

/// Probes the server for a latency reading.
///
/// Returns `None` when no threshold is configured, in which case the server
/// is not touched at all.
pub async fn measure<G>(
    gateway: &mut G,
    threshold: Option<&str>,
    ping_frequency: u64,
) -> RedisResult<Option<i64>>
where
    G: RedisGateway + ?Sized,
{
    let Some(threshold) = threshold else {
        return Ok(None);
    };

    gateway.config_set(THRESHOLD_PARAMETER, threshold).await?;

    debug!("starting latency probe");
    let mut latest = redis::cmd("LATENCY");
    latest.arg("LATEST");
    let reply = gateway.execute(&latest).await?;
    let sample = LatencySample::from_reply(&reply)?;
    let latency = latency_for_cycle(sample.as_ref(), chrono::Utc::now().timestamp(), ping_frequency);
    debug!(
        latency,
        event = sample.as_ref().map(|s| s.event.as_str()).unwrap_or("none"),
        "ending latency probe"
    );

    Ok(Some(latency))
}
