//! Scripted stand-ins for Redis and Logstash used by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redis::{Arg, ErrorKind, RedisError, RedisResult, Value};

use crate::metrics::MetricSet;
use crate::redis_client::RedisGateway;
use crate::sender::{Sender, TransportError};

/// One `LATENCY LATEST` entry: `[event, latest, duration, max]`.
pub fn latency_reply(event: &str, occurred_at: i64, duration_ms: i64) -> Value {
    Value::Bulk(vec![
        Value::Data(event.as_bytes().to_vec()),
        Value::Int(occurred_at),
        Value::Int(duration_ms),
        Value::Int(duration_ms),
    ])
}

pub struct MockGateway {
    info: String,
    latency: Value,
    fail_info: bool,
    fail_config_set: bool,

    pub config_sets: Vec<(String, String)>,
    pub executed: Vec<String>,
}

impl MockGateway {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
            latency: Value::Bulk(vec![]),
            fail_info: false,
            fail_config_set: false,
            config_sets: Vec::new(),
            executed: Vec::new(),
        }
    }

    pub fn with_latency(mut self, reply: Value) -> Self {
        self.latency = reply;
        self
    }

    pub fn failing_info(mut self) -> Self {
        self.fail_info = true;
        self
    }

    pub fn failing_config_set(mut self) -> Self {
        self.fail_config_set = true;
        self
    }
}

#[async_trait]
impl RedisGateway for MockGateway {
    async fn info(&mut self) -> RedisResult<String> {
        if self.fail_info {
            return Err(RedisError::from((ErrorKind::IoError, "connection reset")));
        }
        Ok(self.info.clone())
    }

    async fn config_set(&mut self, key: &str, value: &str) -> RedisResult<()> {
        if self.fail_config_set {
            return Err(RedisError::from((
                ErrorKind::ResponseError,
                "ERR Unsupported CONFIG parameter",
            )));
        }
        self.config_sets.push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn execute(&mut self, cmd: &redis::Cmd) -> RedisResult<Value> {
        let line = cmd
            .args_iter()
            .filter_map(|arg| match arg {
                Arg::Simple(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                Arg::Cursor => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.executed.push(line);
        Ok(self.latency.clone())
    }
}

/// Keeps every set it is asked to send.
#[derive(Clone, Default)]
pub struct CapturingSender {
    pub sent: Arc<Mutex<Vec<MetricSet>>>,
}

#[async_trait]
impl Sender for CapturingSender {
    async fn send(&self, metrics: MetricSet) -> Result<usize, TransportError> {
        let len = serde_json::to_vec(&metrics)?.len();
        self.sent.lock().unwrap().push(metrics);
        Ok(len)
    }
}
