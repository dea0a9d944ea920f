use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ─── Defaults ────────────────────────────────────────────────────

/// INFO fields shipped when `REDIS_METRICS_TO_WATCH` is not set.
pub const DEFAULT_METRICS_TO_WATCH: &[&str] = &[
    "client_longest_output_list",
    "connected_clients",
    "blocked_clients",
    "rejected_connections",
    "instantaneous_input_kbps",
    "instantaneous_output_kbps",
    "instantaneous_ops_per_sec",
    "keyspace_hits",
    "keyspace_misses",
    "mem_fragmentation_ratio",
    "sync_full",
    "sync_partial_ok",
    "sync_partial_err",
];

/// Seconds between two collection cycles.
pub const DEFAULT_PING_FREQUENCY: u64 = 10;
/// Longest accepted polling period (one day).
pub const MAX_PING_FREQUENCY: u64 = 86_400;

const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_SENTINEL_PORT: u16 = 26379;

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("you must provide the env {0}")]
    Missing(&'static str),

    #[error("sentinel requires master name (set REDIS_MASTER_NAME)")]
    SentinelWithoutMaster,

    #[error("LOGSTASH_PORT {0:?} is not a valid port")]
    InvalidPort(String),

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("unsupported LOGSTASH_PROTOCOL {0:?}, expected \"udp\" or \"tcp\"")]
    UnsupportedProtocol(String),

    #[error("REDIS_METRICS_TO_WATCH cannot be matched: {0}")]
    MetricsPattern(String),
}

// ─── Typed pieces ────────────────────────────────────────────────

/// A `host:port` pair, with the port already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    /// Accepts `host`, `host:port` and `[v6]:port`. A missing port falls
    /// back to `default_port`.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, ConfigError> {
        let raw = input.trim();
        let invalid = || ConfigError::InvalidAddress(input.to_string());

        let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => default_port,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)?,
            };
            (host, port)
        } else {
            match raw.rsplit_once(':') {
                // a bare IPv6 address has more than one colon and no port
                Some((host, port)) if !host.contains(':') => {
                    (host, port.parse().map_err(|_| invalid())?)
                }
                _ => (raw, default_port),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// How the Redis server is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisTarget {
    Standalone(Address),
    Sentinel {
        sentinels: Vec<Address>,
        master_name: String,
    },
}

/// Transport used to reach Logstash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    #[default]
    Udp,
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(ConfigError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────

/// Everything the collector needs, resolved once at startup and read-only
/// afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub redis: RedisTarget,
    pub redis_password: Option<String>,

    /// Passed verbatim to `CONFIG SET latency-monitor-threshold`.
    /// `None` disables latency measurement entirely.
    pub latency_threshold: Option<String>,

    /// INFO fields to ship, in declaration order, never empty.
    pub metrics_to_watch: Vec<String>,

    /// Seconds between cycles, also the latency staleness window.
    pub ping_frequency: u64,

    pub logstash: Address,
    pub logstash_protocol: Protocol,

    /// Namespace used for the `client` label, e.g. `acme` → `acme-redis`.
    pub project: String,
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any string-keyed source. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let redis_host = required("REDIS_HOST")?;
        let logstash_host = required("LOGSTASH_HOST")?;
        let logstash_port = required("LOGSTASH_PORT")?;
        let project = required("PROJECT")?;

        let logstash_protocol = match get("LOGSTASH_PROTOCOL") {
            Some(p) => p.trim().parse()?,
            None => Protocol::default(),
        };

        let master_name = get("REDIS_MASTER_NAME");
        // any non-empty value, blanks included, turns Sentinel mode on
        let sentinel = lookup("REDIS_SENTINEL").filter(|v| !v.is_empty());
        let redis = match sentinel {
            Some(_) => {
                let master_name = master_name.ok_or(ConfigError::SentinelWithoutMaster)?;
                let sentinels = redis_host
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| Address::parse(s, DEFAULT_SENTINEL_PORT))
                    .collect::<Result<Vec<_>, _>>()?;
                if sentinels.is_empty() {
                    return Err(ConfigError::InvalidAddress(redis_host));
                }
                RedisTarget::Sentinel {
                    sentinels,
                    master_name,
                }
            }
            None => RedisTarget::Standalone(Address::parse(&redis_host, DEFAULT_REDIS_PORT)?),
        };

        let port = logstash_port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::InvalidPort(logstash_port.clone()))?;
        let logstash = Address {
            host: logstash_host.trim().to_string(),
            port,
        };

        Ok(Self {
            redis,
            redis_password: get("REDIS_PWD"),
            latency_threshold: get("REDIS_LATENCY_THRESHOLD").map(|t| t.trim().to_string()),
            metrics_to_watch: metrics_to_watch(get("REDIS_METRICS_TO_WATCH").as_deref()),
            ping_frequency: ping_frequency(get("PING_FREQUENCY").as_deref()),
            logstash,
            logstash_protocol,
            project,
        })
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.redis, RedisTarget::Sentinel { .. })
    }
}

// Keeps REDIS_PWD out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("redis", &self.redis)
            .field("redis_password", &self.redis_password.as_ref().map(|_| "***"))
            .field("latency_threshold", &self.latency_threshold)
            .field("metrics_to_watch", &self.metrics_to_watch)
            .field("ping_frequency", &self.ping_frequency)
            .field("logstash", &self.logstash)
            .field("logstash_protocol", &self.logstash_protocol)
            .field("project", &self.project)
            .finish()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn metrics_to_watch(raw: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    if names.is_empty() {
        DEFAULT_METRICS_TO_WATCH.iter().map(|s| s.to_string()).collect()
    } else {
        names
    }
}

fn ping_frequency(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| (1..=MAX_PING_FREQUENCY).contains(secs))
        .unwrap_or(DEFAULT_PING_FREQUENCY)
}
