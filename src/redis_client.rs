use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisResult, Value};
use tracing::debug;

use crate::config::{Address, Config, RedisTarget};

// ─── Gateway capability ──────────────────────────────────────────

/// The three things a collection cycle asks of Redis.
#[async_trait]
pub trait RedisGateway: Send {
    /// Raw `INFO` report.
    async fn info(&mut self) -> RedisResult<String>;

    /// `CONFIG SET <key> <value>`.
    async fn config_set(&mut self, key: &str, value: &str) -> RedisResult<()>;

    /// Runs an arbitrary command and returns the untyped reply.
    async fn execute(&mut self, cmd: &redis::Cmd) -> RedisResult<Value>;
}

/// Connection held for the duration of one cycle. Dropping it closes the
/// socket.
pub struct Gateway {
    conn: MultiplexedConnection,
}

#[async_trait]
impl RedisGateway for Gateway {
    async fn info(&mut self) -> RedisResult<String> {
        redis::cmd("INFO").query_async(&mut self.conn).await
    }

    async fn config_set(&mut self, key: &str, value: &str) -> RedisResult<()> {
        redis::cmd("CONFIG")
            .arg("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut self.conn)
            .await
    }

    async fn execute(&mut self, cmd: &redis::Cmd) -> RedisResult<Value> {
        cmd.query_async(&mut self.conn).await
    }
}

// ─── Connecting ──────────────────────────────────────────────────

/// Opens a fresh connection to the configured Redis, asking the
/// Sentinels for the current master when Sentinel mode is on.
pub async fn connect(config: &Config) -> RedisResult<Gateway> {
    let auth = RedisConnectionInfo {
        password: config.redis_password.clone(),
        ..Default::default()
    };

    let client = match &config.redis {
        RedisTarget::Standalone(addr) => {
            debug!(address = %addr, "connecting to redis");
            Client::open(connection_info(addr, auth))?
        }
        RedisTarget::Sentinel {
            sentinels,
            master_name,
        } => {
            debug!(master = %master_name, sentinels = sentinels.len(), "resolving master through sentinel");
            let nodes: Vec<ConnectionInfo> = sentinels
                .iter()
                .map(|addr| connection_info(addr, RedisConnectionInfo::default()))
                .collect();
            let mut sentinel = Sentinel::build(nodes)?;
            let node_info = SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(auth),
            };
            sentinel.async_master_for(master_name, Some(&node_info)).await?
        }
    };

    let conn = client.get_multiplexed_tokio_connection().await?;
    Ok(Gateway { conn })
}

fn connection_info(addr: &Address, redis: RedisConnectionInfo) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(addr.host.clone(), addr.port),
        redis,
    }
}
