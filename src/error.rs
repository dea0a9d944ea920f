use thiserror::Error;

use crate::config::ConfigError;
use crate::sender::TransportError;

/// Anything that stops the collector. Every variant is fatal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
