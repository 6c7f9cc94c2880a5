pub mod memory;
pub mod upstash;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryStore;
pub use upstash::{UpstashConfig, UpstashStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store request timed out")]
    Timeout,
    #[error("store returned http status {0}")]
    Status(u16),
    #[error("store rejected command: {0}")]
    Command(String),
    #[error("unexpected store reply: {0}")]
    Malformed(String),
}

/// The three commands the service needs from a Redis-like key-value store.
///
/// Values come back as JSON because some backends hand out already-decoded
/// objects while others return the raw string that was stored.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Keys matching a glob pattern, in whatever order the backend yields them.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn incr(&self, key: &str) -> Result<i64, StoreError>;
}

pub fn name_key(name: &str) -> String {
    format!("name:{name}")
}

pub fn script_key(id: &str) -> String {
    format!("script:{id}")
}

pub const SCRIPT_KEY_PATTERN: &str = "script:*";

pub fn access_key(id: &str, day: &str) -> String {
    format!("access:{id}:{day}")
}
