pub mod file;

pub use file::FileWaitQueue;

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum WaitQueueError {
    #[error("wait queue io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("wait queue json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported wait queue key pattern `{0}`")]
    UnsupportedPattern(String),
}

// Key/value store with per-key TTL, the engine's only durable
// synchronization mechanism.
pub trait WaitQueue {
    fn set(&self, key: &str, value: &Value, ttl_seconds: Option<u64>)
        -> Result<(), WaitQueueError>;
    fn get(&self, key: &str) -> Result<Option<Value>, WaitQueueError>;
    fn del(&self, key: &str) -> Result<bool, WaitQueueError>;
    fn lpush(&self, list_key: &str, value: &Value) -> Result<(), WaitQueueError>;
    fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, WaitQueueError>;
    // Only literal keys and trailing-`*` prefix patterns are supported.
    fn keys(&self, pattern: &str) -> Result<Vec<String>, WaitQueueError>;
}
