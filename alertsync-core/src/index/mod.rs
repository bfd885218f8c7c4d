//! Index store client.
//!
//! The index store is a key-value store with plain values and set values.
//! Every operation touches exactly one key; callers must not assume any
//! atomicity across keys. The client never retries: a failed or timed-out
//! command is reported to the caller as an [`IndexError`].

mod memory_store;
mod redis_store;

pub use memory_store::MemoryIndexStore;
pub use redis_store::RedisIndexStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by index store operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The store could not be reached or the connection dropped.
    #[error("index store connection error: {0}")]
    Connection(String),

    /// The command did not complete within the configured bound.
    #[error("index store command {op} on `{key}` timed out after {timeout:?}")]
    Timeout {
        op: &'static str,
        key: String,
        timeout: Duration,
    },

    /// The store rejected the command.
    #[error("index store command {op} on `{key}` failed: {message}")]
    Command {
        op: &'static str,
        key: String,
        message: String,
    },
}

/// Single-key operations over the index store.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), IndexError>;

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), IndexError>;

    /// Remove a member. Removing an absent member is not an error.
    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), IndexError>;

    async fn members(&self, key: &str) -> Result<Vec<String>, IndexError>;

    async fn ping(&self) -> Result<(), IndexError>;
}

/// Process-wide handle shared by every synchronizer.
pub type SharedIndexStore = Arc<dyn IndexStore>;
