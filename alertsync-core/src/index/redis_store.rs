use super::{IndexError, IndexStore};
use crate::config::IndexStoreConfig;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed index store.
///
/// Holds a single multiplexed [`ConnectionManager`] which reconnects on its
/// own after a dropped connection. Clones share the same connection.
#[derive(Clone)]
pub struct RedisIndexStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisIndexStore {
    /// Open the process-wide connection.
    pub async fn connect(config: &IndexStoreConfig) -> Result<Self, IndexError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                IndexError::Connection(format!(
                    "connect timed out after {:?}",
                    config.connect_timeout
                ))
            })?
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        info!(op_timeout = ?config.op_timeout, "Index store connection established");

        Ok(Self {
            conn,
            op_timeout: config.op_timeout,
        })
    }

    /// Release the connection.
    pub fn close(self) {
        drop(self.conn);
        info!("Index store connection closed");
    }

    async fn bounded<T, F>(&self, op: &'static str, key: &str, fut: F) -> Result<T, IndexError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| classify(op, key, e)),
            Err(_) => {
                debug!(op, key, "Index store command timed out");
                Err(IndexError::Timeout {
                    op,
                    key: key.to_owned(),
                    timeout: self.op_timeout,
                })
            }
        }
    }
}

fn classify(op: &'static str, key: &str, e: RedisError) -> IndexError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        IndexError::Connection(e.to_string())
    } else {
        IndexError::Command {
            op,
            key: key.to_owned(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl IndexStore for RedisIndexStore {
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("SET", key, conn.set::<_, _, ()>(key, value))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("GET", key, conn.get::<_, Option<Vec<u8>>>(key))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("DEL", key, conn.del::<_, ()>(key)).await
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("SADD", key, conn.sadd::<_, _, ()>(key, member))
            .await
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("SREM", key, conn.srem::<_, _, ()>(key, member))
            .await
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("SMEMBERS", key, conn.smembers::<_, Vec<String>>(key))
            .await
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        self.bounded("PING", "", async {
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<(), RedisError>(())
        })
        .await
    }
}
