//! Application state shared across all request handlers.

use crate::config::runtime::AdminConfig;
use alertsync_core::framework::DatabaseProcessor;
use alertsync_core::index::SharedIndexStore;
use alertsync_core::processors::IndexDispatcher;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub index: SharedIndexStore,
    /// The same dispatcher the event loop runs; admin resyncs go through it.
    pub dispatcher: Arc<IndexDispatcher<DatabaseProcessor>>,
    /// Replaced on SIGHUP.
    pub admin: Arc<RwLock<AdminConfig>>,
    pub resync_batch_size: i64,
}
