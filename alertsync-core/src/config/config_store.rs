//! Reloadable configuration with change notification.
//!
//! `ConfigStore<T>` publishes immutable snapshots through a `watch` channel.
//! Readers take a cheap `Arc` snapshot without locking across awaits, and
//! long-running loops hold a [`ConfigWatcher`] to react when a new snapshot
//! is published (e.g. after SIGHUP).

use std::sync::Arc;
use tokio::sync::watch;

/// Shared, replaceable configuration snapshot.
pub struct ConfigStore<T> {
    tx: Arc<watch::Sender<Arc<T>>>,
}

/// Receives the new snapshot each time the [`ConfigStore`] is updated.
pub struct ConfigWatcher<T> {
    rx: watch::Receiver<Arc<T>>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new snapshot. Succeeds even when nobody is watching.
    pub fn update(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    /// The snapshot in effect right now.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> ConfigWatcher<T> {
        ConfigWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> ConfigWatcher<T> {
    /// Wait for the next published snapshot.
    ///
    /// Returns `Err` once every [`ConfigStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<Arc<T>, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(Arc::clone(&self.rx.borrow_and_update()))
    }
}
