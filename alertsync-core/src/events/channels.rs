//! Event channel factory for feeding the dispatcher loop.

use super::types::IndexEvent;
use tokio::sync::mpsc;

/// Default buffer size for the event channel.
///
/// Senders wait when the dispatcher falls this far behind.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for IndexEvent events.
pub type IndexEventSender = mpsc::Sender<IndexEvent>;
/// Receiver handle for IndexEvent events.
pub type IndexEventReceiver = mpsc::Receiver<IndexEvent>;

/// Create a new IndexEvent channel.
///
/// Multiple senders can be cloned from the returned sender; the receiver goes
/// to a single dispatcher.
pub fn index_event_channel() -> (IndexEventSender, IndexEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
