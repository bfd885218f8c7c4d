//! Typed lifecycle events consumed by the synchronizers.
//!
//! # Event Flow
//!
//! 1. The relational side commits a change and publishes a notification
//! 2. The notification is turned into an [`IndexEvent`] (instance saves are
//!    re-read from the database so the event carries the current row)
//! 3. `IndexDispatcher` hands the event to every interested synchronizer
//!
//! Events are idempotent: replaying any of them converges the index to the
//! same state.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, IndexEventReceiver, IndexEventSender, index_event_channel,
};
pub use types::{EntityId, IndexEvent};
