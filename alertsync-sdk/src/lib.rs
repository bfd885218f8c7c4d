//! Read contract between the alert index synchronizer and the evaluation runtime.
//!
//! Everything the runtime needs to locate and decode a projection lives here:
//! the key schema in [`keys`] and the payload types in [`objects`].

pub mod keys;
pub mod objects;

pub use keys::KeySpace;
