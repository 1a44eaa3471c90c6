//! feedext-session — session-data extension messaging for replicated feeds.
//!
//! Lets each side of a replicated-feed connection advertise an opaque,
//! size-bounded blob of "session data" and be notified when remote peers
//! update theirs. Sits above the replication transport (which provides
//! peer lifecycle events and a tagged extension-message channel, see
//! `feedext-core`) and below application code that wants out-of-band
//! presence or metadata per connected feed.
//!
//! The public entry point is [`SessionDataExt`]: watch a feed, set your
//! local blob, read what peers sent, and subscribe to the notification
//! stream. All state is in-memory and dies with the process.
//!
//! Session data is capped at [`MAX_SESSION_DATA`] bytes. A local set
//! over the cap fails with [`SessionDataTooLarge`]; an oversize payload
//! *received* from a peer is truncated to the cap and stored without
//! error. The asymmetry is part of the wire contract.

pub mod error;
pub mod events;
pub mod registry;
pub mod store;
pub mod watcher;


pub use error::SessionDataTooLarge;
pub use events::SessionDataEvent;
pub use registry::SessionDataExt;
pub use store::SessionStore;
pub use watcher::FeedWatcher;

/// Extension name negotiated during handshake and used to tag every
/// message this crate sends or accepts.
pub const SESSION_DATA_EXTENSION: &str = "session-data";

/// Maximum stored session-data payload in bytes, local or remote.
pub const MAX_SESSION_DATA: usize = 256;
