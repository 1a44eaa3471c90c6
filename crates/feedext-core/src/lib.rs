//! feedext-core — shared vocabulary for feed extension messaging.
//!
//! Defines the identifiers and transport capability traits that feed
//! extensions are written against. The replication transport itself
//! lives elsewhere; extension crates only consume the abstractions
//! defined here.

pub mod id;
pub mod peer;

pub use id::{FeedKey, PeerId};
pub use peer::{FeedPeers, PeerChannel, PeerSubscriber, SubscriptionId};
