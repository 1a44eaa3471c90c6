//! Transport capability traits.
//!
//! An extension does not own a transport. It consumes the connected-peer
//! abstraction the replication layer already provides: a tagged
//! extension-message channel per peer, handshake-negotiated capability
//! flags, and feed-level peer lifecycle events. Implementations of these
//! traits live with the transport; this crate only defines the contract.

use std::sync::Arc;

use crate::id::{FeedKey, PeerId};

/// Handle for one event subscription, issued by [`FeedPeers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// One side of a live peer connection on a feed's replication channel.
pub trait PeerChannel {
    /// Stable identity of the remote peer.
    fn remote_id(&self) -> PeerId;

    /// Whether the remote side negotiated support for the named
    /// extension during handshake.
    fn remote_supports(&self, extension: &str) -> bool;

    /// Send an extension message to this peer.
    ///
    /// Fire-and-forget: returns immediately, no acknowledgment, no
    /// backpressure. Delivery is best-effort by the transport.
    fn send_extension(&self, extension: &str, payload: &[u8]);
}

/// Feed-level view of the replication transport: the currently connected
/// peer set and its lifecycle events.
pub trait FeedPeers {
    type Channel: PeerChannel + Clone + Send + Sync + 'static;

    /// The feed's stable key.
    fn feed_key(&self) -> FeedKey;

    /// Peers currently connected on this feed.
    fn connected_peers(&self) -> Vec<Self::Channel>;

    /// Start delivering peer events to `subscriber`.
    ///
    /// Callbacks are serialized on the transport's event loop; no two
    /// run concurrently for the same subscriber.
    fn subscribe(&self, subscriber: Arc<dyn PeerSubscriber<Self::Channel>>) -> SubscriptionId;

    /// Stop delivery for a prior subscription.
    ///
    /// Once this returns, the subscriber receives no further callbacks,
    /// including events that were already in flight when it was called.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Callbacks a feed delivers to a subscriber.
pub trait PeerSubscriber<C>: Send + Sync {
    /// A peer connected to the feed.
    fn on_peer_added(&self, peer: &C);

    /// A peer disconnected from the feed.
    fn on_peer_removed(&self, peer: &C);

    /// An extension message arrived from a connected peer.
    ///
    /// `extension` is the tag the sender put on the message; multiple
    /// extensions share one channel, so subscribers must filter by tag.
    /// Payload bytes are opaque to the transport.
    fn on_extension(&self, peer: &C, extension: &str, payload: &[u8]);
}
