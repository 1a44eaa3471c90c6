//! Feed watcher — binds a session store to one feed's peer lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use feedext_core::{FeedKey, FeedPeers, PeerChannel, PeerId, PeerSubscriber, SubscriptionId};

use crate::error::SessionDataTooLarge;
use crate::events::{EventHub, SessionDataEvent};
use crate::store::SessionStore;
use crate::SESSION_DATA_EXTENSION;

/// Tracks one watched feed: subscribes to its peer events, maintains the
/// session store, and owns the broadcast/unicast send paths.
///
/// Created and destroyed exclusively by
/// [`SessionDataExt`](crate::registry::SessionDataExt).
pub struct FeedWatcher<F: FeedPeers> {
    key: FeedKey,
    feed: F,
    store: SessionStore,
    events: EventHub,
    subscription: Mutex<Option<SubscriptionId>>,
    /// Cleared before the transport unsubscribe so an event already in
    /// flight cannot mutate the store.
    active: AtomicBool,
}

impl<F> FeedWatcher<F>
where
    F: FeedPeers + Send + Sync + 'static,
{
    pub(crate) fn new(feed: F, events: EventHub) -> Self {
        Self {
            key: feed.feed_key(),
            feed,
            store: SessionStore::new(),
            events,
            subscription: Mutex::new(None),
            active: AtomicBool::new(false),
        }
    }

    /// Subscribe to the feed's peer events. Idempotent: a second call
    /// while already listening is a no-op.
    pub fn listen(self: &Arc<Self>) {
        let mut subscription = self.subscription.lock().unwrap();
        if subscription.is_some() {
            return;
        }
        self.active.store(true, Ordering::SeqCst);
        let subscriber = Arc::clone(self) as Arc<dyn PeerSubscriber<F::Channel>>;
        *subscription = Some(self.feed.subscribe(subscriber));
        tracing::debug!(feed = %self.key.short_hex(), "listening for peer events");
    }

    /// Unsubscribe from the feed. After this returns, no peer event
    /// mutates the store; already-stored data remains readable.
    pub fn unlisten(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(id) = self.subscription.lock().unwrap().take() {
            self.feed.unsubscribe(id);
            tracing::debug!(feed = %self.key.short_hex(), "stopped listening for peer events");
        }
    }

    pub fn feed_key(&self) -> &FeedKey {
        &self.key
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Set the local session data without broadcasting it.
    pub fn set_local<T: AsRef<[u8]>>(&self, data: Option<T>) -> Result<(), SessionDataTooLarge> {
        self.store.set_local(data)
    }

    /// Send the current local blob (empty if never set) to every
    /// connected peer that negotiated the extension. Peers without
    /// support are skipped silently.
    pub fn broadcast_local(&self) {
        let blob = self.store.local().unwrap_or_else(Bytes::new);
        let mut sent = 0usize;
        for peer in self.feed.connected_peers() {
            if !peer.remote_supports(SESSION_DATA_EXTENSION) {
                tracing::trace!(
                    feed = %self.key.short_hex(),
                    peer = %peer.remote_id().short_hex(),
                    "peer did not negotiate session-data, skipping"
                );
                continue;
            }
            peer.send_extension(SESSION_DATA_EXTENSION, &blob);
            sent += 1;
        }
        tracing::trace!(
            feed = %self.key.short_hex(),
            peers = sent,
            len = blob.len(),
            "broadcast local session data"
        );
    }

    /// Send the current local blob to a single peer. No-op when the peer
    /// is not connected or did not negotiate the extension.
    pub fn send_local(&self, peer: &PeerId) {
        let Some(channel) = self.get_peer(peer) else {
            return;
        };
        if !channel.remote_supports(SESSION_DATA_EXTENSION) {
            return;
        }
        let blob = self.store.local().unwrap_or_else(Bytes::new);
        channel.send_extension(SESSION_DATA_EXTENSION, &blob);
    }

    /// Find the connected peer with the given identity.
    pub fn get_peer(&self, id: &PeerId) -> Option<F::Channel> {
        self.feed
            .connected_peers()
            .into_iter()
            .find(|peer| peer.remote_id() == *id)
    }

    /// Whether `peer` is connected and negotiated the extension.
    pub fn has_support(&self, peer: &PeerId) -> bool {
        self.get_peer(peer)
            .map(|channel| channel.remote_supports(SESSION_DATA_EXTENSION))
            .unwrap_or(false)
    }
}

impl<F> PeerSubscriber<F::Channel> for FeedWatcher<F>
where
    F: FeedPeers + Send + Sync + 'static,
{
    fn on_peer_added(&self, peer: &F::Channel) {
        tracing::trace!(
            feed = %self.key.short_hex(),
            peer = %peer.remote_id().short_hex(),
            "peer connected"
        );
    }

    fn on_peer_removed(&self, peer: &F::Channel) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let id = peer.remote_id();
        self.store.drop_remote(&id);
        tracing::trace!(
            feed = %self.key.short_hex(),
            peer = %id.short_hex(),
            "peer disconnected, session data dropped"
        );
    }

    fn on_extension(&self, peer: &F::Channel, extension: &str, payload: &[u8]) {
        // The channel is shared; other extensions' messages are not ours.
        if extension != SESSION_DATA_EXTENSION {
            return;
        }
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        let id = peer.remote_id();
        let stored = self.store.record_remote(id.clone(), payload);
        if stored.len() < payload.len() {
            tracing::debug!(
                feed = %self.key.short_hex(),
                peer = %id.short_hex(),
                len = payload.len(),
                "truncated oversize session data"
            );
        }
        tracing::debug!(
            feed = %self.key.short_hex(),
            peer = %id.short_hex(),
            len = stored.len(),
            "session data received"
        );
        self.events.emit(SessionDataEvent {
            feed: self.key.clone(),
            peer: id,
            data: stored,
        });
    }
}
