//! Extension registry — the public entry point.
//!
//! One registry instance tracks any number of feeds. Application code
//! watches a feed, reads and writes session data through the registry,
//! and subscribes to the notification stream; everything else happens in
//! transport callbacks owned by the per-feed watchers.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use feedext_core::{FeedKey, FeedPeers, PeerId};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::SessionDataTooLarge;
use crate::events::{EventHub, SessionDataEvent};
use crate::watcher::FeedWatcher;

/// Keyed collection of feed watchers, one per watched feed.
///
/// The registry exclusively owns its watchers: they are created on
/// [`watch`](Self::watch), destroyed on [`unwatch`](Self::unwatch), and
/// never handed out. Cheap to clone; clones share state.
pub struct SessionDataExt<F: FeedPeers> {
    watchers: Arc<DashMap<FeedKey, Arc<FeedWatcher<F>>>>,
    hub: EventHub,
}

impl<F: FeedPeers> Clone for SessionDataExt<F> {
    fn clone(&self) -> Self {
        Self {
            watchers: Arc::clone(&self.watchers),
            hub: self.hub.clone(),
        }
    }
}

impl<F> SessionDataExt<F>
where
    F: FeedPeers + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            watchers: Arc::new(DashMap::new()),
            hub: EventHub::default(),
        }
    }

    /// Start watching a feed. Idempotent: a feed that is already watched
    /// keeps its existing watcher and store.
    pub fn watch(&self, feed: F) {
        let key = feed.feed_key();
        let watcher = match self.watchers.entry(key.clone()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(entry) => {
                let watcher = Arc::new(FeedWatcher::new(feed, self.hub.clone()));
                entry.insert(Arc::clone(&watcher));
                watcher
            }
        };
        watcher.listen();
        tracing::info!(feed = %key.short_hex(), "feed watched");
    }

    /// Stop watching a feed: unsubscribe from its peer events and
    /// discard all session data stored for it. No-op when unwatched.
    pub fn unwatch(&self, feed: &FeedKey) {
        if let Some((_, watcher)) = self.watchers.remove(feed) {
            watcher.unlisten();
            tracing::info!(feed = %feed.short_hex(), "feed unwatched");
        }
    }

    pub fn is_watched(&self, feed: &FeedKey) -> bool {
        self.watchers.contains_key(feed)
    }

    pub fn watched_feeds(&self) -> Vec<FeedKey> {
        self.watchers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Whether `peer` is connected on `feed` and negotiated the
    /// extension. False when the feed is unwatched or the peer unknown.
    pub fn has_support(&self, feed: &FeedKey, peer: &PeerId) -> bool {
        self.watcher(feed)
            .map(|watcher| watcher.has_support(peer))
            .unwrap_or(false)
    }

    /// All stored remote session datas for a feed. Empty when unwatched.
    pub fn session_datas(&self, feed: &FeedKey) -> HashMap<PeerId, Bytes> {
        self.watcher(feed)
            .map(|watcher| watcher.store().all_remote())
            .unwrap_or_default()
    }

    /// The last session data received from `peer` on `feed`. `None` when
    /// nothing was received, the peer disconnected, or the feed is
    /// unwatched.
    pub fn session_data(&self, feed: &FeedKey, peer: &PeerId) -> Option<Bytes> {
        self.watcher(feed)?.store().remote(peer)
    }

    /// The local session data for a feed. `None` until set.
    pub fn local_session_data(&self, feed: &FeedKey) -> Option<Bytes> {
        self.watcher(feed)?.store().local()
    }

    /// Set the local session data and broadcast it to every connected
    /// peer that negotiated the extension.
    ///
    /// `None` stores a zero-length blob. Payloads over 256 bytes fail
    /// with [`SessionDataTooLarge`] and nothing is sent. Setting on an
    /// unwatched feed is a silent no-op — no implicit watch.
    pub fn set_local_session_data<T: AsRef<[u8]>>(
        &self,
        feed: &FeedKey,
        data: Option<T>,
    ) -> Result<(), SessionDataTooLarge> {
        let Some(watcher) = self.watcher(feed) else {
            return Ok(());
        };
        watcher.set_local(data)?;
        watcher.broadcast_local();
        Ok(())
    }

    /// Send the current local session data to a single peer. No-op when
    /// the feed is unwatched, the peer is not connected, or the peer did
    /// not negotiate the extension.
    pub fn send_local_session_data(&self, feed: &FeedKey, peer: &PeerId) {
        if let Some(watcher) = self.watcher(feed) {
            watcher.send_local(peer);
        }
    }

    /// Subscribe to the notification stream: one event per accepted
    /// remote session-data message, after truncation, in receipt order
    /// across all watched feeds. Subscribers created later see only
    /// later events.
    pub fn events(&self) -> UnboundedReceiver<SessionDataEvent> {
        self.hub.subscribe()
    }

    fn watcher(&self, feed: &FeedKey) -> Option<Arc<FeedWatcher<F>>> {
        self.watchers.get(feed).map(|watcher| Arc::clone(&watcher))
    }
}

impl<F> Default for SessionDataExt<F>
where
    F: FeedPeers + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
