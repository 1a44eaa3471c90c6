//! feedext integration test harness.
//!
//! End-to-end tests wire two registries together over an in-memory
//! replication link. The link delivers peer events synchronously on the
//! caller's thread, standing in for a real transport's event loop: both
//! sides of a connection see `on_peer_added`, extension sends cross the
//! link and surface as `on_extension` on the far side, and `disconnect`
//! fires `on_peer_removed`.
//!
//! Tests in sibling files reuse the harness via `use crate::*`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use feedext_core::{FeedKey, FeedPeers, PeerChannel, PeerId, PeerSubscriber, SubscriptionId};
use feedext_session::SessionDataEvent;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;


// ── Harness ───────────────────────────────────────────────────────────────────

/// One side of an in-memory replication link.
#[derive(Clone)]
pub struct MemFeed(Arc<MemFeedInner>);

struct MemFeedInner {
    key: FeedKey,
    /// Identity this side presents to its remotes.
    id: PeerId,
    peers: Mutex<Vec<MemPeer>>,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn PeerSubscriber<MemPeer>>)>>,
    next_subscription: AtomicU64,
}

/// A remote peer as seen from one side of the link.
#[derive(Clone)]
pub struct MemPeer {
    /// Identity of the far side.
    remote_id: PeerId,
    /// Identity of the side holding this handle — the sender on the wire.
    local_id: PeerId,
    /// Extension names both sides agreed on during the (simulated)
    /// handshake.
    negotiated: Arc<Vec<String>>,
    /// The far side's feed, where sends are delivered.
    target: MemFeed,
}

impl MemFeed {
    pub fn new(key: &[u8], id: &[u8]) -> Self {
        Self(Arc::new(MemFeedInner {
            key: FeedKey::from(key),
            id: PeerId::from(id),
            peers: Mutex::default(),
            subscribers: Mutex::default(),
            next_subscription: AtomicU64::new(0),
        }))
    }

    pub fn key(&self) -> FeedKey {
        self.0.key.clone()
    }

    pub fn local_id(&self) -> PeerId {
        self.0.id.clone()
    }

    fn snapshot_subscribers(&self) -> Vec<Arc<dyn PeerSubscriber<MemPeer>>> {
        self.0
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect()
    }

    fn add_peer(&self, peer: MemPeer) {
        self.0.peers.lock().unwrap().push(peer.clone());
        for subscriber in self.snapshot_subscribers() {
            subscriber.on_peer_added(&peer);
        }
    }

    fn remove_peer(&self, id: &PeerId) {
        let removed = {
            let mut peers = self.0.peers.lock().unwrap();
            peers
                .iter()
                .position(|peer| peer.remote_id == *id)
                .map(|index| peers.remove(index))
        };
        if let Some(peer) = removed {
            for subscriber in self.snapshot_subscribers() {
                subscriber.on_peer_removed(&peer);
            }
        }
    }

    fn deliver_from(&self, sender: &PeerId, extension: &str, payload: &[u8]) {
        let peer = {
            let peers = self.0.peers.lock().unwrap();
            peers.iter().find(|peer| peer.remote_id == *sender).cloned()
        };
        let Some(peer) = peer else {
            // Sender already disconnected from this side; drop on the floor.
            return;
        };
        for subscriber in self.snapshot_subscribers() {
            subscriber.on_extension(&peer, extension, payload);
        }
    }
}

impl FeedPeers for MemFeed {
    type Channel = MemPeer;

    fn feed_key(&self) -> FeedKey {
        self.0.key.clone()
    }

    fn connected_peers(&self) -> Vec<MemPeer> {
        self.0.peers.lock().unwrap().clone()
    }

    fn subscribe(&self, subscriber: Arc<dyn PeerSubscriber<MemPeer>>) -> SubscriptionId {
        let id = SubscriptionId(self.0.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.0.subscribers.lock().unwrap().push((id, subscriber));
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.0
            .subscribers
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != subscription);
    }
}

impl PeerChannel for MemPeer {
    fn remote_id(&self) -> PeerId {
        self.remote_id.clone()
    }

    fn remote_supports(&self, extension: &str) -> bool {
        self.negotiated.iter().any(|name| name == extension)
    }

    fn send_extension(&self, extension: &str, payload: &[u8]) {
        self.target.deliver_from(&self.local_id, extension, payload);
    }
}

/// Connect two feeds, negotiating the given extension names on both
/// sides. Fires `on_peer_added` on each.
pub fn connect(a: &MemFeed, b: &MemFeed, extensions: &[&str]) {
    let negotiated: Arc<Vec<String>> =
        Arc::new(extensions.iter().map(|name| name.to_string()).collect());
    let on_a = MemPeer {
        remote_id: b.local_id(),
        local_id: a.local_id(),
        negotiated: Arc::clone(&negotiated),
        target: b.clone(),
    };
    let on_b = MemPeer {
        remote_id: a.local_id(),
        local_id: b.local_id(),
        negotiated,
        target: a.clone(),
    };
    a.add_peer(on_a);
    b.add_peer(on_b);
}

/// Tear the link down. Fires `on_peer_removed` on each side.
pub fn disconnect(a: &MemFeed, b: &MemFeed) {
    a.remove_peer(&b.local_id());
    b.remove_peer(&a.local_id());
}

/// Receive the next notification, failing fast instead of hanging when
/// none arrives.
pub async fn next_event(
    events: &mut UnboundedReceiver<SessionDataEvent>,
) -> Result<SessionDataEvent> {
    timeout(Duration::from_secs(1), events.recv())
        .await
        .context("timed out waiting for a session-data event")?
        .context("event stream closed")
}

// ── Harness self-tests ────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSubscriber {
    added: Mutex<Vec<PeerId>>,
    removed: Mutex<Vec<PeerId>>,
    messages: Mutex<Vec<(PeerId, String, Vec<u8>)>>,
}

impl PeerSubscriber<MemPeer> for RecordingSubscriber {
    fn on_peer_added(&self, peer: &MemPeer) {
        self.added.lock().unwrap().push(peer.remote_id());
    }

    fn on_peer_removed(&self, peer: &MemPeer) {
        self.removed.lock().unwrap().push(peer.remote_id());
    }

    fn on_extension(&self, peer: &MemPeer, extension: &str, payload: &[u8]) {
        self.messages
            .lock()
            .unwrap()
            .push((peer.remote_id(), extension.to_string(), payload.to_vec()));
    }
}

#[test]
fn connect_fires_peer_added_on_both_sides() {
    let a = MemFeed::new(b"feed", b"peer-a");
    let b = MemFeed::new(b"feed", b"peer-b");
    let sub_a = Arc::new(RecordingSubscriber::default());
    let sub_b = Arc::new(RecordingSubscriber::default());
    a.subscribe(Arc::clone(&sub_a) as Arc<dyn PeerSubscriber<MemPeer>>);
    b.subscribe(Arc::clone(&sub_b) as Arc<dyn PeerSubscriber<MemPeer>>);

    connect(&a, &b, &[]);

    assert_eq!(*sub_a.added.lock().unwrap(), vec![b.local_id()]);
    assert_eq!(*sub_b.added.lock().unwrap(), vec![a.local_id()]);
    assert_eq!(a.connected_peers().len(), 1);
}

#[test]
fn sends_cross_the_link() {
    let a = MemFeed::new(b"feed", b"peer-a");
    let b = MemFeed::new(b"feed", b"peer-b");
    let sub_b = Arc::new(RecordingSubscriber::default());
    b.subscribe(Arc::clone(&sub_b) as Arc<dyn PeerSubscriber<MemPeer>>);

    connect(&a, &b, &["some-ext"]);
    a.connected_peers()[0].send_extension("some-ext", b"payload");

    let messages = sub_b.messages.lock().unwrap();
    assert_eq!(
        *messages,
        vec![(a.local_id(), "some-ext".to_string(), b"payload".to_vec())]
    );
}

#[test]
fn disconnect_fires_peer_removed_and_clears_peers() {
    let a = MemFeed::new(b"feed", b"peer-a");
    let b = MemFeed::new(b"feed", b"peer-b");
    let sub_a = Arc::new(RecordingSubscriber::default());
    a.subscribe(Arc::clone(&sub_a) as Arc<dyn PeerSubscriber<MemPeer>>);

    connect(&a, &b, &[]);
    disconnect(&a, &b);

    assert_eq!(*sub_a.removed.lock().unwrap(), vec![b.local_id()]);
    assert!(a.connected_peers().is_empty());
    assert!(b.connected_peers().is_empty());
}
