//! In-memory session-data store for one watched feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use dashmap::DashMap;
use feedext_core::PeerId;

use crate::error::SessionDataTooLarge;
use crate::MAX_SESSION_DATA;

/// Per-feed session-data state: the local outgoing blob and the last
/// blob received from each connected peer.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct SessionStore {
    /// `None` until `set_local` has been called at least once.
    local: Arc<Mutex<Option<Bytes>>>,
    /// Entries exist only for peers that are currently connected;
    /// the watcher removes them on disconnect.
    remote: Arc<DashMap<PeerId, Bytes>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local session data.
    ///
    /// `None` and empty input both store a zero-length blob. Input over
    /// [`MAX_SESSION_DATA`] bytes fails and leaves the store unchanged.
    pub fn set_local<T: AsRef<[u8]>>(&self, data: Option<T>) -> Result<(), SessionDataTooLarge> {
        let blob = match data {
            Some(data) => {
                let bytes = data.as_ref();
                if bytes.len() > MAX_SESSION_DATA {
                    return Err(SessionDataTooLarge { len: bytes.len() });
                }
                Bytes::copy_from_slice(bytes)
            }
            None => Bytes::new(),
        };
        *self.local.lock().unwrap() = Some(blob);
        Ok(())
    }

    /// Record session data received from a peer, overwriting any prior
    /// value. Payloads over [`MAX_SESSION_DATA`] bytes are truncated to
    /// the first 256 — this path never errors. Returns the stored blob.
    pub fn record_remote(&self, peer: PeerId, payload: &[u8]) -> Bytes {
        let stored = Bytes::copy_from_slice(&payload[..payload.len().min(MAX_SESSION_DATA)]);
        self.remote.insert(peer, stored.clone());
        stored
    }

    /// Remove the stored blob for a peer. No-op if none is stored.
    pub fn drop_remote(&self, peer: &PeerId) {
        self.remote.remove(peer);
    }

    /// The local session data. `None` until `set_local` has been called.
    pub fn local(&self) -> Option<Bytes> {
        self.local.lock().unwrap().clone()
    }

    /// The last blob received from `peer`. `None` means nothing was ever
    /// received — a stored empty blob comes back as `Some`.
    pub fn remote(&self, peer: &PeerId) -> Option<Bytes> {
        self.remote.get(peer).map(|blob| blob.clone())
    }

    /// Snapshot of all stored remote session datas.
    pub fn all_remote(&self) -> HashMap<PeerId, Bytes> {
        self.remote
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of peers with stored session data.
    pub fn remote_count(&self) -> usize {
        self.remote.len()
    }
}
