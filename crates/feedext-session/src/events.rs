//! Notification stream for accepted session data.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use feedext_core::{FeedKey, PeerId};
use tokio::sync::mpsc;

/// One accepted remote session-data message: which feed it arrived on,
/// which peer sent it, and the blob as stored (after truncation, if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDataEvent {
    pub feed: FeedKey,
    pub peer: PeerId,
    pub data: Bytes,
}

/// Fan-out behind the registry's notification stream.
///
/// Every subscriber gets its own unbounded channel. Emission happens
/// synchronously inside the message callback, so each subscriber sees
/// events in receipt order across all watched feeds. Subscribers that
/// dropped their receiver are pruned on the next emit.
#[derive(Clone, Default)]
pub(crate) struct EventHub {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionDataEvent>>>>,
}

impl EventHub {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionDataEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn emit(&self, event: SessionDataEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
