//! Event fan-out.
//!
//! [`EventBus`] holds one sender per attached session queue. Publishing
//! clones the event into every queue whose session subscribed to that
//! kind, without blocking the publisher: a full queue drops the event for
//! that session only, and queues whose receiver is gone are pruned on the
//! next publish. Per-queue ordering is FIFO; there is no cross-session
//! ordering.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use super::{EventKind, StatusEvent};

struct Listener {
    kinds: Vec<EventKind>,
    tx: mpsc::Sender<StatusEvent>,
}

/// Fan-out publisher for [`StatusEvent`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session queue for the given event kinds.
    pub(super) fn attach(&self, kinds: Vec<EventKind>, tx: mpsc::Sender<StatusEvent>) {
        let mut listeners = self.listeners.lock().expect("bus lock");
        listeners.push(Listener { kinds, tx });
    }

    /// Publishes an event to every matching session queue.
    ///
    /// The reserved shutdown value has no kind and is never published this
    /// way; sessions receive it only through their own handle.
    pub fn publish(&self, event: &StatusEvent) {
        let Some(kind) = event.kind() else {
            return;
        };
        let mut listeners = self.listeners.lock().expect("bus lock");
        listeners.retain(|listener| !listener.tx.is_closed());
        for listener in listeners.iter() {
            if !listener.kinds.contains(&kind) {
                continue;
            }
            match listener.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Bounded by queue capacity only; the slow consumer is
                    // reclaimed by admission-time eviction, not here.
                    warn!(?kind, "session queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Number of attached queues whose receiver is still open.
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.lock().expect("bus lock");
        listeners.iter().filter(|l| !l.tx.is_closed()).count()
    }
}
