//! Session admission and eviction.
//!
//! The controller keeps non-owning handles to live sessions in arrival
//! order. Dead sessions are reclaimed lazily: pruned when the next
//! admission request comes in, or - if the pool is still full after
//! pruning - reclaimed by force-closing the earliest-registered session
//! that is still live. Eviction is by arrival order, not activity.

use std::sync::Mutex;

use tracing::{debug, warn};

use super::SessionHandle;

/// Bounds the number of concurrently live sessions.
pub struct AdmissionController {
    max_sessions: usize,
    sessions: Mutex<Vec<SessionHandle>>,
}

impl AdmissionController {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new session, evicting the oldest live one if the pool
    /// is full.
    pub fn admit(&self, handle: SessionHandle) {
        let mut sessions = self.sessions.lock().expect("admission lock");
        sessions.retain(SessionHandle::is_alive);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions.remove(0);
            oldest.close();
            warn!(
                max_sessions = self.max_sessions,
                "session pool full; evicted oldest session"
            );
        }
        sessions.push(handle);
        debug!(live = sessions.len(), "session admitted");
    }

    /// Number of currently live sessions.
    pub fn live_sessions(&self) -> usize {
        let sessions = self.sessions.lock().expect("admission lock");
        sessions.iter().filter(|h| h.is_alive()).count()
    }

    /// Closes every session, e.g. on shutdown.
    pub fn close_all(&self) {
        let mut sessions = self.sessions.lock().expect("admission lock");
        for handle in sessions.drain(..) {
            handle.close();
        }
    }
}
