//! One client's subscription to the event stream.
//!
//! A [`StreamSession`] owns the receiving side of a bounded queue fed by
//! the [`EventBus`]; the paired [`SessionHandle`] is the non-owning handle
//! the transport layer and the admission controller use to close it.
//!
//! The drain loop suspends only on its own queue. Closing a session is
//! idempotent and deterministic: the handle cancels the session's token
//! and enqueues the reserved shutdown value, so the very next dequeue
//! returns end-of-stream instead of blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{EventBus, EventKind, Frame, RunSetSnapshot, StatusEvent, StatusSnapshot};

/// Consuming side of one client subscription.
pub struct StreamSession {
    rx: mpsc::Receiver<StatusEvent>,
    token: CancellationToken,
    alive: Arc<AtomicBool>,
}

/// Non-owning handle to a live session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<StatusEvent>,
    token: CancellationToken,
    alive: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Terminates the session. Idempotent; closing a dead session is a
    /// no-op.
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            // Best effort: the token alone already unblocks the drain
            // loop, the poison just makes an in-flight recv deterministic.
            let _ = self.tx.try_send(StatusEvent::Shutdown);
            self.token.cancel();
        }
    }

    /// Whether the session has neither been closed nor dropped its
    /// receiving side.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.tx.is_closed()
    }
}

impl StreamSession {
    /// Opens a session subscribed to `kinds` and registers it on the bus.
    ///
    /// An initial snapshot is enqueued synchronously so the client sees
    /// current state without waiting for the next poll pass: the counter,
    /// the run-set, then one frame per tracked run (each gated on the
    /// corresponding subscription).
    pub fn open(
        bus: &EventBus,
        kinds: &[EventKind],
        queue_capacity: usize,
        snapshot: &StatusSnapshot,
    ) -> (StreamSession, SessionHandle) {
        // The initial snapshot must fit in one burst.
        let capacity = queue_capacity.max(snapshot.runs.len() + 2);
        let (tx, rx) = mpsc::channel(capacity);
        let token = CancellationToken::new();
        let alive = Arc::new(AtomicBool::new(true));

        if kinds.contains(&EventKind::Counter) {
            let _ = tx.try_send(StatusEvent::Counter(snapshot.counter));
        }
        if kinds.contains(&EventKind::RunSet) {
            let run_ids = snapshot.runs.iter().map(|r| r.run_id.clone()).collect();
            let _ = tx.try_send(StatusEvent::RunSet(RunSetSnapshot { run_ids }));
        }
        if kinds.contains(&EventKind::Run) {
            for run in &snapshot.runs {
                let _ = tx.try_send(StatusEvent::Run(run.clone()));
            }
        }

        bus.attach(kinds.to_vec(), tx.clone());

        let session = StreamSession {
            rx,
            token: token.clone(),
            alive: Arc::clone(&alive),
        };
        let handle = SessionHandle { tx, token, alive };
        (session, handle)
    }

    /// Dequeues the next event, or `None` once the session is closed.
    pub async fn next_event(&mut self) -> Option<StatusEvent> {
        let event = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = self.rx.recv() => match event {
                Some(StatusEvent::Shutdown) | None => None,
                Some(event) => Some(event),
            },
        };
        if event.is_none() {
            self.alive.store(false, Ordering::SeqCst);
            self.rx.close();
        }
        event
    }

    /// Dequeues the next event as a labeled frame.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let event = self.next_event().await?;
            if let Some(frame) = event.to_frame() {
                return Some(frame);
            }
        }
    }

    /// Consumes the session into an ordered stream of frames, ending when
    /// the session closes.
    pub fn into_frames(self) -> impl Stream<Item = Frame> {
        futures::stream::unfold(self, |mut session| async move {
            session.next_frame().await.map(|frame| (frame, session))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CounterSnapshot;
    use crate::run::{RunSnapshot, RunState};

    const ALL_KINDS: [EventKind; 3] = [EventKind::Counter, EventKind::Run, EventKind::RunSet];

    fn run_snapshot(id: &str) -> RunSnapshot {
        RunSnapshot {
            run_id: id.to_string(),
            instrument_id: "M01132".to_string(),
            state: RunState::Sequencing,
            cancelled: false,
            current_cycle: 1,
            total_cycles: 318,
            basecount: 0,
            rate: 0.0,
            synthetic: false,
        }
    }

    #[tokio::test]
    async fn initial_snapshot_arrives_before_any_published_event() {
        let bus = EventBus::new();
        let snapshot = StatusSnapshot {
            counter: CounterSnapshot { basecount: 7 },
            runs: vec![run_snapshot("160329_M01132_0133_000000000-AMY9J")],
        };
        let (mut session, _handle) = StreamSession::open(&bus, &ALL_KINDS, 16, &snapshot);
        bus.publish(&StatusEvent::Counter(CounterSnapshot { basecount: 8 }));

        let first = session.next_frame().await.unwrap();
        assert_eq!(first.label, "basecount");
        assert_eq!(first.data, r#"{"basecount":7}"#);
        assert_eq!(session.next_frame().await.unwrap().label, "runs");
        assert_eq!(
            session.next_frame().await.unwrap().label,
            "run.160329_M01132_0133_000000000-AMY9J"
        );
        assert_eq!(
            session.next_frame().await.unwrap().data,
            r#"{"basecount":8}"#
        );
    }

    #[tokio::test]
    async fn events_drain_in_publish_order() {
        let bus = EventBus::new();
        let (mut session, _handle) =
            StreamSession::open(&bus, &[EventKind::Counter], 16, &StatusSnapshot::default());

        for n in 0..5 {
            bus.publish(&StatusEvent::Counter(CounterSnapshot { basecount: n }));
        }
        // Skip the initial snapshot frame.
        session.next_frame().await.unwrap();
        for n in 0..5 {
            let frame = session.next_frame().await.unwrap();
            assert_eq!(frame.data, format!(r#"{{"basecount":{n}}}"#));
        }
    }

    #[tokio::test]
    async fn closed_session_terminates_on_next_dequeue() {
        let bus = EventBus::new();
        let (mut session, handle) =
            StreamSession::open(&bus, &[EventKind::Counter], 16, &StatusSnapshot::default());

        handle.close();
        // Must not block even though no further event will be published.
        session.next_event().await;
        assert!(session.next_event().await.is_none());
        assert!(!handle.is_alive());

        // Closing again is a no-op.
        handle.close();
    }

    #[tokio::test]
    async fn close_unblocks_a_waiting_drain_loop() {
        let bus = EventBus::new();
        let (mut session, handle) =
            StreamSession::open(&bus, &[EventKind::Run], 16, &StatusSnapshot::default());

        let drain = tokio::spawn(async move {
            while session.next_frame().await.is_some() {}
        });
        handle.close();
        drain.await.unwrap();
    }
}
