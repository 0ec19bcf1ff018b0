//! Status event types and their wire framing.
//!
//! Three event kinds exist, one per push-channel label:
//!
//! | kind      | label        | payload                     |
//! |-----------|--------------|-----------------------------|
//! | `Counter` | `basecount`  | cumulative base counter     |
//! | `Run`     | `run.<id>`   | one run's status snapshot   |
//! | `RunSet`  | `runs`       | current run id membership   |
//!
//! A fourth, reserved `Shutdown` value is never framed: it is the poison a
//! closing session enqueues so its drain loop terminates instead of
//! blocking forever.

use serde::Serialize;

use crate::run::RunSnapshot;

/// The three subscribable event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The global cumulative counter changed (or a keepalive fired).
    Counter,
    /// A single run's observable state changed.
    Run,
    /// The set of tracked runs changed membership.
    RunSet,
}

/// Payload for [`EventKind::Counter`].
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CounterSnapshot {
    pub basecount: u64,
}

/// Payload for [`EventKind::RunSet`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSetSnapshot {
    pub run_ids: Vec<String>,
}

/// Full status view published by the poll loop after each pass.
///
/// Sessions read this once at start so a new client does not wait a full
/// poll interval for its first data.
#[derive(Clone, Debug, Default)]
pub struct StatusSnapshot {
    pub counter: CounterSnapshot,
    pub runs: Vec<RunSnapshot>,
}

/// One event as delivered to a session queue.
#[derive(Clone, Debug)]
pub enum StatusEvent {
    Counter(CounterSnapshot),
    Run(RunSnapshot),
    RunSet(RunSetSnapshot),
    /// Reserved poison value; terminates a session's drain loop.
    Shutdown,
}

/// A labeled frame ready for the push channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Event label, e.g. `run.160329_M01132_0133_000000000-AMY9J`.
    pub label: String,
    /// JSON-encoded payload.
    pub data: String,
}

impl StatusEvent {
    /// The subscribable kind, or `None` for the reserved shutdown value.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Counter(_) => Some(EventKind::Counter),
            Self::Run(_) => Some(EventKind::Run),
            Self::RunSet(_) => Some(EventKind::RunSet),
            Self::Shutdown => None,
        }
    }

    /// Serializes into a labeled frame. `None` for the shutdown value.
    pub fn to_frame(&self) -> Option<Frame> {
        let (label, data) = match self {
            Self::Counter(counter) => {
                ("basecount".to_string(), serde_json::to_string(counter).ok()?)
            }
            Self::Run(run) => (
                format!("run.{}", run.run_id),
                serde_json::to_string(run).ok()?,
            ),
            Self::RunSet(set) => ("runs".to_string(), serde_json::to_string(set).ok()?),
            Self::Shutdown => return None,
        };
        Some(Frame { label, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunState;

    #[test]
    fn frames_carry_the_expected_labels() {
        let counter = StatusEvent::Counter(CounterSnapshot { basecount: 42 });
        let frame = counter.to_frame().unwrap();
        assert_eq!(frame.label, "basecount");
        assert_eq!(frame.data, r#"{"basecount":42}"#);

        let run = StatusEvent::Run(RunSnapshot {
            run_id: "160329_M01132_0133_000000000-AMY9J".to_string(),
            instrument_id: "M01132".to_string(),
            state: RunState::Sequencing,
            cancelled: false,
            current_cycle: 4,
            total_cycles: 318,
            basecount: 4_000_000,
            rate: 97_560.9,
            synthetic: false,
        });
        let frame = run.to_frame().unwrap();
        assert_eq!(frame.label, "run.160329_M01132_0133_000000000-AMY9J");
        assert!(frame.data.contains(r#""basecount":4000000"#));

        let set = StatusEvent::RunSet(RunSetSnapshot::default());
        assert_eq!(set.to_frame().unwrap().label, "runs");
    }

    #[test]
    fn shutdown_is_never_framed() {
        assert!(StatusEvent::Shutdown.kind().is_none());
        assert!(StatusEvent::Shutdown.to_frame().is_none());
    }
}
