//! The fixed-interval poll loop.
//!
//! The daemon is the single writer of all registry state. Each tick it
//! runs one poll pass, refreshes the shared status snapshot, and publishes
//! the pass's deltas on the event bus - per-run changes first, the counter
//! event last. Admin commands (synthetic run insertion/removal) arrive
//! over a channel and are applied between ticks, never concurrently.
//!
//! A keepalive counter increments once per poll; once it exceeds the
//! configured number of intervals without a real counter publish, the
//! counter event is force-republished so idle client connections survive
//! intermediary proxy timeouts.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{CounterSnapshot, EventBus, RunSetSnapshot, StatusEvent, StatusSnapshot};
use crate::provider::SyntheticSpec;

use super::Registry;

/// Shared, read-only view of the latest poll pass. Written only by the
/// daemon; report endpoints and new sessions read it.
pub type SharedStatus = Arc<RwLock<StatusSnapshot>>;

/// Admin commands applied by the poll loop between passes.
#[derive(Debug)]
pub enum RegistryCommand {
    InsertSynthetic { run_id: String, spec: SyntheticSpec },
    RemoveSynthetic { run_id: String },
}

/// Owns the [`Registry`] and runs the poll loop.
pub struct RegistryDaemon {
    registry: Registry,
    bus: EventBus,
    shared: SharedStatus,
    commands: mpsc::Receiver<RegistryCommand>,
    poll_interval: Duration,
    keepalive_intervals: u32,
    keepalive_ticks: u32,
}

impl RegistryDaemon {
    /// Creates the daemon and the sender half of its command channel.
    pub fn new(
        registry: Registry,
        bus: EventBus,
        poll_interval: Duration,
        keepalive_intervals: u32,
    ) -> (Self, mpsc::Sender<RegistryCommand>) {
        let (tx, rx) = mpsc::channel(16);
        let daemon = Self {
            registry,
            bus,
            shared: Arc::new(RwLock::new(StatusSnapshot::default())),
            commands: rx,
            poll_interval,
            keepalive_intervals,
            keepalive_ticks: 0,
        };
        (daemon, tx)
    }

    /// Handle to the shared status snapshot.
    pub fn snapshot_handle(&self) -> SharedStatus {
        Arc::clone(&self.shared)
    }

    /// Runs the poll loop until shutdown is signalled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(interval = ?self.poll_interval, "registry daemon starting");
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("registry daemon shutting down");
                    break;
                }

                Some(command) = self.commands.recv() => {
                    self.handle_command(command);
                }

                _ = ticker.tick() => {
                    self.poll_once(Instant::now());
                }
            }
        }
    }

    /// One poll pass: update state, refresh the snapshot, publish deltas.
    pub fn poll_once(&mut self, now: Instant) {
        let outcome = self.registry.poll(now);
        self.refresh_shared(now);

        if outcome.set_changed {
            self.bus.publish(&StatusEvent::RunSet(RunSetSnapshot {
                run_ids: self.registry.run_ids(),
            }));
        }
        for snapshot in outcome.changed {
            self.bus.publish(&StatusEvent::Run(snapshot));
        }

        // Per-run changes above always precede the end-of-pass counter
        // event.
        if outcome.counter_changed {
            self.publish_counter();
        } else {
            self.keepalive_ticks += 1;
            if self.keepalive_ticks > self.keepalive_intervals {
                debug!("keepalive interval elapsed, republishing counter");
                self.publish_counter();
            }
        }
    }

    fn publish_counter(&mut self) {
        self.bus.publish(&StatusEvent::Counter(CounterSnapshot {
            basecount: self.registry.cumulative(),
        }));
        self.keepalive_ticks = 0;
    }

    fn handle_command(&mut self, command: RegistryCommand) {
        let now = Instant::now();
        match command {
            RegistryCommand::InsertSynthetic { run_id, spec } => {
                match self.registry.insert_synthetic(&run_id, spec, now) {
                    Ok(snapshot) => {
                        self.refresh_shared(now);
                        self.bus.publish(&StatusEvent::RunSet(RunSetSnapshot {
                            run_ids: self.registry.run_ids(),
                        }));
                        self.bus.publish(&StatusEvent::Run(snapshot));
                    }
                    Err(err) => warn!(run = %run_id, %err, "synthetic insert rejected"),
                }
            }
            RegistryCommand::RemoveSynthetic { run_id } => {
                match self.registry.remove_synthetic(&run_id) {
                    Ok(()) => {
                        self.refresh_shared(now);
                        self.bus.publish(&StatusEvent::RunSet(RunSetSnapshot {
                            run_ids: self.registry.run_ids(),
                        }));
                    }
                    Err(err) => warn!(run = %run_id, %err, "synthetic removal rejected"),
                }
            }
        }
    }

    fn refresh_shared(&self, now: Instant) {
        let status = self.registry.status(now);
        match self.shared.write() {
            Ok(mut shared) => *shared = status,
            Err(err) => warn!(%err, "status snapshot lock poisoned"),
        }
    }
}
