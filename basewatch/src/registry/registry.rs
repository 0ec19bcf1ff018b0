//! Tracker ownership and per-pass bookkeeping.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::events::{CounterSnapshot, StatusSnapshot};
use crate::provider::{self, SyntheticSource, SyntheticSpec};
use crate::run::{RunId, RunSnapshot, RunTracker};

use super::StateStore;

/// What one poll pass observed, for downstream notification.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Snapshots of trackers that reported an observable change.
    pub changed: Vec<RunSnapshot>,
    /// Whether the tracked run set changed membership.
    pub set_changed: bool,
    /// Whether any run was committed into the cumulative counter.
    pub counter_changed: bool,
}

/// Owns all run trackers, the cumulative counter, and the persisted
/// idempotency sets.
///
/// Mutated exclusively by the poll loop; see
/// [`RegistryDaemon`](super::RegistryDaemon).
pub struct Registry {
    roots: Vec<PathBuf>,
    novaseq_helper: Option<PathBuf>,
    store: StateStore,
    trackers: BTreeMap<String, RunTracker>,
    /// Backing directory per real (non-synthetic) tracker.
    run_dirs: BTreeMap<String, PathBuf>,
    cumulative: u64,
    booked: BTreeSet<String>,
    cancelled: BTreeSet<String>,
    /// Whether the booked set has been intersected with the live run set
    /// since startup.
    reconciled: bool,
}

impl Registry {
    /// Opens the registry, loading persisted state from the configured
    /// state directory.
    pub fn open(config: &ConfigFile) -> Self {
        Self::with_paths(
            config.storage.roots.clone(),
            &config.state.directory,
            config.novaseq.cluster_helper.clone(),
        )
    }

    pub fn with_paths(
        roots: Vec<PathBuf>,
        state_dir: &std::path::Path,
        novaseq_helper: Option<PathBuf>,
    ) -> Self {
        let store = StateStore::new(state_dir);
        let cumulative = store.load_counter();
        let booked = store.load_booked();
        let cancelled = store.load_cancelled();
        info!(
            cumulative,
            booked = booked.len(),
            cancelled = cancelled.len(),
            "registry state loaded"
        );
        Self {
            roots,
            novaseq_helper,
            store,
            trackers: BTreeMap::new(),
            run_dirs: BTreeMap::new(),
            cumulative,
            booked,
            cancelled,
            reconciled: false,
        }
    }

    pub fn cumulative(&self) -> u64 {
        self.cumulative
    }

    pub fn run_count(&self) -> usize {
        self.trackers.len()
    }

    pub fn booked_runs(&self) -> &BTreeSet<String> {
        &self.booked
    }

    pub fn run_ids(&self) -> Vec<String> {
        self.trackers.keys().cloned().collect()
    }

    /// Full status view for the snapshot handle and report endpoints.
    pub fn status(&self, now: Instant) -> StatusSnapshot {
        StatusSnapshot {
            counter: CounterSnapshot {
                basecount: self.cumulative,
            },
            runs: self.trackers.values().map(|t| t.snapshot(now)).collect(),
        }
    }

    /// Inserts a synthetic tracker for testing. The id must follow the run
    /// naming convention and must not collide with a tracked run.
    pub fn insert_synthetic(
        &mut self,
        run_id: &str,
        spec: SyntheticSpec,
        now: Instant,
    ) -> Result<RunSnapshot, SyntheticError> {
        let id = RunId::parse(run_id).ok_or(SyntheticError::InvalidId)?;
        if self.trackers.contains_key(run_id) {
            return Err(SyntheticError::AlreadyTracked);
        }
        let source = SyntheticSource::new(spec, now);
        let tracker = RunTracker::new(
            id.clone(),
            Box::new(source),
            id.instrument_class().profile(),
            false,
            true,
            now,
        );
        let snapshot = tracker.snapshot(now);
        self.trackers.insert(run_id.to_string(), tracker);
        info!(run = run_id, "synthetic run inserted");
        Ok(snapshot)
    }

    /// Removes a synthetic tracker. Real trackers cannot be removed this
    /// way; they live and die with their directory.
    pub fn remove_synthetic(&mut self, run_id: &str) -> Result<(), SyntheticError> {
        match self.trackers.get(run_id) {
            None => return Err(SyntheticError::NotTracked),
            Some(tracker) if !tracker.is_synthetic() => return Err(SyntheticError::NotSynthetic),
            Some(_) => {}
        }
        self.trackers.remove(run_id);
        if self.booked.remove(run_id) {
            self.persist_booked();
        }
        info!(run = run_id, "synthetic run removed");
        Ok(())
    }

    /// Executes one poll pass. See the module docs for the step order.
    pub fn poll(&mut self, now: Instant) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        self.discover(now, &mut outcome);
        let mut booked_dirty = self.reconcile_booked();
        let counter_dirty = self.commit_finished(now, &mut outcome, &mut booked_dirty);

        for tracker in self.trackers.values_mut() {
            if tracker.update(now) {
                outcome.changed.push(tracker.snapshot(now));
            }
        }

        booked_dirty |= self.remove_vanished(&mut outcome);
        let cancelled_dirty = self.refresh_cancelled();

        if counter_dirty {
            self.persist_counter();
        }
        if booked_dirty {
            self.persist_booked();
        }
        if cancelled_dirty {
            self.persist_cancelled();
        }
        outcome
    }

    /// Creates trackers for newly appeared run directories.
    fn discover(&mut self, now: Instant, outcome: &mut PollOutcome) {
        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(root = %root.display(), %err, "storage root unreadable");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                let Some(id) = RunId::parse(name) else { continue };
                if self.trackers.contains_key(name) || !entry.path().is_dir() {
                    continue;
                }
                let path = entry.path();
                let source = provider::source_for(&id, &path, self.novaseq_helper.as_deref());
                let seeded_cancelled = self.cancelled.contains(name);
                let tracker = RunTracker::new(
                    id.clone(),
                    Box::new(source),
                    id.instrument_class().profile(),
                    seeded_cancelled,
                    false,
                    now,
                );
                info!(run = name, seeded_cancelled, "run directory discovered");
                self.trackers.insert(name.to_string(), tracker);
                self.run_dirs.insert(name.to_string(), path);
                outcome.set_changed = true;
            }
        }
    }

    /// Once after startup: drop booked ids that no longer correspond to a
    /// tracked run, bounding staleness from a prior crash.
    fn reconcile_booked(&mut self) -> bool {
        if self.reconciled {
            return false;
        }
        self.reconciled = true;
        let before = self.booked.len();
        let trackers = &self.trackers;
        self.booked.retain(|id| trackers.contains_key(id));
        before != self.booked.len()
    }

    /// Folds finished, uncommitted runs into the cumulative counter.
    ///
    /// The persisted booked set is the idempotency guard: an id already in
    /// it (e.g. after a restart) is never counted again, but the tracker
    /// is still marked committed so the in-process check stays cheap.
    fn commit_finished(
        &mut self,
        now: Instant,
        outcome: &mut PollOutcome,
        booked_dirty: &mut bool,
    ) -> bool {
        let mut counter_dirty = false;
        for (id, tracker) in &mut self.trackers {
            if !tracker.finished() || tracker.committed() {
                continue;
            }
            if !self.booked.contains(id) {
                let contribution = tracker.basecount(now).max(0.0).round() as u64;
                self.cumulative += contribution;
                self.booked.insert(id.clone());
                counter_dirty = true;
                *booked_dirty = true;
                info!(
                    run = %id,
                    contribution,
                    cumulative = self.cumulative,
                    "run booked into cumulative counter"
                );
            }
            tracker.mark_committed();
            outcome.counter_changed = true;
        }
        counter_dirty
    }

    /// Drops real trackers whose backing directory is gone. Committed
    /// contributions are never retracted.
    fn remove_vanished(&mut self, outcome: &mut PollOutcome) -> bool {
        let vanished: Vec<String> = self
            .run_dirs
            .iter()
            .filter(|(_, dir)| !dir.is_dir())
            .map(|(id, _)| id.clone())
            .collect();
        let mut booked_dirty = false;
        for id in vanished {
            info!(run = %id, "run directory vanished, dropping tracker");
            self.trackers.remove(&id);
            self.run_dirs.remove(&id);
            booked_dirty |= self.booked.remove(&id);
            outcome.set_changed = true;
        }
        booked_dirty
    }

    /// Rebuilds the persisted cancelled set from current tracker flags.
    /// Synthetic runs are exempt from stall persistence.
    fn refresh_cancelled(&mut self) -> bool {
        let current: BTreeSet<String> = self
            .trackers
            .iter()
            .filter(|(_, t)| !t.is_synthetic() && !t.finished() && t.cancelled())
            .map(|(id, _)| id.clone())
            .collect();
        if current != self.cancelled {
            self.cancelled = current;
            true
        } else {
            false
        }
    }

    fn persist_counter(&self) {
        if let Err(err) = self.store.save_counter(self.cumulative) {
            warn!(%err, "failed to persist cumulative counter");
        }
    }

    fn persist_booked(&self) {
        if let Err(err) = self.store.save_booked(&self.booked) {
            warn!(%err, "failed to persist booked run set");
        }
    }

    fn persist_cancelled(&self) {
        if let Err(err) = self.store.save_cancelled(&self.cancelled) {
            warn!(%err, "failed to persist cancelled run set");
        }
    }
}

/// Errors from the synthetic-run admin operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SyntheticError {
    #[error("run id does not follow the run naming convention")]
    InvalidId,
    #[error("a run with this id is already tracked")]
    AlreadyTracked,
    #[error("no run with this id is tracked")]
    NotTracked,
    #[error("run is not synthetic")]
    NotSynthetic,
}
