//! Per-run progress tracking.
//!
//! A [`RunTracker`] owns the observed state of one run and advances it one
//! [`update`](RunTracker::update) call per poll pass. The tracker moves
//! through three states:
//!
//! ```text
//! AwaitingMetadata ──(RunInfo readable)──► Active ──(completion marker)──► Finished
//! ```
//!
//! `Finished` is terminal: once set, no field is mutated again. The
//! stall/cancellation flag is not a state - it is a heuristic re-evaluated
//! on every update while active, and can flip back off if the run resumes.
//!
//! All timing is passed in explicitly as [`Instant`]s by the poll loop, so
//! estimation is deterministic under test.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::instrument::{InstrumentProfile, STALL_CEILING, STALL_FACTOR};
use crate::provider::{ReadSegment, RunDataSource};

use super::RunId;

/// Number of recent `(Δcycle, Δtime)` pairs the pace estimator keeps.
const PACE_WINDOW: usize = 5;

/// Minimum cycle-arrival samples before pace-based estimates are trusted.
const MIN_PACE_SAMPLES: usize = 3;

/// Beyond this cycle a run is established enough that the last-update time
/// is a meaningful extrapolation anchor even with few arrival samples.
const ESTABLISHED_CYCLE: u32 = 29;

/// Coarse lifecycle state, derived from tracker fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Created, but the instrument has not written usable metadata yet.
    Waiting,
    /// Metadata known, cycles arriving.
    Sequencing,
    /// Completion marker observed. Terminal.
    Finished,
}

/// Observed cycle pace over the recent sample window.
#[derive(Clone, Copy, Debug)]
struct CyclePace {
    /// Cycles per second, index cycles included.
    rate: f64,
    /// Mean cycles advanced per poll step.
    stride: f64,
}

/// Immutable view of one tracker, safe to hand to other tasks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub instrument_id: String,
    pub state: RunState,
    pub cancelled: bool,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub basecount: u64,
    pub rate: f64,
    pub synthetic: bool,
}

/// Progress state for one run.
pub struct RunTracker {
    run_id: RunId,
    source: Box<dyn RunDataSource>,
    profile: InstrumentProfile,

    reads: Vec<ReadSegment>,
    total_cycles: u32,
    current_cycle: u32,
    /// Cumulative data-cycle count indexed by cycle; length `total + 1`.
    data_cycles: Vec<u32>,
    /// Whether each cycle index starts a read; length `total + 1`.
    first_of_read: Vec<bool>,

    /// First-observed arrival time per cycle number. Append-only.
    cycle_times: BTreeMap<u32, Instant>,
    /// Last non-unknown cluster estimate. Sticky across read failures.
    cluster_estimate: Option<f64>,
    /// Bases accounted for by completed cycles at the current estimate.
    booked: f64,

    started_at: Instant,
    updated_at: Instant,

    finished: bool,
    cancelled: bool,
    committed: bool,
    seeded_cancelled: bool,
    synthetic: bool,
}

impl RunTracker {
    /// Creates a tracker for a newly discovered run.
    ///
    /// `seeded_cancelled` carries the persisted stall flag across restarts
    /// so a stalled run does not briefly report healthy while samples are
    /// still being re-collected.
    pub fn new(
        run_id: RunId,
        source: Box<dyn RunDataSource>,
        profile: InstrumentProfile,
        seeded_cancelled: bool,
        synthetic: bool,
        now: Instant,
    ) -> Self {
        Self {
            run_id,
            source,
            profile,
            reads: Vec::new(),
            total_cycles: 0,
            current_cycle: 0,
            data_cycles: vec![0],
            first_of_read: vec![false],
            cycle_times: BTreeMap::new(),
            cluster_estimate: None,
            booked: 0.0,
            started_at: now,
            updated_at: now,
            finished: false,
            cancelled: seeded_cancelled,
            committed: false,
            seeded_cancelled,
            synthetic,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        if self.finished {
            RunState::Finished
        } else if self.reads.is_empty() {
            RunState::Waiting
        } else {
            RunState::Sequencing
        }
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    /// Marks this run's contribution as folded into the cumulative counter.
    /// Set-once; repeated calls are no-ops.
    pub fn mark_committed(&mut self) {
        self.committed = true;
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    /// Advances the tracker by one poll pass.
    ///
    /// Returns true when anything observable changed (drives downstream
    /// notification). No-op once finished.
    pub fn update(&mut self, now: Instant) -> bool {
        if self.finished {
            return false;
        }

        let mut changed = false;
        let mut metadata_loaded = false;

        if self.reads.is_empty() {
            match self.source.metadata() {
                Some(meta) if !meta.reads.is_empty() => {
                    self.install_layout(meta.reads);
                    debug!(
                        run = %self.run_id,
                        total_cycles = self.total_cycles,
                        "run metadata available"
                    );
                    changed = true;
                    metadata_loaded = true;
                }
                _ => {
                    // Not started yet. Keep the start time current so
                    // elapsed-time heuristics measure from first metadata,
                    // not from directory creation.
                    self.started_at = now;
                    return false;
                }
            }
        }

        // Advance the cycle counter past every cycle with output present.
        let mut cycle = self.current_cycle;
        while cycle < self.total_cycles && self.source.cycle_complete(cycle) {
            cycle += 1;
        }
        if cycle != self.current_cycle {
            debug!(run = %self.run_id, from = self.current_cycle, to = cycle, "cycle advanced");
            self.current_cycle = cycle;
            changed = true;
        }
        self.cycle_times.entry(self.current_cycle).or_insert(now);

        // Cluster estimate is sticky: an unreadable source keeps the
        // previous value rather than regressing to unknown.
        if let Some(clusters) = self.source.cluster_count() {
            if self.cluster_estimate != Some(clusters) {
                self.cluster_estimate = Some(clusters);
                changed = true;
            }
        }
        self.booked = match self.cluster_estimate {
            Some(clusters) => f64::from(self.current_cycle) * clusters,
            None => 0.0,
        };

        if self.source.run_complete() {
            debug!(run = %self.run_id, cycle = self.current_cycle, "run finished");
            self.finished = true;
            return true;
        }

        let cancelled = self.evaluate_cancelled(now);
        if cancelled != self.cancelled {
            debug!(run = %self.run_id, cancelled, "stall flag changed");
            self.cancelled = cancelled;
            changed = true;
        }

        let cluster_nonzero = self.cluster_estimate.is_some_and(|c| c != 0.0);
        if changed && (cluster_nonzero || metadata_loaded) {
            self.updated_at = now;
        }
        changed
    }

    /// Estimated output in bases per second.
    ///
    /// Zero for finished or stalled runs. With enough arrival samples and a
    /// known cluster count this is pace-based, scaled by the fraction of
    /// upcoming cycles that produce counted bases; otherwise it falls back
    /// to the instrument's nominal rate once any cycle has completed.
    pub fn rate(&self) -> f64 {
        if self.finished || self.cancelled {
            return 0.0;
        }
        if self.cycle_times.len() >= MIN_PACE_SAMPLES {
            if let (Some(pace), Some(clusters)) = (self.cycle_pace(), self.cluster_estimate) {
                let next_cycle =
                    (self.current_cycle + pace.stride.round() as u32).min(self.total_cycles);
                let data_delta = self.data_cycles[next_cycle as usize]
                    - self.data_cycles[self.current_cycle as usize];
                let data_fraction = f64::from(data_delta) / pace.stride;
                return clusters * pace.rate * data_fraction;
            }
        }
        if !self.cycle_times.is_empty() && self.current_cycle != 0 {
            return self.profile.nominal_rate;
        }
        0.0
    }

    /// Instantaneous base-count estimate at `now`.
    ///
    /// Early in a run the last-update time is not yet a meaningful anchor,
    /// so extrapolation starts from the tracker's start time instead.
    pub fn basecount(&self, now: Instant) -> f64 {
        let samples = self.cycle_times.len();
        if samples >= 4 || self.current_cycle > ESTABLISHED_CYCLE {
            self.booked + self.rate() * now.duration_since(self.updated_at).as_secs_f64()
        } else if samples >= 1 {
            self.rate() * now.duration_since(self.started_at).as_secs_f64()
        } else {
            0.0
        }
    }

    /// Immutable view for event payloads and report endpoints.
    pub fn snapshot(&self, now: Instant) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.as_str().to_string(),
            instrument_id: self.run_id.instrument_id().to_string(),
            state: self.state(),
            cancelled: self.cancelled,
            current_cycle: self.current_cycle,
            total_cycles: self.total_cycles,
            basecount: self.basecount(now).max(0.0).round() as u64,
            rate: self.rate(),
            synthetic: self.synthetic,
        }
    }

    fn install_layout(&mut self, reads: Vec<ReadSegment>) {
        let total: u32 = reads.iter().map(|r| r.cycles).sum();
        let mut data_cycles = Vec::with_capacity(total as usize + 1);
        let mut first_of_read = vec![false; total as usize + 1];
        data_cycles.push(0);
        let mut boundary = 0usize;
        for read in &reads {
            first_of_read[boundary] = true;
            let base = *data_cycles.last().unwrap_or(&0);
            for step in 1..=read.cycles {
                data_cycles.push(if read.is_index { base } else { base + step });
            }
            boundary += read.cycles as usize;
        }
        self.reads = reads;
        self.total_cycles = total;
        self.data_cycles = data_cycles;
        self.first_of_read = first_of_read;
    }

    /// Re-evaluates the stall heuristic. Advisory only, never fatal.
    fn evaluate_cancelled(&self, now: Instant) -> bool {
        // Trust the persisted flag until enough fresh samples exist to
        // re-derive it.
        if self.cycle_times.len() < 2 && self.seeded_cancelled {
            return true;
        }
        let Some(last_arrival) = self.cycle_times.get(&self.current_cycle) else {
            return self.cancelled;
        };
        let elapsed = now.duration_since(*last_arrival);
        if elapsed > STALL_CEILING {
            return true;
        }
        if self.cycle_times.len() >= MIN_PACE_SAMPLES {
            if let Some(pace) = self.cycle_pace() {
                let slack = if self.first_of_read[self.current_cycle as usize] {
                    f64::from(self.profile.first_cycle_slack)
                } else {
                    0.0
                };
                let threshold = (STALL_FACTOR + slack) * (pace.stride / pace.rate);
                return elapsed.as_secs_f64() > threshold;
            }
        }
        false
    }

    /// Pace over the most recent [`PACE_WINDOW`] arrival pairs.
    fn cycle_pace(&self) -> Option<CyclePace> {
        let entries: Vec<(u32, Instant)> =
            self.cycle_times.iter().map(|(c, t)| (*c, *t)).collect();
        if entries.len() < 2 {
            return None;
        }
        let pairs: Vec<(f64, f64)> = entries
            .windows(2)
            .map(|w| {
                let dc = f64::from(w[1].0 - w[0].0);
                let dt = w[1].1.duration_since(w[0].1).as_secs_f64();
                (dc, dt)
            })
            .collect();
        let window = &pairs[pairs.len().saturating_sub(PACE_WINDOW)..];
        let total_cycles: f64 = window.iter().map(|(dc, _)| dc).sum();
        let total_time: f64 = window.iter().map(|(_, dt)| dt).sum();
        if total_time <= 0.0 || total_cycles <= 0.0 {
            return None;
        }
        Some(CyclePace {
            rate: total_cycles / total_time,
            stride: total_cycles / window.len() as f64,
        })
    }
}
