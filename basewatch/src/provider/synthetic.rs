//! Scripted data source for synthetic runs.
//!
//! Synthetic runs exist for exercising the tracking and streaming stack
//! without touching real run directories. The source plays a fixed script:
//! one cycle completes per configured interval from the moment the run is
//! inserted, and the completion sentinel appears one interval after the
//! last cycle.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{ReadSegment, RunDataSource, RunMetadata};

fn default_cycle_seconds() -> f64 {
    10.0
}

/// Script for a synthetic run, as accepted by the admin endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SyntheticSpec {
    /// Template (data) cycles.
    pub cycles: u32,
    /// Trailing index cycles, if any.
    #[serde(default)]
    pub index_cycles: u32,
    /// Fixed cluster-count estimate.
    pub cluster_count: f64,
    /// Seconds per scripted cycle.
    #[serde(default = "default_cycle_seconds")]
    pub cycle_seconds: f64,
}

/// Data source that plays a [`SyntheticSpec`].
pub struct SyntheticSource {
    spec: SyntheticSpec,
    started: Instant,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec, now: Instant) -> Self {
        Self { spec, started: now }
    }

    fn total_cycles(&self) -> u32 {
        self.spec.cycles + self.spec.index_cycles
    }

    fn cycles_elapsed(&self) -> f64 {
        if self.spec.cycle_seconds <= 0.0 {
            return f64::from(self.total_cycles()) + 2.0;
        }
        self.started.elapsed().as_secs_f64() / self.spec.cycle_seconds
    }
}

impl RunDataSource for SyntheticSource {
    fn metadata(&self) -> Option<RunMetadata> {
        let mut reads = vec![ReadSegment {
            cycles: self.spec.cycles,
            is_index: false,
        }];
        if self.spec.index_cycles > 0 {
            reads.push(ReadSegment {
                cycles: self.spec.index_cycles,
                is_index: true,
            });
        }
        Some(RunMetadata { reads })
    }

    fn cluster_count(&self) -> Option<f64> {
        Some(self.spec.cluster_count)
    }

    fn cycle_complete(&self, cycle: u32) -> bool {
        cycle < self.total_cycles() && self.cycles_elapsed() >= f64::from(cycle + 1)
    }

    fn run_complete(&self) -> bool {
        self.cycles_elapsed() >= f64::from(self.total_cycles() + 1)
    }
}
