//! Run data sources.
//!
//! A [`RunDataSource`] supplies everything the tracker observes about one
//! run: the read layout, the latest cluster-count estimate, and the cycle
//! and completion sentinels. There are two implementations:
//!
//! - [`RealRunSource`] - backed by the run directory on disk, with the
//!   cluster-count strategy chosen by instrument class
//! - [`SyntheticSource`] - a scripted source for test runs that are not
//!   backed by any directory
//!
//! Tracker logic is identical for both; only the data source differs.
//! Sources may be transiently unavailable: metadata and cluster counts
//! return `None` until readable, and the caller retries on the next poll.

mod helper;
mod interop;
mod real;
mod runinfo;
mod synthetic;

pub use real::RealRunSource;
pub use synthetic::{SyntheticSource, SyntheticSpec};

use std::path::Path;

use crate::run::RunId;

/// One read segment of a run: a stretch of cycles that is either template
/// data or an index read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadSegment {
    /// Number of cycles in this read.
    pub cycles: u32,
    /// True for index (barcode) reads, which produce no counted bases.
    pub is_index: bool,
}

/// Per-run metadata, available once the instrument has written it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunMetadata {
    /// Ordered read segments of the run.
    pub reads: Vec<ReadSegment>,
}

impl RunMetadata {
    /// Total cycle count across all reads.
    pub fn total_cycles(&self) -> u32 {
        self.reads.iter().map(|r| r.cycles).sum()
    }
}

/// Source of observations for one run.
///
/// All methods are cheap probes except [`cluster_count`](Self::cluster_count),
/// which may be slow (file parse or helper process); the poll loop is the
/// only caller and tolerates that.
pub trait RunDataSource: Send {
    /// Read layout for the run, or `None` while not yet available.
    fn metadata(&self) -> Option<RunMetadata>;

    /// Latest cluster-count estimate, or `None` if currently unreadable.
    fn cluster_count(&self) -> Option<f64>;

    /// Whether cycle `cycle` (0-based) has produced output.
    fn cycle_complete(&self, cycle: u32) -> bool;

    /// Whether the run's completion sentinel is present.
    fn run_complete(&self) -> bool;
}

/// Builds the real data source for a run directory.
///
/// The cluster-count strategy is selected by the run's instrument class;
/// NovaSeq runs delegate to the external helper at `novaseq_helper` when
/// one is configured.
pub fn source_for(
    run_id: &RunId,
    run_dir: &Path,
    novaseq_helper: Option<&Path>,
) -> RealRunSource {
    RealRunSource::new(run_dir, run_id.instrument_class(), novaseq_helper)
}
