//! On-disk layout of a run directory.
//!
//! Progress is observed purely through sentinel files the instrument writes
//! as it goes:
//!
//! - cycle `k` (0-based) has completed once its basecall output for lane 1
//!   exists, in either the legacy per-cycle directory layout or the
//!   compressed single-file layout;
//! - the run as a whole has completed once the completion marker appears in
//!   the run directory root.
//!
//! Lanes progress in lock-step, so only lane 1 is probed.

use std::path::{Path, PathBuf};

/// Marker file written by the instrument when the run is complete.
pub const COMPLETION_MARKER: &str = "RTAComplete.txt";

/// Lane-1 basecall directory, relative to the run directory.
const LANE1_BASECALLS: &str = "Data/Intensities/BaseCalls/L001";

/// Returns true if the completion marker exists in `run_dir`.
pub fn run_complete(run_dir: &Path) -> bool {
    run_dir.join(COMPLETION_MARKER).exists()
}

/// Returns true if cycle `cycle` (0-based) has produced output.
///
/// Probes the legacy layout first (`C<n>.1` per-cycle directory), then the
/// compressed layout (`<n>.bcl.bgzf`), where `n = cycle + 1`.
pub fn cycle_complete(run_dir: &Path, cycle: u32) -> bool {
    legacy_cycle_path(run_dir, cycle).exists() || compressed_cycle_path(run_dir, cycle).exists()
}

/// Path to the `RunInfo.xml` metadata file.
pub fn run_info_path(run_dir: &Path) -> PathBuf {
    run_dir.join("RunInfo.xml")
}

/// Path to the InterOp tile metrics file.
pub fn tile_metrics_path(run_dir: &Path) -> PathBuf {
    run_dir.join("InterOp").join("TileMetricsOut.bin")
}

fn legacy_cycle_path(run_dir: &Path, cycle: u32) -> PathBuf {
    run_dir
        .join(LANE1_BASECALLS)
        .join(format!("C{}.1", cycle + 1))
}

fn compressed_cycle_path(run_dir: &Path, cycle: u32) -> PathBuf {
    run_dir
        .join(LANE1_BASECALLS)
        .join(format!("{:04}.bcl.bgzf", cycle + 1))
}
