//! Minimal InterOp tile-metrics reader.
//!
//! `InterOp/TileMetricsOut.bin` (format version 2) is a flat record stream:
//! a one-byte version, a one-byte record size, then fixed-size records of
//! `lane: u16, tile: u16, code: u16, value: f32`, all little-endian. The
//! cluster count passing filter is metric code 103, one record per tile;
//! the run-wide count is the sum over all tiles.
//!
//! Only the fields needed for the cluster estimate are decoded. Anything
//! unexpected (other versions, short files, truncated trailing records)
//! yields `None` so the caller keeps its previous sticky estimate.

use std::io;
use std::path::Path;

const SUPPORTED_VERSION: u8 = 2;
const MIN_RECORD_SIZE: usize = 10;

/// Metric code for the per-tile cluster count passing filter.
const CLUSTER_COUNT_PF: u16 = 103;

/// Sum the pass-filter cluster counts over all tiles in a tile-metrics
/// file.
///
/// Returns `Ok(None)` when the file exists but holds no usable records
/// (unsupported version, no code-103 records yet).
pub fn read_pf_cluster_count(path: &Path) -> io::Result<Option<f64>> {
    let bytes = std::fs::read(path)?;
    Ok(sum_pf_clusters(&bytes))
}

fn sum_pf_clusters(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 2 || bytes[0] != SUPPORTED_VERSION {
        return None;
    }
    let record_size = bytes[1] as usize;
    if record_size < MIN_RECORD_SIZE {
        return None;
    }

    let mut total = 0.0f64;
    let mut seen = false;
    for record in bytes[2..].chunks_exact(record_size) {
        let code = u16::from_le_bytes([record[4], record[5]]);
        if code != CLUSTER_COUNT_PF {
            continue;
        }
        let value = f32::from_le_bytes([record[6], record[7], record[8], record[9]]);
        if value.is_finite() {
            total += f64::from(value);
            seen = true;
        }
    }
    seen.then_some(total)
}
