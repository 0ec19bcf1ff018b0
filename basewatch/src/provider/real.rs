//! Directory-backed run data source.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::{helper, interop, runinfo, RunDataSource, RunMetadata};
use crate::instrument::InstrumentClass;
use crate::run::layout;

/// Data source backed by a real run directory.
///
/// Metadata comes from `RunInfo.xml`, progress from the per-cycle and
/// completion sentinels, and the cluster count from InterOp tile metrics -
/// except on NovaSeq, where the vendor format requires the external helper.
pub struct RealRunSource {
    run_dir: PathBuf,
    class: InstrumentClass,
    novaseq_helper: Option<PathBuf>,
}

impl RealRunSource {
    pub fn new(run_dir: &Path, class: InstrumentClass, novaseq_helper: Option<&Path>) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
            class,
            novaseq_helper: novaseq_helper.map(Path::to_path_buf),
        }
    }

    /// The directory backing this source.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl RunDataSource for RealRunSource {
    fn metadata(&self) -> Option<RunMetadata> {
        let xml = std::fs::read_to_string(layout::run_info_path(&self.run_dir)).ok()?;
        let reads = runinfo::parse_read_layout(&xml);
        if reads.is_empty() {
            return None;
        }
        Some(RunMetadata { reads })
    }

    fn cluster_count(&self) -> Option<f64> {
        if self.class == InstrumentClass::NovaSeq {
            let helper = self.novaseq_helper.as_deref()?;
            return helper::query_cluster_count(helper, &self.run_dir);
        }
        match interop::read_pf_cluster_count(&layout::tile_metrics_path(&self.run_dir)) {
            Ok(count) => count,
            Err(err) => {
                trace!(run_dir = %self.run_dir.display(), %err, "tile metrics unreadable");
                None
            }
        }
    }

    fn cycle_complete(&self, cycle: u32) -> bool {
        layout::cycle_complete(&self.run_dir, cycle)
    }

    fn run_complete(&self) -> bool {
        layout::run_complete(&self.run_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ReadSegment;
    use std::fs;

    #[test]
    fn metadata_unavailable_until_run_info_written() {
        let tmp = tempfile::tempdir().unwrap();
        let source = RealRunSource::new(tmp.path(), InstrumentClass::MiSeq, None);
        assert!(source.metadata().is_none());

        fs::write(
            layout::run_info_path(tmp.path()),
            r#"<Read Number="1" NumCycles="36" IsIndexedRead="N"/>"#,
        )
        .unwrap();
        let meta = source.metadata().unwrap();
        assert_eq!(meta.reads, vec![ReadSegment { cycles: 36, is_index: false }]);
        assert_eq!(meta.total_cycles(), 36);
    }

    #[test]
    fn novaseq_without_helper_has_no_cluster_count() {
        let tmp = tempfile::tempdir().unwrap();
        let source = RealRunSource::new(tmp.path(), InstrumentClass::NovaSeq, None);
        assert_eq!(source.cluster_count(), None);
    }

    #[test]
    fn missing_tile_metrics_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let source = RealRunSource::new(tmp.path(), InstrumentClass::MiSeq, None);
        assert_eq!(source.cluster_count(), None);
    }
}
