//! External cluster-count helper.
//!
//! NovaSeq InterOp files need the vendor summary library to aggregate, so
//! that instrument class delegates to an isolated helper executable: it is
//! invoked with the run directory as its single argument and prints one
//! number on stdout. Any failure (missing binary, non-zero exit, garbage
//! output) is non-fatal and reported as `None`.

use std::path::Path;
use std::process::Command;

use tracing::debug;

/// Run the helper and parse its stdout as a cluster count.
pub fn query_cluster_count(helper: &Path, run_dir: &Path) -> Option<f64> {
    let output = match Command::new(helper).arg(run_dir).output() {
        Ok(output) => output,
        Err(err) => {
            debug!(helper = %helper.display(), %err, "cluster helper failed to start");
            return None;
        }
    };
    if !output.status.success() {
        debug!(
            helper = %helper.display(),
            status = %output.status,
            "cluster helper exited with failure"
        );
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.trim().parse::<f64>() {
        Ok(count) if count.is_finite() && count >= 0.0 => Some(count),
        _ => {
            debug!(
                helper = %helper.display(),
                output = %stdout.trim(),
                "cluster helper produced unparseable output"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn write_script(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("helper.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn parses_single_number_output() {
        let tmp = tempfile::tempdir().unwrap();
        let helper = write_script(tmp.path(), "echo 2915467228.0");
        assert_eq!(
            query_cluster_count(&helper, tmp.path()),
            Some(2_915_467_228.0)
        );
    }

    #[cfg(unix)]
    #[test]
    fn failure_exit_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        let helper = write_script(tmp.path(), "exit 1");
        assert_eq!(query_cluster_count(&helper, tmp.path()), None);
    }

    #[test]
    fn missing_binary_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        let helper = tmp.path().join("does-not-exist");
        assert_eq!(query_cluster_count(&helper, tmp.path()), None);
    }
}
