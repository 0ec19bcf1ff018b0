//! Persisted registry state.
//!
//! Three files in one state directory, all rewritten in full on save:
//!
//! - `basecount.txt` - the cumulative counter, as decimal text
//! - `booked.txt` - newline-delimited ids of runs already counted
//! - `cancelled.txt` - newline-delimited ids of runs flagged as stalled
//!
//! There is no cross-file transaction; each file stands alone. A missing
//! or unreadable file loads as zero/empty, which is always safe: the
//! booked set is additionally intersected with the live run set after the
//! first discovery pass to bound staleness from a prior crash.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

const COUNTER_FILE: &str = "basecount.txt";
const BOOKED_FILE: &str = "booked.txt";
const CANCELLED_FILE: &str = "cancelled.txt";

/// File-backed store for the registry's persisted state.
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn load_counter(&self) -> u64 {
        let path = self.dir.join(COUNTER_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => match text.trim().parse() {
                Ok(value) => value,
                Err(_) => {
                    warn!(path = %path.display(), "counter file unparseable, starting at zero");
                    0
                }
            },
            Err(_) => 0,
        }
    }

    pub fn save_counter(&self, value: u64) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(COUNTER_FILE), format!("{value}\n"))
    }

    pub fn load_booked(&self) -> BTreeSet<String> {
        self.load_ids(BOOKED_FILE)
    }

    pub fn save_booked(&self, ids: &BTreeSet<String>) -> io::Result<()> {
        self.save_ids(BOOKED_FILE, ids)
    }

    pub fn load_cancelled(&self) -> BTreeSet<String> {
        self.load_ids(CANCELLED_FILE)
    }

    pub fn save_cancelled(&self, ids: &BTreeSet<String>) -> io::Result<()> {
        self.save_ids(CANCELLED_FILE, ids)
    }

    fn load_ids(&self, file: &str) -> BTreeSet<String> {
        match std::fs::read_to_string(self.dir.join(file)) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    fn save_ids(&self, file: &str, ids: &BTreeSet<String>) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut text = String::new();
        for id in ids {
            text.push_str(id);
            text.push('\n');
        }
        std::fs::write(self.dir.join(file), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_load_as_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(&tmp.path().join("state"));
        assert_eq!(store.load_counter(), 0);
        assert!(store.load_booked().is_empty());
        assert!(store.load_cancelled().is_empty());
    }

    #[test]
    fn counter_round_trips_as_decimal_text() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        store.save_counter(18_446_744_073_709_551_615).unwrap();
        assert_eq!(store.load_counter(), u64::MAX);

        let text = std::fs::read_to_string(tmp.path().join("basecount.txt")).unwrap();
        assert_eq!(text, "18446744073709551615\n");
    }

    #[test]
    fn garbage_counter_loads_as_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());
        std::fs::write(tmp.path().join("basecount.txt"), "not a number").unwrap();
        assert_eq!(store.load_counter(), 0);
    }

    #[test]
    fn id_files_are_newline_lists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::new(tmp.path());

        let ids: BTreeSet<String> = ["a_run", "b_run"].iter().map(|s| s.to_string()).collect();
        store.save_booked(&ids).unwrap();
        assert_eq!(store.load_booked(), ids);

        // Blank lines are tolerated.
        std::fs::write(tmp.path().join("cancelled.txt"), "x\n\n y \n").unwrap();
        let loaded = store.load_cancelled();
        assert!(loaded.contains("x"));
        assert!(loaded.contains("y"));
        assert_eq!(loaded.len(), 2);
    }
}
