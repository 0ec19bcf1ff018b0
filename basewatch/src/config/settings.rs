//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These
//! are pure data types; parsing lives in [`super::file`].

use std::path::PathBuf;

/// Complete service configuration loaded from config.ini.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// Storage roots scanned for run directories.
    pub storage: StorageSettings,
    /// Persisted state location.
    pub state: StateSettings,
    /// Poll loop timing.
    pub poll: PollSettings,
    /// Client stream limits.
    pub stream: StreamSettings,
    /// HTTP listener.
    pub server: ServerSettings,
    /// NovaSeq cluster-count helper.
    pub novaseq: NovaSeqSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Directories scanned for run directories, comma-separated in the
    /// config file.
    pub roots: Vec<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("/data/runScratch")],
        }
    }
}

/// Persisted state configuration.
#[derive(Debug, Clone)]
pub struct StateSettings {
    /// Directory holding the counter and run-id files.
    pub directory: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("/var/lib/basewatch"),
        }
    }
}

/// Poll loop configuration.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Seconds between poll passes.
    pub interval_secs: u64,
    /// Poll intervals without a counter publish before a keepalive
    /// republish is forced.
    pub keepalive_intervals: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            keepalive_intervals: 4,
        }
    }
}

/// Client stream configuration.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Bounded per-session queue capacity.
    pub queue_capacity: usize,
    /// Maximum concurrently live sessions.
    pub max_sessions: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_sessions: 32,
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind address, e.g. `0.0.0.0:5001`.
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5001".to_string(),
        }
    }
}

/// NovaSeq helper configuration.
#[derive(Debug, Clone, Default)]
pub struct NovaSeqSettings {
    /// Path to the external cluster-count helper executable. When unset,
    /// NovaSeq runs report no cluster estimate.
    pub cluster_helper: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Directory for log files.
    pub directory: PathBuf,
    /// Log file name.
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file: "basewatch.log".to_string(),
        }
    }
}
