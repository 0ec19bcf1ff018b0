//! Configuration file loading.
//!
//! Loads `config.ini`, starting from defaults and overlaying any values
//! found in the file. A missing file is not an error; a present but
//! invalid value is.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigFile {
    /// Load configuration from the default path
    /// (`~/.basewatch/config.ini`), falling back to defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }
}

/// Path to the config directory (`~/.basewatch`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".basewatch")
}

/// Path to the config file (`~/.basewatch/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = section.get("roots") {
            let roots: Vec<PathBuf> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(expand_tilde)
                .collect();
            if roots.is_empty() {
                return Err(ConfigError::InvalidValue {
                    section: "storage",
                    key: "roots",
                    value: v.to_string(),
                    reason: "expected a comma-separated list of directories",
                });
            }
            config.storage.roots = roots;
        }
    }

    if let Some(section) = ini.section(Some("state")) {
        if let Some(v) = section.get("directory") {
            config.state.directory = expand_tilde(v.trim());
        }
    }

    if let Some(section) = ini.section(Some("poll")) {
        if let Some(v) = section.get("interval_secs") {
            config.poll.interval_secs = parse_positive(v, "poll", "interval_secs")?;
        }
        if let Some(v) = section.get("keepalive_intervals") {
            config.poll.keepalive_intervals =
                parse_positive(v, "poll", "keepalive_intervals")? as u32;
        }
    }

    if let Some(section) = ini.section(Some("stream")) {
        if let Some(v) = section.get("queue_capacity") {
            config.stream.queue_capacity = parse_positive(v, "stream", "queue_capacity")? as usize;
        }
        if let Some(v) = section.get("max_sessions") {
            config.stream.max_sessions = parse_positive(v, "stream", "max_sessions")? as usize;
        }
    }

    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("bind") {
            config.server.bind = v.trim().to_string();
        }
    }

    if let Some(section) = ini.section(Some("novaseq")) {
        if let Some(v) = section.get("cluster_helper") {
            let v = v.trim();
            if !v.is_empty() {
                config.novaseq.cluster_helper = Some(expand_tilde(v));
            }
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            config.logging.directory = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("file") {
            config.logging.file = v.trim().to_string();
        }
    }

    Ok(config)
}

fn parse_positive(
    value: &str,
    section: &'static str,
    key: &'static str,
) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            section,
            key,
            value: value.to_string(),
            reason: "must be a positive integer",
        }),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&tmp.path().join("nope.ini")).unwrap();
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.stream.max_sessions, 32);
        assert_eq!(config.server.bind, "0.0.0.0:5001");
        assert!(config.novaseq.cluster_helper.is_none());
    }

    #[test]
    fn overlays_values_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.ini");
        std::fs::write(
            &path,
            "[storage]\n\
             roots = /data/seq1, /data/seq2\n\
             [poll]\n\
             interval_secs = 30\n\
             [stream]\n\
             max_sessions = 4\n\
             [novaseq]\n\
             cluster_helper = /usr/lib/basewatch/novaseq-clusters\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(
            config.storage.roots,
            vec![PathBuf::from("/data/seq1"), PathBuf::from("/data/seq2")]
        );
        assert_eq!(config.poll.interval_secs, 30);
        assert_eq!(config.stream.max_sessions, 4);
        assert_eq!(
            config.novaseq.cluster_helper.as_deref(),
            Some(Path::new("/usr/lib/basewatch/novaseq-clusters"))
        );
        // Untouched sections keep defaults.
        assert_eq!(config.stream.queue_capacity, 64);
    }

    #[test]
    fn rejects_non_positive_intervals() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.ini");
        std::fs::write(&path, "[poll]\ninterval_secs = 0\n").unwrap();
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { section: "poll", .. })
        ));
    }
}
