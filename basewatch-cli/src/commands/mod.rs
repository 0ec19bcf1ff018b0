//! CLI command implementations.
//!
//! - [`start`] - run the poll loop and the status server
//! - [`check`] - one-shot poll pass with a printed summary

pub mod check;
pub mod start;

use std::path::Path;

use basewatch::config::ConfigFile;

use crate::error::CliError;

/// Loads configuration from the given path, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}
