//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the command line.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] basewatch::config::ConfigError),

    #[error("failed to set up logging: {0}")]
    Logging(std::io::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Server(#[from] basewatch::server::ServerError),
}
