//! Start command - run the poll loop and the status server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use basewatch::config::ConfigFile;
use basewatch::events::{AdmissionController, EventBus};
use basewatch::registry::{Registry, RegistryDaemon};
use basewatch::server::{self, AppState};

use super::load_config;
use crate::error::CliError;

/// Run the start command.
pub fn run(config_path: Option<&Path>, bind: Option<String>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let _guard = basewatch::logging::init_logging(&config.logging.directory, &config.logging.file)
        .map_err(CliError::Logging)?;
    info!(version = basewatch::VERSION, "basewatch starting");

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(serve(config, bind))
}

async fn serve(config: ConfigFile, bind: Option<String>) -> Result<(), CliError> {
    let shutdown = CancellationToken::new();

    let registry = Registry::open(&config);
    let bus = EventBus::new();
    let (daemon, commands) = RegistryDaemon::new(
        registry,
        bus.clone(),
        Duration::from_secs(config.poll.interval_secs),
        config.poll.keepalive_intervals,
    );
    let status = daemon.snapshot_handle();
    let admission = Arc::new(AdmissionController::new(config.stream.max_sessions));

    let daemon_task = tokio::spawn(daemon.run(shutdown.clone()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    let state = AppState::new(
        bus,
        status,
        Arc::clone(&admission),
        commands,
        config.stream.queue_capacity,
    );
    let bind_addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let result = server::serve(&bind_addr, state, shutdown.clone()).await;

    shutdown.cancel();
    admission.close_all();
    let _ = daemon_task.await;
    result.map_err(Into::into)
}
