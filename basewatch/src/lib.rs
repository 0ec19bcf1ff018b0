//! Basewatch - live progress tracking for sequencing runs
//!
//! This library watches configured storage roots for active sequencing run
//! directories, models the progress of each run (cycles, cluster counts,
//! completion, stalls), maintains a persistent cumulative base counter, and
//! fans out status changes to subscribed clients over bounded push channels.
//!
//! # High-Level API
//!
//! Most deployments wire the pieces together like this:
//!
//! ```ignore
//! use basewatch::config::ConfigFile;
//! use basewatch::events::{AdmissionController, EventBus};
//! use basewatch::registry::{Registry, RegistryDaemon};
//!
//! let config = ConfigFile::load_from(path)?;
//! let registry = Registry::open(&config);
//! let bus = EventBus::new();
//! let (daemon, commands) = RegistryDaemon::new(
//!     registry,
//!     bus.clone(),
//!     Duration::from_secs(config.poll.interval_secs),
//!     config.poll.keepalive_intervals,
//! );
//! let snapshot = daemon.snapshot_handle();
//!
//! tokio::spawn(daemon.run(shutdown.clone()));
//! // hand bus/snapshot/commands to basewatch::server::serve(...)
//! ```

pub mod config;
pub mod events;
pub mod instrument;
pub mod logging;
pub mod provider;
pub mod registry;
pub mod run;
pub mod server;

/// Version of the basewatch library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
