//! Run identity, on-disk layout, and per-run progress tracking.
//!
//! A "run" is one sequencing job writing output incrementally into a
//! directory under a storage root. This module owns everything that is
//! per-run: the naming convention ([`RunId`]), the sentinel-file layout
//! ([`layout`]), and the progress state machine ([`RunTracker`]).

mod id;
pub mod layout;
mod tracker;

pub use id::RunId;
pub use tracker::{RunSnapshot, RunState, RunTracker};
