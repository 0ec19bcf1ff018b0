//! Run registry: discovery, bookkeeping, and the poll daemon.
//!
//! The [`Registry`] owns every [`RunTracker`](crate::run::RunTracker), the
//! persisted cumulative base counter, and the two idempotency sets (booked
//! and cancelled run ids). The [`RegistryDaemon`] wraps it in the
//! fixed-interval poll loop that is the single writer of all of this
//! state; everything downstream observes it through the
//! [`EventBus`](crate::events::EventBus) and the shared status snapshot.

mod daemon;
mod registry;
mod store;

pub use daemon::{RegistryCommand, RegistryDaemon, SharedStatus};
pub use registry::{PollOutcome, Registry, SyntheticError};
pub use store::StateStore;
