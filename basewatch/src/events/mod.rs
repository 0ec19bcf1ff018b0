//! Event distribution: typed status events, fan-out, client sessions.
//!
//! The poll loop publishes [`StatusEvent`]s onto the [`EventBus`]; each
//! subscribed [`StreamSession`] receives tagged copies through its own
//! bounded queue and drains them to one client. The
//! [`AdmissionController`] bounds how many sessions are live at once.
//!
//! Nothing in this module reads registry state directly: sessions see only
//! the immutable snapshots carried inside events, plus the shared
//! [`StatusSnapshot`] handle the poll loop refreshes after each pass.

mod admission;
mod bus;
mod event;
mod session;

pub use admission::AdmissionController;
pub use bus::EventBus;
pub use event::{CounterSnapshot, EventKind, Frame, RunSetSnapshot, StatusEvent, StatusSnapshot};
pub use session::{SessionHandle, StreamSession};
