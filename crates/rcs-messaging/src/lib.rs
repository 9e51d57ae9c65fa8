//! ---
//! rcs_section: "02-messaging-event-model"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Event schema and notification channel."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Event primitives for the RCS workspace.
//!
//! The engine appends every notable state transition to an [`EventBus`]. The
//! bus keeps the full log for the current run, calls synchronous listeners in
//! registration order, and fans each event out to broadcast subscribers.

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventReceiver, ListenerId, DEFAULT_BROADCAST_CAPACITY};
pub use types::{Event, EventKind};
