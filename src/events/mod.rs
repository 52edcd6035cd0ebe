//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the scheduler and the
//! adaptive controller.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (task/queue lifecycle), `AdaptiveController`
//!   (proposals, samples), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Scheduler`'s subscriber listener (fans out to
//!   `SubscriberSet`), the controller forwarder installed by
//!   `Scheduler::adopt`, and any direct `Bus::subscribe` receiver.
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
