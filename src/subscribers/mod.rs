//! # Event subscribers for the dagvisor engine.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out and a built-in [`LogWriter`] implementation for handling runtime
//! events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Scheduler ── publish(Event) ──► Bus ──► subscriber listener
//!                                              │
//!                                              ▼
//!                                        SubscriberSet
//!                                    ┌────────┼─────────┐
//!                                    ▼        ▼         ▼
//!                                LogWriter  Monitor   Custom ...
//! ```
//!
//! Subscribers are the seam where external collaborators attach: a dashboard
//! pushing JSON over a socket, a metrics exporter, or a transport adapter
//! relaying results — all of them are just [`Subscribe`] implementations and
//! stay outside the engine core.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
