//! # Broadcast channel between the engine and its observers.
//!
//! Every component that emits events — the scheduler's control surface, the
//! settlement path, the adaptive controller's sampling loop — publishes into
//! a [`Bus`]; every consumer (direct receivers, the subscriber fan-out
//! listener, the forwarder installed by `Scheduler::adopt`) pulls from its
//! own receiver.
//!
//! Delivery is fan-out over [`tokio::sync::broadcast`]: each receiver sees
//! its own clone of every event published after it subscribed. Nothing is
//! persisted; with no receivers attached a published event is simply
//! dropped, and a receiver that falls more than the ring-buffer capacity
//! behind skips the overwritten events (`Lagged`). Publishing therefore
//! never blocks the engine, whatever its observers are doing.

use tokio::sync::broadcast;

use super::event::Event;

/// Lossy fan-out channel for [`Event`]s.
///
/// Cloning a `Bus` clones the sending side only; each consumer creates its
/// own receiver via [`Bus::subscribe`].
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus whose ring buffer holds `capacity` events.
    ///
    /// A zero capacity is raised to 1, the smallest buffer the underlying
    /// channel accepts. Receivers that lag further than `capacity` behind
    /// lose the overwritten events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes one event to every currently attached receiver.
    ///
    /// Never blocks. With no receivers attached the event is dropped — the
    /// engine stays fully operable without observers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that sees every event published from now on.
    ///
    /// Events published before the call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    ///
    /// Counts the engine's own listeners (subscriber fan-out, controller
    /// forwarders) as well as external observers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
