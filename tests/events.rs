//! Event-plane behaviour: sequence ordering, bus fan-out and receiver
//! accounting.

use dagvisor::{Bus, Event, EventKind};

#[test]
fn sequence_numbers_increase_monotonically() {
    let a = Event::now(EventKind::TaskStarted).with_task("a");
    let b = Event::now(EventKind::TaskCompleted).with_task("a");
    let c = Event::now(EventKind::TaskStarted).with_task("b");

    assert!(a.seq < b.seq);
    assert!(b.seq < c.seq);
}

#[tokio::test]
async fn every_receiver_sees_its_own_copy() {
    let bus = Bus::new(8);
    let mut one = bus.subscribe();
    let mut two = bus.subscribe();

    bus.publish(Event::now(EventKind::Paused));

    assert_eq!(one.recv().await.unwrap().kind, EventKind::Paused);
    assert_eq!(two.recv().await.unwrap().kind, EventKind::Paused);
}

#[tokio::test]
async fn receivers_only_see_events_after_subscribing() {
    let bus = Bus::new(8);
    bus.publish(Event::now(EventKind::Paused));

    let mut late = bus.subscribe();
    bus.publish(Event::now(EventKind::Resumed));

    assert_eq!(late.recv().await.unwrap().kind, EventKind::Resumed);
    assert!(late.try_recv().is_err());
}

#[tokio::test]
async fn subscriber_count_tracks_attached_receivers() {
    let bus = Bus::new(8);
    assert_eq!(bus.subscriber_count(), 0);

    let rx = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);

    // Publishing into the void is fine; the event is dropped silently.
    drop(rx);
    bus.publish(Event::now(EventKind::Stopped));
    assert_eq!(bus.subscriber_count(), 0);
}
