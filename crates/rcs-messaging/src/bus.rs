//! ---
//! rcs_section: "02-messaging-event-model"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Event schema and notification channel."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::Event;

/// Capacity of the broadcast ring used for asynchronous subscribers.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

type Listener = Box<dyn FnMut(&Event) + Send>;

/// Receiving half handed to asynchronous consumers.
pub type EventReceiver = broadcast::Receiver<Event>;

/// Handle returned by [`EventBus::add_listener`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Append-only event log with ordered synchronous listeners.
///
/// Listeners run inline on [`EventBus::publish`], in registration order.
/// Broadcast subscribers receive a clone of every event; a receiver that falls
/// behind loses the oldest events without affecting the log or the listeners.
pub struct EventBus {
    log: Vec<Event>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.log.len())
            .field("listeners", &self.listeners.len())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus with the default broadcast capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create an empty bus whose broadcast ring holds `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            log: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            sender,
        }
    }

    /// Append an event, notify listeners, then broadcast it.
    pub fn publish(&mut self, event: Event) {
        trace!(kind = %event.kind, timestamp = event.timestamp, "event published");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        // No live receivers is not an error for the log.
        let _ = self.sender.send(event.clone());
        self.log.push(event);
    }

    /// Drop the log while keeping listeners and subscribers attached.
    pub fn clear(&mut self) {
        self.log.clear();
    }

    /// Register a synchronous listener.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Deregister a listener. Returns `false` when the id is unknown.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Events recorded since the bus was created or last cleared.
    pub fn events(&self) -> &[Event] {
        &self.log
    }

    /// Number of registered synchronous listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::types::EventKind;

    fn event(kind: EventKind, minute: u64) -> Event {
        Event::new(kind, minute, kind.to_string())
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.add_listener(move |_| seen.lock().unwrap().push(tag));
        }

        bus.publish(event(EventKind::SimulationStarted, 0));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let mut bus = EventBus::new();
        let hits = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&hits);
        let id = bus.add_listener(move |_| *counter.lock().unwrap() += 1);

        bus.publish(event(EventKind::SimulationStarted, 0));
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
        bus.publish(event(EventKind::SimulationPaused, 1));

        assert_eq!(*hits.lock().unwrap(), 1);
        assert_eq!(bus.events().len(), 2);
    }

    #[test]
    fn clear_keeps_listeners_attached() {
        let mut bus = EventBus::new();
        bus.add_listener(|_| {});
        bus.publish(event(EventKind::SimulationStarted, 0));
        bus.clear();
        assert!(bus.events().is_empty());
        assert_eq!(bus.listener_count(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let mut bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(event(EventKind::TrainDeparted, 7).with_train("F2"));

        let received = rx.recv().await.expect("event delivered");
        assert_eq!(received.kind, EventKind::TrainDeparted);
        assert_eq!(received.train_id.as_deref(), Some("F2"));
    }

    #[test]
    fn publish_without_subscribers_still_logs() {
        let mut bus = EventBus::with_capacity(1);
        bus.publish(event(EventKind::SpeedChanged, 3));
        bus.publish(event(EventKind::SpeedChanged, 4));
        let minutes: Vec<u64> = bus.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(minutes, vec![3, 4]);
    }
}
