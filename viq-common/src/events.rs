//! Broadcast event bus shared by VaultIQ services
//!
//! Services define their own event enums; the bus only requires them to be
//! cloneable and to report a stable event type name for SSE framing.

use tokio::sync::broadcast;

/// Event that can be framed as a named SSE message
pub trait NamedEvent: Clone + Send + 'static {
    /// Stable event type name (used as the SSE `event:` field)
    fn event_type(&self) -> &'static str;
}

/// Broadcast bus for service events
///
/// Cloning the bus shares the underlying channel.
#[derive(Debug)]
pub struct EventBus<E: Clone> {
    tx: broadcast::Sender<E>,
    capacity: usize,
}

impl<E: Clone> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<E: Clone> EventBus<E> {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///   for slow subscribers
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: E) -> Result<usize, broadcast::error::SendError<E>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: E) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(u32),
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        assert_eq!(bus.emit(TestEvent::Ping(7)).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), TestEvent::Ping(7));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(TestEvent::Ping(1)).is_err());
        // Lossy emit never fails
        bus.emit_lossy(TestEvent::Ping(2));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let bus = EventBus::new(4);
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        clone.emit_lossy(TestEvent::Ping(3));
        assert_eq!(rx.recv().await.unwrap(), TestEvent::Ping(3));
        assert_eq!(clone.capacity(), 4);
        assert_eq!(clone.subscriber_count(), 1);
    }
}
