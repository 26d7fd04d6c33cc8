//! # Event Publisher
//!
//! Defines the publishing side of the event bus and the in-memory bus itself.

use crate::events::{DeploymentEvent, EventFilter};
use crate::subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionHandle};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
///
/// Checkers and the reconciler depend on this rather than on a concrete bus
/// so tests can substitute a recording publisher.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: DeploymentEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics,
/// which preserves publish order for every receiver. Each instance is fully
/// isolated; nothing is process-global.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<DeploymentEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events published after this call are received.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(kinds = ?filter.kinds, "[bus] New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Register a handler invoked for every matching event.
    ///
    /// The handler runs on its own task, in publish order. A panic inside the
    /// handler is caught and logged; the handler keeps receiving later events
    /// and other subscribers are unaffected. Must be called from within a
    /// Tokio runtime.
    pub fn subscribe_with<F>(&self, filter: EventFilter, handler: F) -> SubscriptionHandle
    where
        F: Fn(&DeploymentEvent) + Send + Sync + 'static,
    {
        SubscriptionHandle::spawn(self.subscribe(filter), handler)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: DeploymentEvent) -> usize {
        let kind = event.kind();
        let key = event.key();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    kind = ?kind,
                    key = %key,
                    receivers = receiver_count,
                    "[bus] Event published"
                );
                receiver_count
            }
            Err(_) => {
                warn!(kind = ?kind, key = %key, "[bus] Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
