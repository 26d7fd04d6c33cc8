//! # Event Subscriber
//!
//! Defines the subscription side of the event bus: pull-style
//! [`Subscription`]s, a [`Stream`] adapter, and push-style handler tasks.

use crate::events::{DeploymentEvent, EventFilter};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::{debug, error, warn};

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The event bus was closed.
    #[error("Event bus closed")]
    Closed,

    /// The subscriber fell behind and the oldest events were discarded.
    #[error("Subscriber lagged, {missed} events dropped")]
    Lagged { missed: u64 },
}

/// Trait for subscribing to events from the bus.
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to events matching a filter.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// A subscription handle for receiving events.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<DeploymentEvent>,

    /// Filter for this subscription.
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<DeploymentEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Receive the next event that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<DeploymentEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged = count, "[bus] Subscriber lagged, some events dropped");
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Like [`recv`](Self::recv), but reports lost events instead of
    /// skipping past them.
    ///
    /// After `Err(SubscriptionError::Lagged { .. })` the subscription resumes
    /// at the oldest event still buffered.
    pub async fn recv_reliable(&mut self) -> Result<DeploymentEvent, SubscriptionError> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Err(SubscriptionError::Lagged { missed })
                }
            };

            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available and matched
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<DeploymentEvent>, SubscriptionError> {
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(lagged = count, "[bus] Subscriber lagged, some events dropped");
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Drain every event already queued for this subscription.
    pub fn drain(&mut self) -> Vec<DeploymentEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Convert into a [`Stream`] of matching events.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.receiver),
            filter: self.filter,
        }
    }
}

/// A stream wrapper for subscriptions.
pub struct EventStream {
    inner: BroadcastStream<DeploymentEvent>,
    filter: EventFilter,
}

impl EventStream {
    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = DeploymentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(event)) if self.filter.matches(&event) => return Poll::Ready(Some(event)),
                Some(Ok(_)) => continue,
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    warn!(lagged = count, "[bus] Stream lagged, some events dropped");
                    continue;
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

/// Disposer for a handler registered with `subscribe_with`.
///
/// Dropping the handle also unsubscribes.
pub struct SubscriptionHandle {
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub(crate) fn spawn<F>(mut subscription: Subscription, handler: F) -> Self
    where
        F: Fn(&DeploymentEvent) + Send + Sync + 'static,
    {
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                    error!(
                        kind = ?event.kind(),
                        key = %event.key(),
                        "[bus] Event handler panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
            debug!("[bus] Handler subscription closed");
        });
        Self { task }
    }

    /// Stop delivering events to the handler.
    pub fn unsubscribe(self) {
        // Drop aborts the task.
    }

    /// Whether the handler task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DeploymentContext, EventKind};
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::{Address, GroupKey, NetworkId, PaymentMethod, TxHash};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn context() -> DeploymentContext {
        DeploymentContext::new(GroupKey::from("g"), NetworkId::from("1"), Address([3; 20]))
    }

    fn processing(byte: u8) -> DeploymentEvent {
        DeploymentEvent::Processing {
            context: context(),
            tx_hash: TxHash([byte; 32]),
            start_block: None,
        }
    }

    fn success() -> DeploymentEvent {
        DeploymentEvent::Success {
            context: context(),
            payment_method: PaymentMethod::SelfPaid,
        }
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(success()).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.kind(), EventKind::Success);
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::kind(EventKind::Success));

        // Filtered out
        bus.publish(processing(1)).await;
        bus.publish(success()).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.kind(), EventKind::Success);
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryEventBus::new();

        {
            let _sub1 = bus.subscribe(EventFilter::all());
            let _sub2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_recv_reliable_reports_lag() {
        let bus = InMemoryEventBus::with_capacity(4);
        let mut sub = bus.subscribe(EventFilter::all());

        for byte in 0..6 {
            bus.publish(processing(byte)).await;
        }

        assert_eq!(
            sub.recv_reliable().await,
            Err(SubscriptionError::Lagged { missed: 2 })
        );
        assert_eq!(sub.recv_reliable().await, Ok(processing(2)));
        assert_eq!(sub.drain().len(), 3);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_drain_preserves_publish_order() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::kind(EventKind::Processing));

        for byte in 1..=3 {
            bus.publish(processing(byte)).await;
        }

        let hashes: Vec<TxHash> = sub
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                DeploymentEvent::Processing { tx_hash, .. } => Some(tx_hash),
                _ => None,
            })
            .collect();
        assert_eq!(
            hashes,
            vec![TxHash([1; 32]), TxHash([2; 32]), TxHash([3; 32])]
        );
    }

    #[tokio::test]
    async fn test_event_stream_filters() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.event_stream(EventFilter::kind(EventKind::Success));

        bus.publish(processing(1)).await;
        bus.publish(success()).await;

        let received = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.kind(), EventKind::Success);
    }

    #[tokio::test]
    async fn test_handler_receives_in_order() {
        let bus = InMemoryEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = bus.subscribe_with(EventFilter::all(), move |event| {
            sink.lock().unwrap().push(event.kind());
        });

        bus.publish(processing(1)).await;
        bus.publish(success()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::Processing, EventKind::Success]
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_is_isolated() {
        let bus = InMemoryEventBus::new();
        let healthy = Arc::new(AtomicUsize::new(0));
        let faulty_calls = Arc::new(AtomicUsize::new(0));

        let faulty_counter = Arc::clone(&faulty_calls);
        let _faulty = bus.subscribe_with(EventFilter::all(), move |_| {
            faulty_counter.fetch_add(1, Ordering::SeqCst);
            panic!("handler failure");
        });
        let healthy_counter = Arc::clone(&healthy);
        let _healthy = bus.subscribe_with(EventFilter::all(), move |_| {
            healthy_counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(processing(1)).await;
        bus.publish(processing(2)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(healthy.load(Ordering::SeqCst), 2);
        // The faulty handler keeps receiving after its first panic.
        assert_eq!(faulty_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = InMemoryEventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = bus.subscribe_with(EventFilter::all(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(success()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_active());
        handle.unsubscribe();
        tokio::time::sleep(Duration::from_millis(10)).await;

        bus.publish(success()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
