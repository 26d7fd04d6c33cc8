//! # Shared Bus - Typed Event Bus for Deployment Lifecycle Events
//!
//! Decouples producers (submitters, checkers) from consumers (reconciler,
//! UI, telemetry). Each bus is an explicit instance injected into the
//! components that use it; there is no process-wide singleton.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Checker    │                    │  Reconciler  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - Within one subscriber, events arrive in publish order.
//! - No ordering between different subscribers.
//! - Handler panics are isolated per handler.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{DeploymentContext, DeploymentEvent, EventFilter, EventKind};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{
    EventStream, EventSubscriber, Subscription, SubscriptionError, SubscriptionHandle,
};

/// Maximum events to buffer per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
