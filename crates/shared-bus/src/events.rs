//! # Deployment Events
//!
//! Defines every event that flows through the bus. Submitters raise the
//! initial `Processing` / `Relaying` events, checkers raise the terminal ones,
//! and the reconciler raises `Indexed`.

use serde::{Deserialize, Serialize};
use shared_types::{
    Address, DeploymentFailure, DeploymentKey, GroupKey, NetworkId, PaymentMethod,
    PendingDeployment, RelayTaskId, TxHash,
};

/// Fields carried by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContext {
    /// Caller-supplied correlation id.
    pub group_key: GroupKey,
    pub network_id: NetworkId,
    pub address: Address,
}

impl DeploymentContext {
    pub fn new(group_key: GroupKey, network_id: NetworkId, address: Address) -> Self {
        Self {
            group_key,
            network_id,
            address,
        }
    }

    /// Context for events about a stored entry.
    ///
    /// Entries without a group key fall back to their store key.
    #[must_use]
    pub fn for_deployment(deployment: &PendingDeployment) -> Self {
        let group_key = deployment
            .group_key
            .clone()
            .unwrap_or_else(|| GroupKey(deployment.key().to_string()));
        Self::new(group_key, deployment.network_id.clone(), deployment.address)
    }

    /// Store key this event applies to.
    #[must_use]
    pub fn key(&self) -> DeploymentKey {
        DeploymentKey::new(self.network_id.clone(), self.address)
    }
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeploymentEvent {
    /// Nothing submitted yet.
    AwaitingExecution { context: DeploymentContext },

    /// A self-paid creation transaction was broadcast.
    Processing {
        context: DeploymentContext,
        tx_hash: TxHash,
        /// Block height at broadcast, if the submitter observed it.
        start_block: Option<u64>,
    },

    /// A sponsored creation was handed to the relay.
    Relaying {
        context: DeploymentContext,
        task_id: RelayTaskId,
    },

    // =========================================================================
    // TERMINAL (raised by checkers)
    // =========================================================================
    /// Creation confirmed on-chain; the indexer has not caught up yet.
    Success {
        context: DeploymentContext,
        payment_method: PaymentMethod,
    },

    /// Creation transaction mined but reverted.
    Reverted {
        context: DeploymentContext,
        error: DeploymentFailure,
    },

    /// Lookup exhausted, relay failure, timeout or invariant violation.
    Failed {
        context: DeploymentContext,
        error: DeploymentFailure,
    },

    // =========================================================================
    // RECONCILIATION (raised by the reconciler)
    // =========================================================================
    /// The indexer poll resolved; the pending entry is about to be pruned.
    Indexed { context: DeploymentContext },
}

impl DeploymentEvent {
    /// Get the kind of this event (for filtering).
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AwaitingExecution { .. } => EventKind::AwaitingExecution,
            Self::Processing { .. } => EventKind::Processing,
            Self::Relaying { .. } => EventKind::Relaying,
            Self::Success { .. } => EventKind::Success,
            Self::Reverted { .. } => EventKind::Reverted,
            Self::Failed { .. } => EventKind::Failed,
            Self::Indexed { .. } => EventKind::Indexed,
        }
    }

    #[must_use]
    pub fn context(&self) -> &DeploymentContext {
        match self {
            Self::AwaitingExecution { context }
            | Self::Processing { context, .. }
            | Self::Relaying { context, .. }
            | Self::Success { context, .. }
            | Self::Reverted { context, .. }
            | Self::Failed { context, .. }
            | Self::Indexed { context } => context,
        }
    }

    #[must_use]
    pub fn key(&self) -> DeploymentKey {
        self.context().key()
    }
}

/// Event kinds for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AwaitingExecution,
    Processing,
    Relaying,
    Success,
    Reverted,
    Failed,
    Indexed,
}

impl EventKind {
    /// Kinds raised when a checker resolves.
    pub const TERMINAL: [EventKind; 3] = [Self::Success, Self::Reverted, Self::Failed];
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
    /// Networks to include. Empty means all networks.
    pub network_ids: Vec<NetworkId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self {
            kinds,
            network_ids: Vec::new(),
        }
    }

    /// Create a filter for a single kind.
    #[must_use]
    pub fn kind(kind: EventKind) -> Self {
        Self::kinds(vec![kind])
    }

    /// Restrict the filter to one network.
    #[must_use]
    pub fn on_network(mut self, network_id: NetworkId) -> Self {
        self.network_ids.push(network_id);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &DeploymentEvent) -> bool {
        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind());

        let network_match = self.network_ids.is_empty()
            || self.network_ids.contains(&event.context().network_id);

        kind_match && network_match
    }
}
