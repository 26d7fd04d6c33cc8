//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identifiers**: `NetworkId`, `Address`, `TxHash`, `RelayTaskId`, `GroupKey`
//! - **Pending deployments**: `PendingDeployment`, `DeploymentKey`,
//!   `DeploymentStatus`, `PaymentMethod`
//! - **Relay**: `RelayTaskState`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::errors::{DeploymentFailure, ParseError};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Fixed-width byte identifiers rendered as lowercase `0x` hex.
///
/// Parsing accepts either prefix casing and mixed-case digits.
macro_rules! hex_identifier {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Raw bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                let bytes =
                    hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
                let actual = bytes.len();
                let array: [u8; $len] =
                    bytes
                        .try_into()
                        .map_err(|_| ParseError::InvalidLength {
                            expected: $len,
                            actual,
                        })?;
                Ok(Self(array))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_identifier!(
    /// A 20-byte account address (the predicted address of the entity being created).
    Address,
    20
);

hex_identifier!(
    /// A 32-byte transaction hash.
    TxHash,
    32
);

/// Opaque ledger identifier (e.g. `"1"` for mainnet, `"137"` for Polygon).
///
/// Surrounding whitespace is stripped on construction, including when
/// deserialised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl NetworkId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NetworkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier returned by the relay service when a sponsored task is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayTaskId(pub String);

impl From<&str> for RelayTaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RelayTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied correlation id attached to every event of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub String);

impl GroupKey {
    /// Fresh random correlation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<&str> for GroupKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// PENDING DEPLOYMENTS
// =============================================================================

/// Store key: one pending deployment per `(network, address)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeploymentKey {
    pub network_id: NetworkId,
    pub address: Address,
}

impl DeploymentKey {
    pub fn new(network_id: NetworkId, address: Address) -> Self {
        Self {
            network_id,
            address,
        }
    }
}

impl fmt::Display for DeploymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.network_id, self.address)
    }
}

/// Who pays for the creation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// The user's own transaction pays gas; tracked by transaction hash.
    SelfPaid,
    /// A relay service submits the transaction; tracked by task id.
    Sponsored,
}

/// Deployment lifecycle.
///
/// ```text
/// AwaitingExecution ──→ Processing ──┬──→ Success ──→ Indexed
///         │                          ├──→ Reverted
///         └────────→ Relaying ───────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentStatus {
    AwaitingExecution,
    Processing,
    Relaying,
    Success,
    Indexed,
    Reverted,
    Failed,
}

impl DeploymentStatus {
    /// Statuses a checker watches.
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Processing | Self::Relaying)
    }

    /// Statuses the engine takes no further automatic action on.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Indexed | Self::Reverted | Self::Failed)
    }

    /// Whether the engine may move an entity from `self` to `next`.
    ///
    /// Re-applying the current status is an in-place update and always allowed.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        match self {
            Self::AwaitingExecution => matches!(next, Self::Processing | Self::Relaying),
            Self::Processing | Self::Relaying => {
                matches!(next, Self::Success | Self::Reverted | Self::Failed)
            }
            Self::Success => next == Self::Indexed,
            Self::Indexed | Self::Reverted | Self::Failed => false,
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One not-yet-confirmed creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDeployment {
    pub network_id: NetworkId,
    pub address: Address,
    /// Opaque configuration (owners, threshold, ...). Never interpreted.
    pub creation_props: serde_json::Value,
    pub payment_method: PaymentMethod,
    pub status: DeploymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_task_id: Option<RelayTaskId>,
    /// Block height observed at submission, for replacement detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<GroupKey>,
    /// Last terminal failure, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DeploymentFailure>,
}

impl PendingDeployment {
    /// A deployment nothing has been submitted for yet.
    pub fn awaiting_execution(
        network_id: NetworkId,
        address: Address,
        creation_props: serde_json::Value,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            network_id,
            address,
            creation_props,
            payment_method,
            status: DeploymentStatus::AwaitingExecution,
            tx_hash: None,
            relay_task_id: None,
            start_block: None,
            submitted_at: None,
            group_key: None,
            error: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> DeploymentKey {
        DeploymentKey::new(self.network_id.clone(), self.address)
    }

    /// Checks that the tracking reference matches the payment method.
    ///
    /// Once status leaves `AwaitingExecution`, exactly one of `tx_hash` /
    /// `relay_task_id` must be set: the hash for self-paid, the task id for
    /// sponsored.
    #[must_use]
    pub fn has_consistent_reference(&self) -> bool {
        if self.status == DeploymentStatus::AwaitingExecution {
            return true;
        }
        match self.payment_method {
            PaymentMethod::SelfPaid => self.tx_hash.is_some() && self.relay_task_id.is_none(),
            PaymentMethod::Sponsored => self.relay_task_id.is_some() && self.tx_hash.is_none(),
        }
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// Task states reported by the relay status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayTaskState {
    CheckPending,
    ExecPending,
    WaitingForConfirmation,
    ExecSuccess,
    ExecReverted,
    Blacklisted,
    Cancelled,
    /// Task-state value, distinct from a transport-level 404.
    NotFound,
}

impl RelayTaskState {
    /// States that end the task unsuccessfully.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::ExecReverted | Self::Blacklisted | Self::Cancelled | Self::NotFound
        )
    }
}

impl fmt::Display for RelayTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
