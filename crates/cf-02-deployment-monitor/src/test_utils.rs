//! Scripted collaborator doubles and fixtures.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for the
//! workspace integration suite.

use crate::domain::{NodeTransaction, RelayTaskStatus, TransactionReceipt};
use crate::error::{IndexerResult, NodeError, NodeResult, RelayResult};
use crate::ports::{IndexerPoller, NodeClient, RelayClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::DeploymentContext;
use shared_types::{
    Address, DeploymentStatus, GroupKey, NetworkId, PaymentMethod, PendingDeployment,
    RelayTaskId, RelayTaskState, TxHash,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Network used by every fixture.
pub const TEST_NETWORK: &str = "1";

/// Event context for the fixture deployment at `[byte; 20]`.
pub fn context(byte: u8) -> DeploymentContext {
    DeploymentContext::new(
        GroupKey(format!("group-{byte:02x}")),
        NetworkId::from(TEST_NETWORK),
        Address([byte; 20]),
    )
}

/// A self-paid entry already submitted with `tx_hash`.
pub fn processing_deployment(byte: u8, tx_hash: TxHash) -> PendingDeployment {
    let mut deployment = awaiting_deployment(byte, PaymentMethod::SelfPaid);
    deployment.status = DeploymentStatus::Processing;
    deployment.tx_hash = Some(tx_hash);
    deployment
}

/// A sponsored entry already handed to the relay.
pub fn relaying_deployment(byte: u8, task_id: &str) -> PendingDeployment {
    let mut deployment = awaiting_deployment(byte, PaymentMethod::Sponsored);
    deployment.status = DeploymentStatus::Relaying;
    deployment.relay_task_id = Some(RelayTaskId::from(task_id));
    deployment
}

pub fn awaiting_deployment(byte: u8, payment_method: PaymentMethod) -> PendingDeployment {
    let mut deployment = PendingDeployment::awaiting_execution(
        NetworkId::from(TEST_NETWORK),
        Address([byte; 20]),
        serde_json::json!({ "owners": [format!("0x{byte:02x}")], "threshold": 1 }),
        payment_method,
    );
    deployment.group_key = Some(context(byte).group_key);
    deployment
}

// =============================================================================
// NODE
// =============================================================================

/// How `await_confirmations` resolves.
#[derive(Debug, Clone)]
pub enum Confirmation {
    Success,
    Reverted,
    /// Resolves without a receipt.
    NoReceipt,
    Error(NodeError),
    /// Never resolves.
    Pending,
}

/// Node double: queued lookup results first, then "found" from a given call on.
pub struct ScriptedNodeClient {
    lookups: Mutex<VecDeque<NodeResult<Option<NodeTransaction>>>>,
    found_from_call: Option<u32>,
    replacement: Mutex<Option<NodeResult<NodeTransaction>>>,
    confirmation: Mutex<Confirmation>,
    lookup_calls: AtomicU32,
    replacement_checks: AtomicU32,
    confirmation_calls: AtomicU32,
}

impl ScriptedNodeClient {
    fn build(found_from_call: Option<u32>) -> Self {
        Self {
            lookups: Mutex::new(VecDeque::new()),
            found_from_call,
            replacement: Mutex::new(None),
            confirmation: Mutex::new(Confirmation::Success),
            lookup_calls: AtomicU32::new(0),
            replacement_checks: AtomicU32::new(0),
            confirmation_calls: AtomicU32::new(0),
        }
    }

    /// Lookups return nothing before call `attempt`, then the transaction.
    pub fn found_on_attempt(attempt: u32) -> Self {
        Self::build(Some(attempt))
    }

    pub fn never_found() -> Self {
        Self::build(None)
    }

    pub fn push_lookup(&self, result: NodeResult<Option<NodeTransaction>>) {
        self.lookups.lock().push_back(result);
    }

    pub fn set_replacement(&self, result: NodeResult<NodeTransaction>) {
        *self.replacement.lock() = Some(result);
    }

    pub fn set_confirmation(&self, confirmation: Confirmation) {
        *self.confirmation.lock() = confirmation;
    }

    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn replacement_checks(&self) -> u32 {
        self.replacement_checks.load(Ordering::SeqCst)
    }

    pub fn confirmation_calls(&self) -> u32 {
        self.confirmation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeClient for ScriptedNodeClient {
    async fn get_transaction(&self, hash: TxHash) -> NodeResult<Option<NodeTransaction>> {
        let call = self.lookup_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(result) = self.lookups.lock().pop_front() {
            return result;
        }
        Ok(self
            .found_from_call
            .filter(|from| call >= *from)
            .map(|_| NodeTransaction::with_hash(hash)))
    }

    async fn detect_replacement(
        &self,
        tx: &NodeTransaction,
        _start_block: u64,
    ) -> NodeResult<NodeTransaction> {
        self.replacement_checks.fetch_add(1, Ordering::SeqCst);
        self.replacement
            .lock()
            .clone()
            .unwrap_or_else(|| Ok(tx.clone()))
    }

    async fn await_confirmations(
        &self,
        tx: &NodeTransaction,
        _confirmations: u64,
    ) -> NodeResult<Option<TransactionReceipt>> {
        self.confirmation_calls.fetch_add(1, Ordering::SeqCst);
        let confirmation = self.confirmation.lock().clone();
        let receipt = |success| TransactionReceipt {
            transaction_hash: tx.hash,
            block_number: 1,
            success,
        };
        match confirmation {
            Confirmation::Success => Ok(Some(receipt(true))),
            Confirmation::Reverted => Ok(Some(receipt(false))),
            Confirmation::NoReceipt => Ok(None),
            Confirmation::Error(err) => Err(err),
            Confirmation::Pending => std::future::pending().await,
        }
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// Relay double: queued states first, then a fixed fallback.
pub struct ScriptedRelayClient {
    statuses: Mutex<VecDeque<RelayResult<Option<RelayTaskState>>>>,
    fallback: Option<RelayTaskState>,
    calls: AtomicU32,
}

impl ScriptedRelayClient {
    /// Unknown task until statuses are pushed.
    pub fn new() -> Self {
        Self::with_fallback(None)
    }

    /// Reports `states` in order, then keeps repeating the last one.
    pub fn with_states(states: impl IntoIterator<Item = RelayTaskState>) -> Self {
        let states: Vec<_> = states.into_iter().collect();
        let client = Self::with_fallback(states.last().copied());
        for state in states {
            client.push_status(Ok(Some(state)));
        }
        client
    }

    pub fn pending_forever() -> Self {
        Self::with_fallback(Some(RelayTaskState::ExecPending))
    }

    fn with_fallback(fallback: Option<RelayTaskState>) -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicU32::new(0),
        }
    }

    pub fn push_status(&self, status: RelayResult<Option<RelayTaskState>>) {
        self.statuses.lock().push_back(status);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedRelayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayClient for ScriptedRelayClient {
    async fn get_task_status(&self, task_id: &RelayTaskId) -> RelayResult<Option<RelayTaskStatus>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().pop_front();
        let state = match next {
            Some(result) => result?,
            None => self.fallback,
        };
        Ok(state.map(|state| RelayTaskStatus {
            task_id: task_id.clone(),
            state,
            transaction_hash: None,
        }))
    }
}

// =============================================================================
// INDEXER
// =============================================================================

/// Indexer double that resolves after an optional delay.
pub struct MockIndexerPoller {
    delay: Duration,
    result: Mutex<IndexerResult<()>>,
    calls: AtomicU32,
}

impl MockIndexerPoller {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            result: Mutex::new(Ok(())),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_result(&self, result: IndexerResult<()>) {
        *self.result.lock() = result;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockIndexerPoller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexerPoller for MockIndexerPoller {
    async fn poll_until_indexed(
        &self,
        _network_id: &NetworkId,
        _address: &Address,
    ) -> IndexerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.lock().clone()
    }
}
