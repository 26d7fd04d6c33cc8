//! Storage key layout
//!
//! `pending:<network>:<0x-lowercase-address>`. The address is rendered from
//! its parsed bytes, so keys are identical whatever casing the caller used.

use shared_types::DeploymentKey;

/// Prefix shared by every pending deployment entry.
pub const PENDING_PREFIX: &str = "pending:";

/// Backend key for a deployment.
pub fn storage_key(key: &DeploymentKey) -> Vec<u8> {
    format!("{}{}:{}", PENDING_PREFIX, key.network_id, key.address).into_bytes()
}
