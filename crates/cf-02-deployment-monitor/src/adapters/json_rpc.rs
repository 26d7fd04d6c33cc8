//! JSON-RPC node client.

use crate::config::NodeRpcConfig;
use crate::domain::{NodeTransaction, ReplacementReason, TransactionReceipt};
use crate::error::{NodeError, NodeResult};
use crate::ports::NodeClient;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared_types::{Address, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: TxHash,
    from: Address,
    nonce: String,
    to: Option<Address>,
    value: String,
    input: String,
    block_number: Option<String>,
}

impl RpcTransaction {
    fn into_domain(self) -> NodeResult<NodeTransaction> {
        Ok(NodeTransaction {
            hash: self.hash,
            from: self.from,
            nonce: parse_u64(&self.nonce)?,
            to: self.to,
            value: parse_quantity(&self.value)?,
            input: parse_data(&self.input)?,
            block_number: self
                .block_number
                .as_deref()
                .map(parse_u64)
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: String,
    status: Option<String>,
}

impl RpcReceipt {
    fn into_domain(self) -> NodeResult<TransactionReceipt> {
        let success = match self.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            // Pre-Byzantium receipts carry no status
            None => true,
        };
        Ok(TransactionReceipt {
            transaction_hash: self.transaction_hash,
            block_number: parse_u64(&self.block_number)?,
            success,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

/// Node client speaking Ethereum JSON-RPC over HTTP.
pub struct JsonRpcNodeClient {
    http: reqwest::Client,
    config: NodeRpcConfig,
    request_id: AtomicU64,
}

impl JsonRpcNodeClient {
    pub fn new(config: NodeRpcConfig) -> NodeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            config,
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> NodeResult<Option<R>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .http
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| NodeError::Decode(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(NodeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    async fn block_number(&self) -> NodeResult<u64> {
        let result: Option<String> = self.call("eth_blockNumber", [(); 0]).await?;
        let raw = result.ok_or_else(|| NodeError::Decode("eth_blockNumber returned null".into()))?;
        parse_u64(&raw)
    }

    async fn receipt(&self, hash: TxHash) -> NodeResult<Option<TransactionReceipt>> {
        let result: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", [hash.to_string()])
            .await?;
        result.map(RpcReceipt::into_domain).transpose()
    }

    /// Mined nonce of `address` (count of its included transactions).
    async fn mined_nonce(&self, address: Address) -> NodeResult<u64> {
        let result: Option<String> = self
            .call("eth_getTransactionCount", (address.to_string(), "latest"))
            .await?;
        let raw =
            result.ok_or_else(|| NodeError::Decode("eth_getTransactionCount returned null".into()))?;
        parse_u64(&raw)
    }

    async fn block_transactions(&self, number: u64) -> NodeResult<Vec<NodeTransaction>> {
        let result: Option<RpcBlock> = self
            .call("eth_getBlockByNumber", (format!("0x{number:x}"), true))
            .await?;
        result
            .map(|block| block.transactions)
            .unwrap_or_default()
            .into_iter()
            .map(RpcTransaction::into_domain)
            .collect()
    }
}

#[async_trait]
impl NodeClient for JsonRpcNodeClient {
    async fn get_transaction(&self, hash: TxHash) -> NodeResult<Option<NodeTransaction>> {
        let result: Option<RpcTransaction> = self
            .call("eth_getTransactionByHash", [hash.to_string()])
            .await?;
        result.map(RpcTransaction::into_domain).transpose()
    }

    async fn detect_replacement(
        &self,
        tx: &NodeTransaction,
        start_block: u64,
    ) -> NodeResult<NodeTransaction> {
        if self.receipt(tx.hash).await?.is_some() {
            return Ok(tx.clone());
        }
        // Nonce not consumed yet: the original is still pending.
        if self.mined_nonce(tx.from).await? <= tx.nonce {
            return Ok(tx.clone());
        }

        let latest = self.block_number().await?;
        debug!(tx = %tx.hash, start_block, latest, "[cf-02] Scanning for replacement");
        for number in start_block..=latest {
            let Some(replacement) = self
                .block_transactions(number)
                .await?
                .into_iter()
                .find(|candidate| candidate.from == tx.from && candidate.nonce == tx.nonce)
            else {
                continue;
            };
            if replacement.hash == tx.hash {
                return Ok(tx.clone());
            }

            let reason = ReplacementReason::classify(tx, &replacement);
            info!(tx = %tx.hash, replacement = %replacement.hash, %reason, "[cf-02] Transaction superseded");
            return Err(NodeError::Replaced {
                reason,
                replacement: Some(replacement.hash),
                receipt: self.receipt(replacement.hash).await?,
            });
        }
        Ok(tx.clone())
    }

    async fn await_confirmations(
        &self,
        tx: &NodeTransaction,
        confirmations: u64,
    ) -> NodeResult<Option<TransactionReceipt>> {
        let deadline = Instant::now() + self.config.confirmation_timeout;
        loop {
            if let Some(receipt) = self.receipt(tx.hash).await? {
                let latest = self.block_number().await?;
                if latest.saturating_sub(receipt.block_number) + 1 >= confirmations {
                    return Ok(Some(receipt));
                }
            }
            if Instant::now() >= deadline {
                return Err(NodeError::Timeout {
                    after_secs: self.config.confirmation_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}

fn parse_quantity(raw: &str) -> NodeResult<u128> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| NodeError::Decode(format!("{raw}: {e}")))
}

fn parse_u64(raw: &str) -> NodeResult<u64> {
    u64::try_from(parse_quantity(raw)?)
        .map_err(|_| NodeError::Decode(format!("{raw}: does not fit in 64 bits")))
}

fn parse_data(raw: &str) -> NodeResult<Vec<u8>> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| NodeError::Decode(format!("input data: {e}")))
}
