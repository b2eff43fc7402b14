//! Ethereum JSON-RPC ledger.
//!
//! Each shipment gets its own contract instance: anchoring deploys the compiled
//! contract and returns the deployed address, and a status change calls
//! `updateStatus(string)` on that address. Both operations wait for the
//! transaction receipt by polling `eth_getTransactionReceipt`; the caller's
//! timeout is the only bound on that wait.

use super::{Attestation, LedgerBridge, LedgerError, LedgerResult};
use crate::config::LedgerConfig;
use crate::core::status::ShipmentStatus;
use crate::entities::supply_chain;
use crate::errors::Result;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Compiled contract as produced by the Solidity toolchain.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
    /// Contract ABI, kept for reference
    #[serde(default)]
    pub abi: Value,
    /// Deployment bytecode, hex encoded
    pub bytecode: String,
}

impl ContractArtifact {
    /// Loads an artifact JSON file (`{"abi": [...], "bytecode": "0x..."}`).
    pub fn load<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Artifact(format!("{}: {e}", path.display())))?;
        let artifact: Self = serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Artifact(format!("{}: {e}", path.display())))?;
        if artifact.bytecode.trim_start_matches("0x").is_empty() {
            return Err(LedgerError::Artifact(format!(
                "{}: empty bytecode",
                path.display()
            )));
        }
        Ok(artifact)
    }

    fn deploy_data(&self) -> String {
        format!("0x{}", self.bytecode.trim_start_matches("0x"))
    }
}

/// ABI-encodes a call to a single-`string`-argument function.
///
/// Layout: selector, offset word (`0x20`), length word, then the UTF-8 bytes
/// right-padded to a multiple of 32.
#[must_use]
pub fn encode_update_status(selector: &str, status: &str) -> String {
    let bytes = status.as_bytes();
    let padded_len = bytes.len().div_ceil(32) * 32;

    let mut data = Vec::with_capacity(64 + padded_len);
    let mut offset = [0u8; 32];
    offset[31] = 0x20;
    data.extend_from_slice(&offset);

    let mut length = [0u8; 32];
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    length[24..].copy_from_slice(&len.to_be_bytes());
    data.extend_from_slice(&length);

    data.extend_from_slice(bytes);
    data.resize(64 + padded_len, 0);

    format!(
        "0x{}{}",
        selector.trim_start_matches("0x"),
        hex::encode(data)
    )
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<String>,
}

/// [`LedgerBridge`] backed by an Ethereum-compatible JSON-RPC node
#[derive(Debug)]
pub struct JsonRpcLedger {
    client: Client,
    endpoint: String,
    from_address: Option<String>,
    artifact: ContractArtifact,
    update_selector: String,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Creates a client for `endpoint` using an already loaded artifact.
    pub fn new(
        endpoint: impl Into<String>,
        from_address: Option<String>,
        artifact: ContractArtifact,
        update_selector: impl Into<String>,
        poll_interval: Duration,
    ) -> LedgerResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            from_address,
            artifact,
            update_selector: update_selector.into(),
            poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    /// Builds the client described by the `[ledger]` config section.
    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        let artifact = ContractArtifact::load(&config.contract_artifact)?;
        let ledger = Self::new(
            config.rpc_url.clone(),
            config.from_address.clone(),
            artifact,
            config.update_status_selector.clone(),
            config.receipt_poll_interval(),
        )?;
        info!("JSON-RPC ledger configured for {}", config.rpc_url);
        Ok(ledger)
    }

    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("JSON-RPC {} (id {})", method, id);

        let response: RpcResponse = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn sender(&self) -> LedgerResult<String> {
        if let Some(address) = &self.from_address {
            return Ok(address.clone());
        }
        let accounts = self.call("eth_accounts", json!([])).await?;
        accounts
            .get(0)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::Malformed("node reported no accounts".to_string()))
    }

    async fn send_transaction(&self, transaction: Value) -> LedgerResult<String> {
        let hash = self
            .call("eth_sendTransaction", json!([transaction]))
            .await?;
        hash.as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::Malformed(format!("transaction hash: {hash}")))
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> LedgerResult<Receipt> {
        loop {
            let value = self
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !value.is_null() {
                let receipt: Receipt = serde_json::from_value(value)
                    .map_err(|e| LedgerError::Malformed(format!("receipt: {e}")))?;
                if receipt.status.as_deref() == Some("0x0") {
                    return Err(LedgerError::Rpc {
                        method: "eth_getTransactionReceipt".to_string(),
                        code: 0,
                        message: format!("transaction {tx_hash} reverted"),
                    });
                }
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl LedgerBridge for JsonRpcLedger {
    fn name(&self) -> &'static str {
        "json-rpc"
    }

    #[instrument(skip(self, entry), fields(shipment = entry.id))]
    async fn anchor(&self, entry: &supply_chain::Model) -> LedgerResult<String> {
        let from = self.sender().await?;
        let tx_hash = self
            .send_transaction(json!({
                "from": from,
                "data": self.artifact.deploy_data(),
            }))
            .await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;

        receipt.contract_address.ok_or_else(|| {
            LedgerError::Malformed(format!(
                "receipt for {} has no contract address",
                receipt.transaction_hash
            ))
        })
    }

    #[instrument(skip(self, entry), fields(shipment = entry.id))]
    async fn record_status_change(
        &self,
        entry: &supply_chain::Model,
        status: ShipmentStatus,
    ) -> LedgerResult<Option<Attestation>> {
        let contract = entry
            .ledger_anchor
            .clone()
            .ok_or(LedgerError::MissingAnchor(entry.id))?;
        let from = self.sender().await?;
        let tx_hash = self
            .send_transaction(json!({
                "from": from,
                "to": contract,
                "data": encode_update_status(&self.update_selector, status.as_str()),
            }))
            .await?;
        let receipt = self.wait_for_receipt(&tx_hash).await?;

        Ok(Some(Attestation {
            tx_hash: receipt.transaction_hash,
            from_address: from,
            to_address: contract,
            amount: Decimal::ZERO,
        }))
    }
}
