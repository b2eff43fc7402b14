//! Ledger bridge.
//!
//! Shipments are anchored on an external ledger when they are created, and every
//! status change is attested there. The tracker only sees the [`LedgerBridge`]
//! trait; which implementation sits behind it is decided once at startup by
//! [`build_ledger`] and injected into the shipment service.
//!
//! Calls are at-most-once: there is no retry, backoff or idempotency key. Every
//! call made by the tracker goes through [`with_timeout`].

mod memory;
mod rpc;

pub use memory::InMemoryLedger;
pub use rpc::{ContractArtifact, JsonRpcLedger, encode_update_status};

use crate::config::{LedgerConfig, LedgerMode};
use crate::core::status::ShipmentStatus;
use crate::entities::supply_chain;
use crate::errors::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Common result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Failures reported by a ledger bridge
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The call did not finish within the caller's limit
    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP-level failure talking to the node
    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error or a reverted receipt
    #[error("ledger node rejected {method}: {message} (code {code})")]
    Rpc {
        /// JSON-RPC method that failed
        method: String,
        /// JSON-RPC error code, `0` for reverted receipts
        code: i64,
        /// Error text from the node
        message: String,
    },

    /// The node answered with something we cannot interpret
    #[error("malformed ledger response: {0}")]
    Malformed(String),

    /// A status change was requested for a shipment that was never anchored
    #[error("shipment {0} has no ledger anchor")]
    MissingAnchor(i64),

    /// The contract artifact could not be loaded
    #[error("contract artifact error: {0}")]
    Artifact(String),

    /// The ledger refused the operation
    #[error("ledger rejected the operation: {0}")]
    Rejected(String),
}

/// Evidence of a status change recorded on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attestation {
    /// Transaction hash
    pub tx_hash: String,
    /// Sending account
    pub from_address: String,
    /// Receiving account or contract
    pub to_address: String,
    /// Value moved by the transaction
    pub amount: Decimal,
}

/// Capabilities the shipment tracker needs from a ledger.
#[async_trait]
pub trait LedgerBridge: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Registers a new shipment on the ledger and returns its anchor address.
    async fn anchor(&self, entry: &supply_chain::Model) -> LedgerResult<String>;

    /// Records a status change for an anchored shipment.
    ///
    /// Returns the attestation when the ledger produced a transaction for it.
    async fn record_status_change(
        &self,
        entry: &supply_chain::Model,
        status: ShipmentStatus,
    ) -> LedgerResult<Option<Attestation>>;
}

/// Runs a ledger call, giving up after `limit`.
///
/// The inner future is dropped on timeout, which cancels any in-flight request.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| LedgerError::Timeout(limit))?
}

/// Builds the ledger bridge selected by the configuration.
pub fn build_ledger(config: &LedgerConfig) -> Result<Arc<dyn LedgerBridge>> {
    match config.mode {
        LedgerMode::Memory => Ok(Arc::new(InMemoryLedger::new())),
        LedgerMode::Rpc => Ok(Arc::new(JsonRpcLedger::from_config(config)?)),
    }
}
