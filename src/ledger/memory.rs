//! Process-local ledger.
//!
//! Hands out sequential addresses and transaction hashes and remembers every call
//! it received. Failures and latency can be injected, which is what the tracker
//! tests rely on.

use super::{Attestation, LedgerBridge, LedgerError, LedgerResult};
use crate::core::status::ShipmentStatus;
use crate::entities::supply_chain;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Default sending account reported in attestations.
pub const MEMORY_LEDGER_ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

#[derive(Debug, Default)]
struct State {
    next_address: u64,
    next_tx: u64,
    anchors: Vec<(i64, String)>,
    status_changes: Vec<(i64, ShipmentStatus)>,
    fail_anchor: Option<String>,
    fail_status: Option<String>,
    skip_attestation: bool,
    delay: Option<Duration>,
}

/// In-memory [`LedgerBridge`]
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    /// Creates an empty ledger that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following `anchor` call fail with `message`; `None` restores success.
    pub fn fail_anchors(&self, message: Option<&str>) {
        self.state().fail_anchor = message.map(ToString::to_string);
    }

    /// Makes every following status change fail with `message`; `None` restores success.
    pub fn fail_status_changes(&self, message: Option<&str>) {
        self.state().fail_status = message.map(ToString::to_string);
    }

    /// Accepts status changes without producing an attestation.
    pub fn skip_attestations(&self, skip: bool) {
        self.state().skip_attestation = skip;
    }

    /// Delays every following call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }

    /// `(shipment id, anchor address)` for every successful anchor, in call order.
    #[must_use]
    pub fn anchors(&self) -> Vec<(i64, String)> {
        self.state().anchors.clone()
    }

    /// `(shipment id, status)` for every accepted status change, in call order.
    #[must_use]
    pub fn status_changes(&self) -> Vec<(i64, ShipmentStatus)> {
        self.state().status_changes.clone()
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl LedgerBridge for InMemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn anchor(&self, entry: &supply_chain::Model) -> LedgerResult<String> {
        self.pause().await;

        let mut state = self.state();
        if let Some(message) = &state.fail_anchor {
            return Err(LedgerError::Rejected(message.clone()));
        }
        state.next_address += 1;
        let address = format!("0x{:040x}", state.next_address);
        state.anchors.push((entry.id, address.clone()));
        debug!("Anchored shipment {} at {}", entry.id, address);
        Ok(address)
    }

    async fn record_status_change(
        &self,
        entry: &supply_chain::Model,
        status: ShipmentStatus,
    ) -> LedgerResult<Option<Attestation>> {
        self.pause().await;

        let mut state = self.state();
        if let Some(message) = &state.fail_status {
            return Err(LedgerError::Rejected(message.clone()));
        }
        let anchor = entry
            .ledger_anchor
            .clone()
            .ok_or(LedgerError::MissingAnchor(entry.id))?;
        state.status_changes.push((entry.id, status));
        if state.skip_attestation {
            return Ok(None);
        }

        state.next_tx += 1;
        Ok(Some(Attestation {
            tx_hash: format!("0x{:064x}", state.next_tx),
            from_address: MEMORY_LEDGER_ACCOUNT.to_string(),
            to_address: anchor,
            amount: Decimal::ZERO,
        }))
    }
}
