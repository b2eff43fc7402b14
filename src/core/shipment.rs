//! Shipment tracker.
//!
//! A shipment moves one medicine batch from its manufacturer through a distributor
//! to a pharmacy. Status changes follow [`ShipmentStatus::can_transition_to`] and
//! each one is mirrored on the ledger after it is committed locally.
//!
//! The relational write and the ledger write are not coupled: a ledger failure is
//! recorded on the row (`last_ledger_error`) and reported in the returned
//! [`ShipmentOutcome`], but never undoes the local change.

use crate::{
    core::{
        catalog,
        registry::{self, Role},
        status::ShipmentStatus,
        transaction_log,
    },
    entities::{Medicine, SupplyChain, ledger_transaction, supply_chain},
    errors::{Error, Result},
    ledger::{Attestation, LedgerBridge, with_timeout},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

/// Per-shipment locks.
///
/// Holding the guard serializes every read-check-write-attest sequence on one
/// shipment. Handles nobody holds or waits for are pruned on the next acquire.
#[derive(Clone, Debug, Default)]
pub struct ShipmentLocks {
    handles: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl ShipmentLocks {
    /// Waits for exclusive access to shipment `entry_id`.
    pub async fn acquire(&self, entry_id: i64) -> OwnedMutexGuard<()> {
        let handle = {
            let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            handles.retain(|_, handle| Arc::strong_count(handle) > 1);
            Arc::clone(handles.entry(entry_id).or_default())
        };
        handle.lock_owned().await
    }

    /// Number of lock handles currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Input for [`ShipmentService::create_shipment`]
#[derive(Clone, Debug, Deserialize)]
pub struct NewShipment {
    pub medicine_id: i64,
    pub distributor_id: i64,
    pub pharmacy_id: i64,
    pub quantity: i32,
}

/// What happened on the ledger side of an operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// The ledger accepted the call
    Recorded,
    /// The ledger call failed; the local change was kept
    Failed(String),
}

impl LedgerOutcome {
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Result of a create or transition
#[derive(Clone, Debug, Serialize)]
pub struct ShipmentOutcome {
    /// The shipment as stored after the operation
    pub entry: supply_chain::Model,
    /// Ledger side of the operation
    pub ledger: LedgerOutcome,
    /// Transaction record appended for this operation, if any
    pub attestation: Option<ledger_transaction::Model>,
}

/// A shipment together with its ledger history
#[derive(Clone, Debug, Serialize)]
pub struct ShipmentDetail {
    pub shipment: supply_chain::Model,
    /// Newest first
    pub records: Vec<ledger_transaction::Model>,
}

/// A shipment whose stored manufacturer differs from its medicine's manufacturer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManufacturerMismatch {
    pub shipment_id: i64,
    pub recorded_manufacturer_id: i64,
    pub medicine_manufacturer_id: i64,
}

/// Creates and advances shipments, mirroring every change on the ledger.
#[derive(Clone)]
pub struct ShipmentService {
    db: DatabaseConnection,
    ledger: Arc<dyn LedgerBridge>,
    locks: ShipmentLocks,
}

impl ShipmentService {
    pub fn new(db: DatabaseConnection, ledger: Arc<dyn LedgerBridge>) -> Self {
        Self {
            db,
            ledger,
            locks: ShipmentLocks::default(),
        }
    }

    /// Underlying database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Name of the ledger bridge in use.
    #[must_use]
    pub fn ledger_name(&self) -> &'static str {
        self.ledger.name()
    }

    /// Registers a new shipment in `pending` and anchors it on the ledger.
    ///
    /// The manufacturer is taken from the medicine.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `quantity` is not positive
    /// - The medicine, distributor or pharmacy does not exist
    /// - A database operation fails
    ///
    /// A failing ledger is not an error here; see [`ShipmentOutcome::ledger`].
    #[instrument(skip(self, new_shipment), fields(medicine_id = new_shipment.medicine_id))]
    pub async fn create_shipment(
        &self,
        new_shipment: NewShipment,
        ledger_timeout: Duration,
    ) -> Result<ShipmentOutcome> {
        if new_shipment.quantity <= 0 {
            return Err(Error::validation(format!(
                "Quantity must be positive (got {})",
                new_shipment.quantity
            )));
        }
        let medicine = catalog::require_medicine(&self.db, new_shipment.medicine_id).await?;
        registry::require_party(&self.db, Role::Distributor, new_shipment.distributor_id).await?;
        registry::require_party(&self.db, Role::Pharmacy, new_shipment.pharmacy_id).await?;

        let now = Utc::now();
        let entry = supply_chain::ActiveModel {
            medicine_id: Set(medicine.id),
            manufacturer_id: Set(medicine.manufacturer_id),
            distributor_id: Set(new_shipment.distributor_id),
            pharmacy_id: Set(new_shipment.pharmacy_id),
            quantity: Set(new_shipment.quantity),
            status: Set(ShipmentStatus::Pending.to_string()),
            ledger_anchor: Set(None),
            last_ledger_error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        info!(
            "Created shipment {} of {} x medicine {}",
            entry.id, entry.quantity, entry.medicine_id
        );

        let _guard = self.locks.acquire(entry.id).await;
        match with_timeout(ledger_timeout, self.ledger.anchor(&entry)).await {
            Ok(address) => {
                let mut active: supply_chain::ActiveModel = entry.into();
                active.ledger_anchor = Set(Some(address));
                let entry = active.update(&self.db).await?;
                info!(
                    "Anchored shipment {} on {} at {:?}",
                    entry.id,
                    self.ledger.name(),
                    entry.ledger_anchor
                );
                Ok(ShipmentOutcome {
                    entry,
                    ledger: LedgerOutcome::Recorded,
                    attestation: None,
                })
            }
            Err(error) => self.ledger_failure(entry, error.to_string()).await,
        }
    }

    /// Moves a shipment to `new_status` and attests the change on the ledger.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The shipment does not exist
    /// - `new_status` is not reachable from the current status
    /// - A database operation fails
    ///
    /// A failing ledger is not an error here; the new status stays committed.
    #[instrument(skip(self))]
    pub async fn transition_status(
        &self,
        entry_id: i64,
        new_status: ShipmentStatus,
        ledger_timeout: Duration,
    ) -> Result<ShipmentOutcome> {
        let _guard = self.locks.acquire(entry_id).await;

        let entry = self.require_shipment(entry_id).await?;
        let current: ShipmentStatus = entry.status.parse()?;
        if !current.can_transition_to(new_status) {
            return Err(Error::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        let mut active: supply_chain::ActiveModel = entry.into();
        active.status = Set(new_status.to_string());
        active.updated_at = Set(Utc::now());
        let entry = active.update(&self.db).await?;
        info!("Shipment {} moved {} -> {}", entry_id, current, new_status);

        let attested =
            with_timeout(ledger_timeout, self.ledger.record_status_change(&entry, new_status))
                .await;
        match attested {
            Ok(None) => {
                let entry = self.clear_ledger_error(&self.db, entry).await?;
                Ok(ShipmentOutcome {
                    entry,
                    ledger: LedgerOutcome::Recorded,
                    attestation: None,
                })
            }
            Ok(Some(attestation)) => {
                let tx_hash = attestation.tx_hash.clone();
                match self.log_attestation(entry.clone(), attestation).await {
                    Ok((entry, record)) => Ok(ShipmentOutcome {
                        entry,
                        ledger: LedgerOutcome::Recorded,
                        attestation: Some(record),
                    }),
                    Err(e) => {
                        let message = format!("attested {tx_hash} but log append failed: {e}");
                        self.ledger_failure(entry, message).await
                    }
                }
            }
            Err(error) => self.ledger_failure(entry, error.to_string()).await,
        }
    }

    /// Appends the attestation and clears `last_ledger_error` in one transaction.
    async fn log_attestation(
        &self,
        entry: supply_chain::Model,
        attestation: Attestation,
    ) -> Result<(supply_chain::Model, ledger_transaction::Model)> {
        let txn = self.db.begin().await?;
        let record = transaction_log::append_record(&txn, entry.id, attestation).await?;
        let entry = self.clear_ledger_error(&txn, entry).await?;
        txn.commit().await?;
        Ok((entry, record))
    }

    /// Retrieves a shipment by its ID.
    pub async fn get_shipment(&self, entry_id: i64) -> Result<Option<supply_chain::Model>> {
        SupplyChain::find_by_id(entry_id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn require_shipment(&self, entry_id: i64) -> Result<supply_chain::Model> {
        self.get_shipment(entry_id).await?.ok_or(Error::NotFound {
            entity: "shipment",
            id: entry_id,
        })
    }

    /// All shipments, newest first.
    pub async fn list_shipments(&self) -> Result<Vec<supply_chain::Model>> {
        SupplyChain::find()
            .order_by_desc(supply_chain::Column::CreatedAt)
            .order_by_desc(supply_chain::Column::Id)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// A shipment and its transaction records.
    pub async fn shipment_detail(&self, entry_id: i64) -> Result<ShipmentDetail> {
        let shipment = self.require_shipment(entry_id).await?;
        let records = transaction_log::records_for_shipment(&self.db, entry_id).await?;
        Ok(ShipmentDetail { shipment, records })
    }

    /// Shipments whose stored manufacturer disagrees with their medicine.
    ///
    /// Only reports; rows are left as they are.
    pub async fn find_manufacturer_mismatches(&self) -> Result<Vec<ManufacturerMismatch>> {
        let rows = SupplyChain::find()
            .find_also_related(Medicine)
            .order_by_asc(supply_chain::Column::Id)
            .all(&self.db)
            .await?;

        let mismatches: Vec<_> = rows
            .into_iter()
            .filter_map(|(entry, medicine)| {
                let medicine = medicine?;
                (medicine.manufacturer_id != entry.manufacturer_id).then_some(ManufacturerMismatch {
                    shipment_id: entry.id,
                    recorded_manufacturer_id: entry.manufacturer_id,
                    medicine_manufacturer_id: medicine.manufacturer_id,
                })
            })
            .collect();
        if !mismatches.is_empty() {
            warn!("{} shipment(s) disagree with their medicine's manufacturer", mismatches.len());
        }
        Ok(mismatches)
    }

    async fn clear_ledger_error<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: supply_chain::Model,
    ) -> Result<supply_chain::Model> {
        if entry.last_ledger_error.is_none() {
            return Ok(entry);
        }
        let mut active: supply_chain::ActiveModel = entry.into();
        active.last_ledger_error = Set(None);
        active.update(conn).await.map_err(Into::into)
    }

    async fn ledger_failure(
        &self,
        entry: supply_chain::Model,
        message: String,
    ) -> Result<ShipmentOutcome> {
        warn!(
            "Ledger {} failed for shipment {}: {}",
            self.ledger.name(),
            entry.id,
            message
        );
        let mut active: supply_chain::ActiveModel = entry.into();
        active.last_ledger_error = Set(Some(message.clone()));
        let entry = active.update(&self.db).await?;
        Ok(ShipmentOutcome {
            entry,
            ledger: LedgerOutcome::Failed(message),
            attestation: None,
        })
    }
}
