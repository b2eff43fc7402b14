//! Ledger transaction log.
//!
//! Append-only: this module only inserts and reads. There is deliberately no
//! update or delete function for these rows.

use crate::{
    entities::{LedgerTransaction, ledger_transaction},
    errors::Result,
    ledger::Attestation,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Appends one attestation for a shipment.
///
/// Takes any connection so the shipment tracker can append inside the same
/// transaction that clears the row's ledger error.
pub async fn append_record<C>(
    db: &C,
    supply_chain_id: i64,
    attestation: Attestation,
) -> Result<ledger_transaction::Model>
where
    C: ConnectionTrait,
{
    let record = ledger_transaction::ActiveModel {
        supply_chain_id: Set(supply_chain_id),
        tx_hash: Set(attestation.tx_hash),
        from_address: Set(attestation.from_address),
        to_address: Set(attestation.to_address),
        amount: Set(attestation.amount),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Logged ledger transaction {} for shipment {}",
        record.tx_hash, supply_chain_id
    );
    Ok(record)
}

/// All records of one shipment, newest first.
pub async fn records_for_shipment(
    db: &DatabaseConnection,
    supply_chain_id: i64,
) -> Result<Vec<ledger_transaction::Model>> {
    LedgerTransaction::find()
        .filter(ledger_transaction::Column::SupplyChainId.eq(supply_chain_id))
        .order_by_desc(ledger_transaction::Column::CreatedAt)
        .order_by_desc(ledger_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Total number of records in the log.
pub async fn count_records(db: &DatabaseConnection) -> Result<u64> {
    LedgerTransaction::find().count(db).await.map_err(Into::into)
}
