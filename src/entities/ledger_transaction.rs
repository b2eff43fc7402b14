//! Ledger transaction entity - Append-only attestations of shipment status changes.
//!
//! Rows are written once, after the ledger confirms a status change, and are never
//! updated or deleted by the application.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Shipment the attestation belongs to
    pub supply_chain_id: i64,
    /// Ledger transaction hash
    pub tx_hash: String,
    /// Account that sent the transaction
    pub from_address: String,
    /// Account or contract that received it
    pub to_address: String,
    /// Value transferred with the transaction
    pub amount: Decimal,
    /// When the record was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LedgerTransaction` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one shipment
    #[sea_orm(
        belongs_to = "super::supply_chain::Entity",
        from = "Column::SupplyChainId",
        to = "super::supply_chain::Column::Id"
    )]
    SupplyChain,
}

impl Related<super::supply_chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyChain.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
