//! Supply chain entity - One tracked shipment of a medicine batch.
//!
//! Each row links a `medicine_id`, its `manufacturer_id`, a `distributor_id` and a
//! `pharmacy_id`, and carries the shipment `status` as its string form
//! (`"pending"`, `"in_transit"`, `"delivered"`, `"cancelled"`). `ledger_anchor` holds
//! the address returned by the ledger when the shipment was registered there, and
//! `last_ledger_error` holds the failure text of the most recent ledger call, if it failed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supply chain (shipment) database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supply_chains")]
pub struct Model {
    /// Unique identifier for the shipment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Medicine being shipped
    pub medicine_id: i64,
    /// Manufacturer of the medicine, copied from the medicine at creation
    pub manufacturer_id: i64,
    /// Distributor carrying the shipment
    pub distributor_id: i64,
    /// Pharmacy receiving the shipment
    pub pharmacy_id: i64,
    /// Number of units shipped
    pub quantity: i32,
    /// Current status, see [`crate::core::status::ShipmentStatus`]
    pub status: String,
    /// Ledger address anchoring this shipment, `None` until anchoring succeeds
    pub ledger_anchor: Option<String>,
    /// Error text of the most recent failed ledger call, cleared on success
    pub last_ledger_error: Option<String>,
    /// When the shipment was created
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SupplyChain` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each shipment moves one medicine
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id"
    )]
    Medicine,
    /// Each shipment originates at one manufacturer
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id"
    )]
    Manufacturer,
    /// Each shipment is carried by one distributor
    #[sea_orm(
        belongs_to = "super::distributor::Entity",
        from = "Column::DistributorId",
        to = "super::distributor::Column::Id"
    )]
    Distributor,
    /// Each shipment is delivered to one pharmacy
    #[sea_orm(
        belongs_to = "super::pharmacy::Entity",
        from = "Column::PharmacyId",
        to = "super::pharmacy::Column::Id"
    )]
    Pharmacy,
    /// One shipment accumulates many ledger transactions
    #[sea_orm(has_many = "super::ledger_transaction::Entity")]
    LedgerTransactions,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::distributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distributor.def()
    }
}

impl Related<super::pharmacy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pharmacy.def()
    }
}

impl Related<super::ledger_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
