//! Medicine entity - Catalog entries, each owned by one manufacturer.
//!
//! A medicine row describes one production batch: its price, stock quantity,
//! batch number and the manufacturing/expiry window.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Medicine database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "medicines")]
pub struct Model {
    /// Unique identifier for the medicine
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product name (e.g., "Paracetamol 500mg")
    pub name: String,
    /// ID of the manufacturer that produces this medicine
    pub manufacturer_id: i64,
    /// Free-text description
    pub description: String,
    /// Unit price
    pub price: Decimal,
    /// Units in stock
    pub quantity: i32,
    /// Manufacturer batch identifier
    pub batch_number: String,
    /// Date the batch was produced
    pub manufacturing_date: Date,
    /// Date after which the batch must not be dispensed
    pub expiry_date: Date,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Medicine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each medicine belongs to one manufacturer
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id"
    )]
    Manufacturer,
    /// One medicine appears in many shipments
    #[sea_orm(has_many = "super::supply_chain::Entity")]
    SupplyChains,
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::supply_chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyChains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
