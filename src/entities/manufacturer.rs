//! Manufacturer entity - Companies that produce medicines.
//!
//! A manufacturer owns the medicines in the catalog and is the origin of every
//! shipment built from those medicines.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Manufacturer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "manufacturers")]
pub struct Model {
    /// Unique identifier for the manufacturer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company name (e.g., "PharmaTech Industries")
    pub name: String,
    /// Postal address
    pub address: String,
    /// Regulatory license number, unique among manufacturers
    #[sea_orm(unique)]
    pub license_number: String,
    /// Phone number
    pub contact_number: String,
    /// Contact email address
    pub email: String,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Manufacturer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One manufacturer produces many medicines
    #[sea_orm(has_many = "super::medicine::Entity")]
    Medicines,
    /// One manufacturer originates many shipments
    #[sea_orm(has_many = "super::supply_chain::Entity")]
    SupplyChains,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicines.def()
    }
}

impl Related<super::supply_chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyChains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
