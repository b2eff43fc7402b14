//! Pharmacy entity - The receiving end of every shipment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pharmacy database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pharmacies")]
pub struct Model {
    /// Unique identifier for the pharmacy
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Store name
    pub name: String,
    /// Postal address
    pub address: String,
    /// Regulatory license number, unique among pharmacies
    #[sea_orm(unique)]
    pub license_number: String,
    /// Phone number
    pub contact_number: String,
    /// Contact email address
    pub email: String,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Pharmacy and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One pharmacy receives many shipments
    #[sea_orm(has_many = "super::supply_chain::Entity")]
    SupplyChains,
}

impl Related<super::supply_chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyChains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
