//! Distributor entity - Logistics companies moving medicines to pharmacies.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Distributor database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "distributors")]
pub struct Model {
    /// Unique identifier for the distributor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Company name
    pub name: String,
    /// Postal address
    pub address: String,
    /// Regulatory license number, unique among distributors
    #[sea_orm(unique)]
    pub license_number: String,
    /// Phone number
    pub contact_number: String,
    /// Contact email address
    pub email: String,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Distributor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One distributor carries many shipments
    #[sea_orm(has_many = "super::supply_chain::Entity")]
    SupplyChains,
}

impl Related<super::supply_chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplyChains.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
