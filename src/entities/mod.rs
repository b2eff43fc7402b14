//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod distributor;
pub mod ledger_transaction;
pub mod manufacturer;
pub mod medicine;
pub mod pharmacy;
pub mod supply_chain;

// Re-export specific types to avoid conflicts
pub use distributor::{
    Column as DistributorColumn, Entity as Distributor, Model as DistributorModel,
};
pub use ledger_transaction::{
    Column as LedgerTransactionColumn, Entity as LedgerTransaction,
    Model as LedgerTransactionModel,
};
pub use manufacturer::{
    Column as ManufacturerColumn, Entity as Manufacturer, Model as ManufacturerModel,
};
pub use medicine::{Column as MedicineColumn, Entity as Medicine, Model as MedicineModel};
pub use pharmacy::{Column as PharmacyColumn, Entity as Pharmacy, Model as PharmacyModel};
pub use supply_chain::{
    Column as SupplyChainColumn, Entity as SupplyChain, Model as SupplyChainModel,
};
