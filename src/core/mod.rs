//! Core business logic - framework-agnostic registry, catalog, shipment and reporting operations.

pub mod catalog;
pub mod registry;
pub mod shipment;
pub mod stats;
pub mod status;
pub mod transaction_log;
