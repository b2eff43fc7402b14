//! `pharma-chain` - pharmaceutical supply chain tracking with ledger anchoring
//!
//! This crate records manufacturers, distributors, pharmacies, medicines and the
//! shipments between them in a relational database, anchors every shipment on an
//! external ledger, and keeps an append-only log of the ledger attestations produced
//! by shipment status changes.

#![deny(unsafe_code, unused_must_use, rustdoc::broken_intra_doc_links)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all,
    clippy::pedantic,
    // Errors are propagated; tests opt back in per module
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::dbg_macro,
    clippy::todo,
)]
// sea-orm entity modules repeat their module names by convention
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

/// HTTP interface - axum router, handlers and flash responses
pub mod api;
/// Configuration management for database, ledger and server settings
pub mod config;
/// Core business logic - registry, catalog, shipments, transaction log and statistics
pub mod core;
/// SeaORM entity definitions for database tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Ledger bridge - trait plus in-memory and JSON-RPC implementations
pub mod ledger;

#[cfg(test)]
pub mod test_utils;
