//! Unified error types and result handling.

use crate::core::status::ShipmentStatus;
use crate::ledger::LedgerError;
use thiserror::Error;

/// Every failure the service can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A referenced row does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up (e.g. `"medicine"`)
        entity: &'static str,
        /// Requested primary key
        id: i64,
    },

    /// Input rejected before touching storage
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// The requested status is not reachable from the current one
    #[error("Cannot move shipment from {from} to {to}")]
    InvalidTransition {
        /// Status stored on the shipment
        from: ShipmentStatus,
        /// Status the caller asked for
        to: ShipmentStatus,
    },

    /// Removal refused while other rows still point at the target
    #[error("{entity} {id} is still referenced by {references} record(s)")]
    InUse {
        /// Kind of row being removed
        entity: &'static str,
        /// Primary key of the row
        id: i64,
        /// Number of rows referencing it
        references: u64,
    },

    /// Ledger bridge failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// I/O failure (config files, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
