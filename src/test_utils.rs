//! Shared test utilities for pharma-chain.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test parties, medicines and shipments with sensible defaults.

use crate::{
    core::{
        catalog::{self, NewMedicine},
        registry::{self, NewParty, Party, Role},
        shipment::{NewShipment, ShipmentService},
    },
    entities::{medicine, supply_chain},
    errors::Result,
    ledger::InMemoryLedger,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a test subscriber so `RUST_LOG=debug cargo test` shows the service logs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registers a test party with sensible defaults.
///
/// # Defaults
/// * `address`: "1 Test Street"
/// * `contact_number`: "555-0100"
/// * `email`: "contact@example.com"
pub async fn create_test_party(
    db: &DatabaseConnection,
    role: Role,
    name: &str,
    license_number: &str,
) -> Result<Party> {
    registry::register_party(
        db,
        role,
        NewParty {
            name: name.to_string(),
            address: "1 Test Street".to_string(),
            license_number: Some(license_number.to_string()),
            contact_number: "555-0100".to_string(),
            email: "contact@example.com".to_string(),
        },
    )
    .await
}

/// Creates a test medicine for `manufacturer_id`.
///
/// # Defaults
/// * price: 5.99
/// * quantity: 1000
/// * valid from 2026-01-15 for one year
pub async fn create_test_medicine(
    db: &DatabaseConnection,
    manufacturer_id: i64,
    name: &str,
) -> Result<medicine::Model> {
    let manufacturing_date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap_or_default();
    catalog::create_medicine(
        db,
        NewMedicine {
            name: name.to_string(),
            manufacturer_id,
            description: format!("{name} test batch"),
            price: Decimal::new(599, 2),
            quantity: 1000,
            batch_number: "BATCH001".to_string(),
            manufacturing_date,
            expiry_date: manufacturing_date + chrono::Duration::days(365),
        },
    )
    .await
}

/// One party of each role plus one medicine.
pub struct Fixture {
    pub db: DatabaseConnection,
    pub manufacturer: Party,
    pub distributor: Party,
    pub pharmacy: Party,
    pub medicine: medicine::Model,
}

/// Sets up a complete supply chain: "PharmaTech Industries" making one medicine,
/// one distributor and one pharmacy.
pub async fn setup_supply_fixture() -> Result<Fixture> {
    let db = setup_test_db().await?;
    let manufacturer =
        create_test_party(&db, Role::Manufacturer, "PharmaTech Industries", "MAN001").await?;
    let distributor = create_test_party(&db, Role::Distributor, "MedLogistics", "DIS001").await?;
    let pharmacy = create_test_party(&db, Role::Pharmacy, "Corner Pharmacy", "PHARM001").await?;
    let medicine = create_test_medicine(&db, manufacturer.id, "Paracetamol 500mg").await?;
    Ok(Fixture {
        db,
        manufacturer,
        distributor,
        pharmacy,
        medicine,
    })
}

/// Shipment service over the fixture database and the given ledger.
pub fn test_service(fixture: &Fixture, ledger: Arc<InMemoryLedger>) -> ShipmentService {
    ShipmentService::new(fixture.db.clone(), ledger)
}

/// Creates an anchored pending shipment of the fixture medicine.
pub async fn create_test_shipment(fixture: &Fixture, quantity: i32) -> Result<supply_chain::Model> {
    let service = test_service(fixture, Arc::new(InMemoryLedger::new()));
    let outcome = service
        .create_shipment(
            NewShipment {
                medicine_id: fixture.medicine.id,
                distributor_id: fixture.distributor.id,
                pharmacy_id: fixture.pharmacy.id,
                quantity,
            },
            Duration::from_secs(5),
        )
        .await?;
    Ok(outcome.entry)
}
