//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    Distributor, LedgerTransaction, Manufacturer, Medicine, Pharmacy, SupplyChain,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default database location used when neither the config file nor `DATABASE_URL` set one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/pharma_chain.sqlite?mode=rwc";

/// Creates the parent directory of a file-backed `SQLite` URL.
///
/// Non-`SQLite` and in-memory URLs are left alone.
pub fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
        debug!("Ensured database directory {}", parent.display());
    }
    Ok(())
}

/// Establishes a connection to the database at `database_url`.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables that do not exist yet.
///
/// Tables are created parents first: parties, medicines, shipments, then the
/// ledger transaction log.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Manufacturer).await?;
    create_table(db, Distributor).await?;
    create_table(db, Pharmacy).await?;
    create_table(db, Medicine).await?;
    create_table(db, SupplyChain).await?;
    create_table(db, LedgerTransaction).await?;

    info!("Database tables ensured.");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        DistributorModel, LedgerTransactionModel, ManufacturerModel, MedicineModel,
        PharmacyModel, SupplyChainModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<ManufacturerModel> = Manufacturer::find().limit(1).all(&db).await?;
        let _: Vec<DistributorModel> = Distributor::find().limit(1).all(&db).await?;
        let _: Vec<PharmacyModel> = Pharmacy::find().limit(1).all(&db).await?;
        let _: Vec<MedicineModel> = Medicine::find().limit(1).all(&db).await?;
        let _: Vec<SupplyChainModel> = SupplyChain::find().limit(1).all(&db).await?;
        let _: Vec<LedgerTransactionModel> =
            LedgerTransaction::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        // A restart against an existing database must not fail
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_ensure_database_dir_ignores_memory_urls() -> Result<()> {
        ensure_database_dir("sqlite::memory:")?;
        ensure_database_dir("postgres://localhost/db")?;
        Ok(())
    }

    #[test]
    fn test_ensure_database_dir_creates_parent() -> Result<()> {
        let root = std::env::temp_dir().join(format!("pharma-chain-{}", std::process::id()));
        let url = format!("sqlite://{}/nested/chain.sqlite?mode=rwc", root.display());
        ensure_database_dir(&url)?;
        assert!(root.join("nested").is_dir());
        std::fs::remove_dir_all(&root)?;
        Ok(())
    }
}
