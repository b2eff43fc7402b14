//! Medicine catalog business logic.
//!
//! Every medicine belongs to one manufacturer and describes one production batch.
//! Creation validates the batch window and prices; removal follows the same
//! reference-counting rule as the registry.

use crate::{
    core::registry::{self, Role},
    entities::{Medicine, SupplyChain, medicine, supply_chain},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Input for [`create_medicine`]
#[derive(Clone, Debug, Deserialize)]
pub struct NewMedicine {
    /// Product name
    pub name: String,
    /// Owning manufacturer
    pub manufacturer_id: i64,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Unit price, must not be negative
    pub price: Decimal,
    /// Units in stock, must not be negative
    pub quantity: i32,
    /// Manufacturer batch identifier
    pub batch_number: String,
    /// Production date
    pub manufacturing_date: NaiveDate,
    /// Expiry date, strictly after `manufacturing_date`
    pub expiry_date: NaiveDate,
}

fn validate_new_medicine(new_medicine: &NewMedicine) -> Result<()> {
    if new_medicine.name.trim().is_empty() {
        return Err(Error::validation("Medicine name cannot be empty"));
    }
    if new_medicine.batch_number.trim().is_empty() {
        return Err(Error::validation("Batch number cannot be empty"));
    }
    if new_medicine.price.is_sign_negative() && !new_medicine.price.is_zero() {
        return Err(Error::validation(format!(
            "Price cannot be negative (got {})",
            new_medicine.price
        )));
    }
    if new_medicine.quantity < 0 {
        return Err(Error::validation(format!(
            "Quantity cannot be negative (got {})",
            new_medicine.quantity
        )));
    }
    if new_medicine.expiry_date <= new_medicine.manufacturing_date {
        return Err(Error::validation(format!(
            "Expiry date {} must be after manufacturing date {}",
            new_medicine.expiry_date, new_medicine.manufacturing_date
        )));
    }
    Ok(())
}

/// Adds a medicine to the catalog.
///
/// # Errors
/// Returns an error if:
/// - The name or batch number is empty
/// - The price or quantity is negative
/// - The expiry date is not after the manufacturing date
/// - The manufacturer does not exist
/// - The database insert fails
#[instrument(skip(db, new_medicine), fields(name = %new_medicine.name))]
pub async fn create_medicine(
    db: &DatabaseConnection,
    new_medicine: NewMedicine,
) -> Result<medicine::Model> {
    validate_new_medicine(&new_medicine)?;
    registry::require_party(db, Role::Manufacturer, new_medicine.manufacturer_id).await?;

    let medicine = medicine::ActiveModel {
        name: Set(new_medicine.name.trim().to_string()),
        manufacturer_id: Set(new_medicine.manufacturer_id),
        description: Set(new_medicine.description),
        price: Set(new_medicine.price),
        quantity: Set(new_medicine.quantity),
        batch_number: Set(new_medicine.batch_number.trim().to_string()),
        manufacturing_date: Set(new_medicine.manufacturing_date),
        expiry_date: Set(new_medicine.expiry_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Created medicine {} ({}) batch {} for manufacturer {}",
        medicine.id, medicine.name, medicine.batch_number, medicine.manufacturer_id
    );
    Ok(medicine)
}

/// Retrieves a medicine by its ID.
pub async fn get_medicine(db: &DatabaseConnection, medicine_id: i64) -> Result<Option<medicine::Model>> {
    Medicine::find_by_id(medicine_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_medicine`], but a missing medicine is an [`Error::NotFound`].
pub async fn require_medicine(db: &DatabaseConnection, medicine_id: i64) -> Result<medicine::Model> {
    get_medicine(db, medicine_id).await?.ok_or(Error::NotFound {
        entity: "medicine",
        id: medicine_id,
    })
}

/// Lists the whole catalog, ordered alphabetically by name.
pub async fn list_medicines(db: &DatabaseConnection) -> Result<Vec<medicine::Model>> {
    Medicine::find()
        .order_by_asc(medicine::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the medicines of one manufacturer, ordered alphabetically by name.
pub async fn list_medicines_for_manufacturer(
    db: &DatabaseConnection,
    manufacturer_id: i64,
) -> Result<Vec<medicine::Model>> {
    Medicine::find()
        .filter(medicine::Column::ManufacturerId.eq(manufacturer_id))
        .order_by_asc(medicine::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of medicines in the catalog.
pub async fn count_medicines(db: &DatabaseConnection) -> Result<u64> {
    Medicine::find().count(db).await.map_err(Into::into)
}

/// Removes a medicine that no shipment references.
#[instrument(skip(db))]
pub async fn remove_medicine(db: &DatabaseConnection, medicine_id: i64) -> Result<()> {
    require_medicine(db, medicine_id).await?;

    let references = SupplyChain::find()
        .filter(supply_chain::Column::MedicineId.eq(medicine_id))
        .count(db)
        .await?;
    if references > 0 {
        return Err(Error::InUse {
            entity: "medicine",
            id: medicine_id,
            references,
        });
    }

    Medicine::delete_by_id(medicine_id).exec(db).await?;
    info!("Removed medicine {}", medicine_id);
    Ok(())
}
