//! Entity registry - manufacturers, distributors and pharmacies.
//!
//! The three party kinds live in separate tables but share one shape, so callers
//! work with [`Party`] and pick the table with a [`Role`]. Roles are resolved
//! through a static lookup table that also carries the license prefix used when a
//! party registers without a license number.
//!
//! Parties are never removed while anything still points at them: removal counts
//! the referencing medicines and shipments first and refuses with
//! [`Error::InUse`] instead of cascading.

use crate::{
    entities::{
        Distributor, Manufacturer, Medicine, Pharmacy, SupplyChain, distributor, manufacturer,
        medicine, pharmacy, supply_chain,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbErr, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Which side of the supply chain a party is on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces medicines
    Manufacturer,
    /// Moves shipments
    Distributor,
    /// Receives shipments
    Pharmacy,
}

/// Static facts about a role
#[derive(Debug)]
pub struct RoleSpec {
    /// The role described
    pub role: Role,
    /// Wire key (`"manufacturer"`, ...)
    pub key: &'static str,
    /// Prefix for generated license numbers
    pub license_prefix: &'static str,
}

static ROLE_TABLE: [RoleSpec; 3] = [
    RoleSpec {
        role: Role::Manufacturer,
        key: "manufacturer",
        license_prefix: "MAN",
    },
    RoleSpec {
        role: Role::Distributor,
        key: "distributor",
        license_prefix: "DIS",
    },
    RoleSpec {
        role: Role::Pharmacy,
        key: "pharmacy",
        license_prefix: "PHARM",
    },
];

impl Role {
    /// Every role, in supply chain order.
    pub const ALL: [Self; 3] = [Self::Manufacturer, Self::Distributor, Self::Pharmacy];

    /// Lookup table entry for this role.
    #[must_use]
    pub fn spec(self) -> &'static RoleSpec {
        ROLE_TABLE
            .iter()
            .find(|spec| spec.role == self)
            .unwrap_or(&ROLE_TABLE[0])
    }

    /// Wire key, also used as the entity name in errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.spec().key
    }

    /// License number handed out to a party registered without one.
    #[must_use]
    pub fn default_license_number(self, id: i64) -> String {
        format!("{}{id:04}", self.spec().license_prefix)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ROLE_TABLE
            .iter()
            .find(|spec| spec.key == wanted)
            .map(|spec| spec.role)
            .ok_or_else(|| Error::validation(format!("Unknown role '{}'", s.trim())))
    }
}

/// A registered manufacturer, distributor or pharmacy
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Party {
    /// Primary key within the role's table
    pub id: i64,
    /// Table the party lives in
    pub role: Role,
    /// Company or store name
    pub name: String,
    /// Postal address
    pub address: String,
    /// License number, unique within the role
    pub license_number: String,
    /// Phone number
    pub contact_number: String,
    /// Contact email
    pub email: String,
    /// When the party was registered
    pub created_at: DateTime<Utc>,
}

macro_rules! party_from_model {
    ($module:ident, $role:expr) => {
        impl From<$module::Model> for Party {
            fn from(model: $module::Model) -> Self {
                Self {
                    id: model.id,
                    role: $role,
                    name: model.name,
                    address: model.address,
                    license_number: model.license_number,
                    contact_number: model.contact_number,
                    email: model.email,
                    created_at: model.created_at,
                }
            }
        }
    };
}

party_from_model!(manufacturer, Role::Manufacturer);
party_from_model!(distributor, Role::Distributor);
party_from_model!(pharmacy, Role::Pharmacy);

/// Registration input
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewParty {
    /// Company or store name
    pub name: String,
    /// Postal address
    #[serde(default)]
    pub address: String,
    /// License number; generated from the role prefix and id when absent
    #[serde(default)]
    pub license_number: Option<String>,
    /// Phone number
    #[serde(default)]
    pub contact_number: String,
    /// Contact email
    pub email: String,
}

fn is_plausible_email(email: &str) -> bool {
    email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
}

/// Registers a party in the table selected by `role`.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or the email is not plausible
/// - The license number is already registered for this role
/// - The database insert fails
#[instrument(skip(db, new_party))]
pub async fn register_party(db: &DatabaseConnection, role: Role, new_party: NewParty) -> Result<Party> {
    let name = new_party.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation(format!("{role} name cannot be empty")));
    }
    let email = new_party.email.trim().to_string();
    if !is_plausible_email(&email) {
        return Err(Error::validation(format!("'{email}' is not a valid email address")));
    }
    let license = new_party
        .license_number
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let now = Utc::now();
    let address = new_party.address.trim().to_string();
    let contact_number = new_party.contact_number.trim().to_string();
    let license_number = license.clone().unwrap_or_default();

    // The duplicate check, the insert and the generated number commit together.
    let txn = db.begin().await?;
    if let Some(license) = &license {
        if find_party_by_license(&txn, role, license).await?.is_some() {
            return Err(duplicate_license(role, license));
        }
    }

    let inserted: std::result::Result<Party, DbErr> = match role {
        Role::Manufacturer => manufacturer::ActiveModel {
            name: Set(name),
            address: Set(address),
            license_number: Set(license_number),
            contact_number: Set(contact_number),
            email: Set(email),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map(Into::into),
        Role::Distributor => distributor::ActiveModel {
            name: Set(name),
            address: Set(address),
            license_number: Set(license_number),
            contact_number: Set(contact_number),
            email: Set(email),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map(Into::into),
        Role::Pharmacy => pharmacy::ActiveModel {
            name: Set(name),
            address: Set(address),
            license_number: Set(license_number),
            contact_number: Set(contact_number),
            email: Set(email),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map(Into::into),
    };
    let mut party = inserted.map_err(|e| license_conflict(role, license.as_deref(), e))?;

    if license.is_none() {
        let generated = free_license_number(&txn, role, party.id).await?;
        set_license_number(&txn, role, party.id, &generated)
            .await
            .map_err(|e| license_conflict(role, Some(&generated), e))?;
        party.license_number = generated;
    }
    txn.commit()
        .await
        .map_err(|e| license_conflict(role, Some(&party.license_number), e))?;

    info!(
        "Registered {} {} ({}) with license {}",
        role, party.id, party.name, party.license_number
    );
    Ok(party)
}

fn duplicate_license(role: Role, license: &str) -> Error {
    Error::validation(format!(
        "License number {license} is already registered for a {role}"
    ))
}

/// Turns a unique-index violation on `license_number` into a validation error.
fn license_conflict(role: Role, license: Option<&str>, err: DbErr) -> Error {
    match (err.sql_err(), license) {
        (Some(SqlErr::UniqueConstraintViolation(_)), Some(license)) => {
            duplicate_license(role, license)
        }
        _ => err.into(),
    }
}

/// The role's default license number for `id`, suffixed with `-2`, `-3`, ...
/// while a party of the same role already holds it.
async fn free_license_number<C: ConnectionTrait>(conn: &C, role: Role, id: i64) -> Result<String> {
    let base = role.default_license_number(id);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while find_party_by_license(conn, role, &candidate).await?.is_some() {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }
    if suffix > 1 {
        warn!("License number {} already taken, using {}", base, candidate);
    }
    Ok(candidate)
}

async fn set_license_number<C: ConnectionTrait>(
    conn: &C,
    role: Role,
    id: i64,
    license_number: &str,
) -> std::result::Result<(), DbErr> {
    match role {
        Role::Manufacturer => {
            manufacturer::ActiveModel {
                id: Set(id),
                license_number: Set(license_number.to_string()),
                ..Default::default()
            }
            .update(conn)
            .await?;
        }
        Role::Distributor => {
            distributor::ActiveModel {
                id: Set(id),
                license_number: Set(license_number.to_string()),
                ..Default::default()
            }
            .update(conn)
            .await?;
        }
        Role::Pharmacy => {
            pharmacy::ActiveModel {
                id: Set(id),
                license_number: Set(license_number.to_string()),
                ..Default::default()
            }
            .update(conn)
            .await?;
        }
    }
    Ok(())
}

/// Finds a party by primary key within a role.
pub async fn get_party(db: &DatabaseConnection, role: Role, id: i64) -> Result<Option<Party>> {
    Ok(match role {
        Role::Manufacturer => Manufacturer::find_by_id(id).one(db).await?.map(Into::into),
        Role::Distributor => Distributor::find_by_id(id).one(db).await?.map(Into::into),
        Role::Pharmacy => Pharmacy::find_by_id(id).one(db).await?.map(Into::into),
    })
}

/// Like [`get_party`], but a missing party is an [`Error::NotFound`].
pub async fn require_party(db: &DatabaseConnection, role: Role, id: i64) -> Result<Party> {
    get_party(db, role, id).await?.ok_or(Error::NotFound {
        entity: role.as_str(),
        id,
    })
}

/// Finds a party by license number within a role.
pub async fn find_party_by_license<C: ConnectionTrait>(
    db: &C,
    role: Role,
    license_number: &str,
) -> Result<Option<Party>> {
    Ok(match role {
        Role::Manufacturer => Manufacturer::find()
            .filter(manufacturer::Column::LicenseNumber.eq(license_number))
            .one(db)
            .await?
            .map(Into::into),
        Role::Distributor => Distributor::find()
            .filter(distributor::Column::LicenseNumber.eq(license_number))
            .one(db)
            .await?
            .map(Into::into),
        Role::Pharmacy => Pharmacy::find()
            .filter(pharmacy::Column::LicenseNumber.eq(license_number))
            .one(db)
            .await?
            .map(Into::into),
    })
}

/// Lists all parties of a role, ordered alphabetically by name.
pub async fn list_parties(db: &DatabaseConnection, role: Role) -> Result<Vec<Party>> {
    Ok(match role {
        Role::Manufacturer => Manufacturer::find()
            .order_by_asc(manufacturer::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
        Role::Distributor => Distributor::find()
            .order_by_asc(distributor::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
        Role::Pharmacy => Pharmacy::find()
            .order_by_asc(pharmacy::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}

/// Number of registered parties of a role.
pub async fn count_parties(db: &DatabaseConnection, role: Role) -> Result<u64> {
    Ok(match role {
        Role::Manufacturer => Manufacturer::find().count(db).await?,
        Role::Distributor => Distributor::find().count(db).await?,
        Role::Pharmacy => Pharmacy::find().count(db).await?,
    })
}

/// Number of medicines and shipments that point at a party.
pub async fn count_party_references(db: &DatabaseConnection, role: Role, id: i64) -> Result<u64> {
    let shipment_column = match role {
        Role::Manufacturer => supply_chain::Column::ManufacturerId,
        Role::Distributor => supply_chain::Column::DistributorId,
        Role::Pharmacy => supply_chain::Column::PharmacyId,
    };
    let shipments = SupplyChain::find()
        .filter(shipment_column.eq(id))
        .count(db)
        .await?;
    let medicines = if role == Role::Manufacturer {
        Medicine::find()
            .filter(medicine::Column::ManufacturerId.eq(id))
            .count(db)
            .await?
    } else {
        0
    };
    Ok(shipments + medicines)
}

/// Removes a party that nothing references any more.
///
/// # Errors
/// Returns an error if:
/// - The party does not exist
/// - Medicines or shipments still reference it ([`Error::InUse`])
#[instrument(skip(db))]
pub async fn remove_party(db: &DatabaseConnection, role: Role, id: i64) -> Result<()> {
    require_party(db, role, id).await?;

    let references = count_party_references(db, role, id).await?;
    if references > 0 {
        return Err(Error::InUse {
            entity: role.as_str(),
            id,
            references,
        });
    }

    match role {
        Role::Manufacturer => Manufacturer::delete_by_id(id).exec(db).await?,
        Role::Distributor => Distributor::delete_by_id(id).exec(db).await?,
        Role::Pharmacy => Pharmacy::delete_by_id(id).exec(db).await?,
    };
    info!("Removed {} {}", role, id);
    Ok(())
}
