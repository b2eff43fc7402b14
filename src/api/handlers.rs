//! Route handlers.

use super::{ApiError, AppState, Flash, error_flash, redirect_with_flash};
use crate::{
    core::{
        catalog,
        registry::{self, NewParty, Party, Role},
        shipment::{LedgerOutcome, NewShipment, ShipmentDetail},
        stats::{self, DashboardStats, StatusCounts},
        status::ShipmentStatus,
    },
    entities::{medicine, supply_chain},
    errors::{Error, Result},
};
use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const SHIPMENTS_PAGE: &str = "/shipments";
const HOME_PAGE: &str = "/stats";

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::validation(format!("Invalid {field}: '{}'", value.trim())))
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> std::result::Result<Json<DashboardStats>, ApiError> {
    Ok(Json(stats::dashboard_stats(state.service.db()).await?))
}

#[derive(Serialize)]
pub struct ShipmentBoard {
    shipments: Vec<supply_chain::Model>,
    counts: StatusCounts,
}

/// `GET /shipments`
pub async fn list_shipments(
    State(state): State<AppState>,
) -> std::result::Result<Json<ShipmentBoard>, ApiError> {
    let shipments = state.service.list_shipments().await?;
    let counts = stats::status_counts(state.service.db()).await?;
    Ok(Json(ShipmentBoard { shipments, counts }))
}

/// Fields of the create-shipment form. The manufacturer is derived from the medicine.
#[derive(Debug, Deserialize)]
pub struct ShipmentForm {
    #[serde(default)]
    medicine: String,
    #[serde(default)]
    distributor: String,
    #[serde(default)]
    pharmacy: String,
    #[serde(default)]
    quantity: String,
}

impl ShipmentForm {
    fn parse(&self) -> Result<NewShipment> {
        Ok(NewShipment {
            medicine_id: parse_field("medicine", &self.medicine)?,
            distributor_id: parse_field("distributor", &self.distributor)?,
            pharmacy_id: parse_field("pharmacy", &self.pharmacy)?,
            quantity: parse_field("quantity", &self.quantity)?,
        })
    }
}

/// `POST /shipments`
#[instrument(skip(state))]
pub async fn create_shipment(
    State(state): State<AppState>,
    Form(form): Form<ShipmentForm>,
) -> std::result::Result<Response, ApiError> {
    let new_shipment = match form.parse() {
        Ok(new_shipment) => new_shipment,
        Err(e) => return Ok(error_flash(StatusCode::BAD_REQUEST, e.to_string())),
    };

    match state
        .service
        .create_shipment(new_shipment, state.ledger_timeout)
        .await
    {
        Ok(outcome) => Ok(match outcome.ledger {
            LedgerOutcome::Recorded => redirect_with_flash(
                SHIPMENTS_PAGE,
                Flash::success("Supply chain created successfully!"),
            ),
            LedgerOutcome::Failed(reason) => redirect_with_flash(
                SHIPMENTS_PAGE,
                Flash::error(format!(
                    "Supply chain {} was saved but could not be registered on the ledger: {reason}",
                    outcome.entry.id
                )),
            ),
        }),
        Err(e @ (Error::Validation { .. } | Error::NotFound { .. })) => Ok(error_flash(
            StatusCode::BAD_REQUEST,
            format!("Error creating supply chain: {e}"),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    status: String,
}

/// `POST /shipments/{id}/status`
#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> std::result::Result<Response, ApiError> {
    let new_status: ShipmentStatus = match form.status.parse() {
        Ok(status) => status,
        Err(e) => {
            if state.service.get_shipment(id).await?.is_none() {
                return Err(Error::NotFound {
                    entity: "shipment",
                    id,
                }
                .into());
            }
            return Ok(redirect_with_flash(
                SHIPMENTS_PAGE,
                Flash::error(format!("Error updating status: {e}")),
            ));
        }
    };

    match state
        .service
        .transition_status(id, new_status, state.ledger_timeout)
        .await
    {
        Ok(outcome) => Ok(match outcome.ledger {
            LedgerOutcome::Recorded => redirect_with_flash(
                SHIPMENTS_PAGE,
                Flash::success("Status updated successfully!"),
            ),
            LedgerOutcome::Failed(reason) => redirect_with_flash(
                SHIPMENTS_PAGE,
                Flash::error(format!(
                    "Status updated to {} but the ledger was not updated: {reason}",
                    new_status.label()
                )),
            ),
        }),
        Err(e @ Error::InvalidTransition { .. }) => Ok(redirect_with_flash(
            SHIPMENTS_PAGE,
            Flash::error(format!("Error updating status: {e}")),
        )),
        Err(e) => Err(e.into()),
    }
}

/// `GET /shipments/{id}`
pub async fn shipment_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> std::result::Result<Json<ShipmentDetail>, ApiError> {
    Ok(Json(state.service.shipment_detail(id).await?))
}

/// Everything the create-shipment form offers as options
#[derive(Serialize)]
pub struct CatalogView {
    medicines: Vec<medicine::Model>,
    manufacturers: Vec<Party>,
    distributors: Vec<Party>,
    pharmacies: Vec<Party>,
}

/// `GET /catalog`
pub async fn catalog(State(state): State<AppState>) -> std::result::Result<Json<CatalogView>, ApiError> {
    let db = state.service.db();
    Ok(Json(CatalogView {
        medicines: catalog::list_medicines(db).await?,
        manufacturers: registry::list_parties(db, Role::Manufacturer).await?,
        distributors: registry::list_parties(db, Role::Distributor).await?,
        pharmacies: registry::list_parties(db, Role::Pharmacy).await?,
    }))
}

/// Sign-up form: a role plus the party's details.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    role: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    contact_number: String,
    #[serde(default)]
    license_number: Option<String>,
}

/// `POST /register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> std::result::Result<Response, ApiError> {
    let role: Role = match form.role.parse() {
        Ok(role) => role,
        Err(e) => return Ok(error_flash(StatusCode::BAD_REQUEST, e.to_string())),
    };
    let new_party = NewParty {
        name: form.name,
        address: form.address,
        license_number: form.license_number,
        contact_number: form.contact_number,
        email: form.email,
    };

    match registry::register_party(state.service.db(), role, new_party).await {
        Ok(party) => {
            info!("Registered {} {} ({})", role, party.id, party.license_number);
            Ok(redirect_with_flash(
                HOME_PAGE,
                Flash::success("Account created successfully! Please complete your profile."),
            ))
        }
        Err(e @ Error::Validation { .. }) => Ok(error_flash(
            StatusCode::BAD_REQUEST,
            format!("Please correct the errors below: {e}"),
        )),
        Err(e) => Err(e.into()),
    }
}
