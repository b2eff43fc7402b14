//! HTTP surface.
//!
//! Form-encoded requests in, JSON out. Mutating routes answer like the web forms
//! they replace: a `302 Found` back to the listing with a flash message in the
//! body. When an API token is configured every route except the public dashboard
//! figures and sign-up requires `Authorization: Bearer <token>`.

mod handlers;

use crate::{core::shipment::ShipmentService, errors::Error};
use axum::{
    Json, Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ShipmentService>,
    /// Limit applied to each ledger call made on behalf of a request
    pub ledger_timeout: Duration,
    /// Bearer token required on protected routes; `None` disables the check
    pub api_token: Option<Arc<str>>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/shipments",
            get(handlers::list_shipments).post(handlers::create_shipment),
        )
        .route("/shipments/{id}", get(handlers::shipment_detail))
        .route("/shipments/{id}/status", post(handlers::update_status))
        .route("/catalog", get(handlers::catalog))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/stats", get(handlers::stats))
        .route("/register", post(handlers::register))
        .merge(protected)
        .with_state(state)
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected) {
        next.run(request).await
    } else {
        warn!("Rejected {} {}: missing or invalid token", request.method(), request.uri());
        (
            StatusCode::UNAUTHORIZED,
            Json(Flash::error("Missing or invalid API token")),
        )
            .into_response()
    }
}

/// Severity of a flash message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

/// One-shot user message returned by mutating routes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// `302 Found` to `location` carrying `flash`.
fn redirect_with_flash(location: &'static str, flash: Flash) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)], Json(flash)).into_response()
}

/// `status` with an error flash.
fn error_flash(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(Flash::error(message))).into_response()
}

/// Error returned by handlers that have no route-specific mapping
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidTransition { .. } | Error::InUse { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
            return error_flash(status, "Internal server error");
        }
        error_flash(status, self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{catalog, registry, shipment::NewShipment};
    use crate::ledger::InMemoryLedger;
    use crate::test_utils::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, Method};
    use serde_json::Value;
    use tower::ServiceExt;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        app: Router,
        fixture: Fixture,
        service: Arc<ShipmentService>,
        ledger: Arc<InMemoryLedger>,
    }

    async fn harness(api_token: Option<&str>) -> Harness {
        init_test_tracing();
        let fixture = setup_supply_fixture().await.unwrap();
        let ledger = Arc::new(InMemoryLedger::new());
        let service = Arc::new(test_service(&fixture, ledger.clone()));
        let app = router(AppState {
            service: Arc::clone(&service),
            ledger_timeout: TIMEOUT,
            api_token: api_token.map(Arc::from),
        });
        Harness {
            app,
            fixture,
            service,
            ledger,
        }
    }

    fn form(uri: &str, body: String) -> Request {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request) -> (StatusCode, Option<HeaderValue>, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response.headers().get(header::LOCATION).cloned();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, location, body)
    }

    fn shipment_form(h: &Harness, quantity: &str) -> String {
        format!(
            "medicine={}&distributor={}&pharmacy={}&quantity={}",
            h.fixture.medicine.id, h.fixture.distributor.id, h.fixture.pharmacy.id, quantity
        )
    }

    #[tokio::test]
    async fn test_stats_match_entity_counts() {
        let h = harness(None).await;
        let (status, _, body) = send(&h.app, get_request("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["total_medicines"],
            catalog::count_medicines(&h.fixture.db).await.unwrap()
        );
        assert_eq!(
            body["total_manufacturers"],
            registry::count_parties(&h.fixture.db, registry::Role::Manufacturer)
                .await
                .unwrap()
        );
        assert_eq!(body["total_pharmacies"], 1);
        assert_eq!(body["shipments"]["total"], 0);

        h.service
            .create_shipment(
                NewShipment {
                    medicine_id: h.fixture.medicine.id,
                    distributor_id: h.fixture.distributor.id,
                    pharmacy_id: h.fixture.pharmacy.id,
                    quantity: 3,
                },
                TIMEOUT,
            )
            .await
            .unwrap();
        let (_, _, body) = send(&h.app, get_request("/stats")).await;
        assert_eq!(body["active_supply_chains"], 1);
        assert_eq!(body["shipments"]["pending"], 1);
        assert_eq!(body["shipments"]["total"], 1);
        assert_eq!(body["completed_deliveries"], 0);
    }

    #[tokio::test]
    async fn test_create_shipment_redirects_with_flash() {
        let h = harness(None).await;
        let (status, location, body) =
            send(&h.app, form("/shipments", shipment_form(&h, "100"))).await;

        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.unwrap(), "/shipments");
        assert_eq!(body["level"], "success");

        let shipments = h.service.list_shipments().await.unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].manufacturer_id, h.fixture.manufacturer.id);
        assert!(shipments[0].ledger_anchor.is_some());
    }

    #[tokio::test]
    async fn test_create_shipment_bad_input_is_400() {
        let h = harness(None).await;
        for quantity in ["0", "-1", "lots"] {
            let (status, location, body) =
                send(&h.app, form("/shipments", shipment_form(&h, quantity))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
            assert!(location.is_none());
            assert_eq!(body["level"], "error");
        }

        let unknown = format!(
            "medicine=999&distributor={}&pharmacy={}&quantity=1",
            h.fixture.distributor.id, h.fixture.pharmacy.id
        );
        let (status, _, _) = send(&h.app, form("/shipments", unknown)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.service.list_shipments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_shipment_ledger_failure_still_persists() {
        let h = harness(None).await;
        h.ledger.fail_anchors(Some("connection refused"));

        let (status, location, body) =
            send(&h.app, form("/shipments", shipment_form(&h, "5"))).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.unwrap(), "/shipments");
        assert_eq!(body["level"], "error");

        let shipments = h.service.list_shipments().await.unwrap();
        assert_eq!(shipments.len(), 1);
        assert!(shipments[0].ledger_anchor.is_none());
        assert!(shipments[0].last_ledger_error.is_some());
    }

    #[tokio::test]
    async fn test_update_status_flow() {
        let h = harness(None).await;
        let entry = create_test_shipment(&h.fixture, 10).await.unwrap();
        let uri = format!("/shipments/{}/status", entry.id);

        let (status, location, body) = send(&h.app, form(&uri, "status=in_transit".into())).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.unwrap(), "/shipments");
        assert_eq!(body["level"], "success");

        let (status, _, body) = send(&h.app, form(&uri, "status=pending".into())).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(body["level"], "error");

        let (status, _, body) = send(&h.app, form(&uri, "status=lost".into())).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(body["level"], "error");

        let stored = h.service.get_shipment(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "in_transit");

        let (status, _, body) = send(&h.app, get_request(&format!("/shipments/{}", entry.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_update_status_unknown_shipment_is_404() {
        let h = harness(None).await;
        let (status, _, _) = send(&h.app, form("/shipments/777/status", "status=delivered".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&h.app, form("/shipments/777/status", "status=bogus".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&h.app, get_request("/shipments/777")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_status_ledger_failure_keeps_status() {
        let h = harness(None).await;
        let entry = create_test_shipment(&h.fixture, 10).await.unwrap();
        h.ledger.fail_status_changes(Some("execution reverted"));

        let uri = format!("/shipments/{}/status", entry.id);
        let (status, _, body) = send(&h.app, form(&uri, "status=cancelled".into())).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(body["level"], "error");

        let stored = h.service.get_shipment(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "cancelled");
    }

    #[tokio::test]
    async fn test_list_shipments_with_counts() {
        let h = harness(None).await;
        create_test_shipment(&h.fixture, 1).await.unwrap();
        create_test_shipment(&h.fixture, 2).await.unwrap();

        let (status, _, body) = send(&h.app, get_request("/shipments")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shipments"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["shipments"][0]["quantity"], 2);
        assert_eq!(body["counts"]["pending"], 2);
    }

    #[tokio::test]
    async fn test_catalog_lists_form_options() {
        let h = harness(None).await;
        let (status, _, body) = send(&h.app, get_request("/catalog")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["medicines"][0]["name"], "Paracetamol 500mg");
        assert_eq!(body["manufacturers"][0]["name"], "PharmaTech Industries");
        assert_eq!(body["distributors"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["pharmacies"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_register_dispatches_on_role() {
        let h = harness(Some("secret")).await;
        let (status, location, body) = send(
            &h.app,
            form(
                "/register",
                "role=distributor&name=FastFreight&email=ops%40fastfreight.example".into(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.unwrap(), "/stats");
        assert_eq!(body["level"], "success");

        let distributors = registry::list_parties(&h.fixture.db, registry::Role::Distributor)
            .await
            .unwrap();
        let registered = distributors.iter().find(|p| p.name == "FastFreight").unwrap();
        assert!(registered.license_number.starts_with("DIS"));

        let (status, _, body) = send(
            &h.app,
            form("/register", "role=wholesaler&name=X&email=x%40y.example".into()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["level"], "error");
    }

    #[tokio::test]
    async fn test_token_required_on_protected_routes() {
        let h = harness(Some("secret")).await;

        let (status, _, _) = send(&h.app, get_request("/shipments")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut request = get_request("/shipments");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer wrong"),
        );
        let (status, _, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut request = get_request("/shipments");
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer secret"),
        );
        let (status, _, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);

        // Public figures stay open
        let (status, _, _) = send(&h.app, get_request("/stats")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
