#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use pharma_chain::{
    api::{self, AppState},
    config::{self, database},
    core::shipment::ShipmentService,
    errors::Result,
    ledger,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    database::ensure_database_dir(&app_config.database.url)?;
    let db = database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Build the ledger bridge and the shipment service
    let bridge = ledger::build_ledger(&app_config.ledger)
        .inspect_err(|e| error!("Failed to build ledger bridge: {}", e))?;
    info!("Using {} ledger bridge", bridge.name());
    let service = Arc::new(ShipmentService::new(db, bridge));

    let mismatches = service.find_manufacturer_mismatches().await?;
    for mismatch in &mismatches {
        warn!(
            "Shipment {} records manufacturer {} but its medicine belongs to {}",
            mismatch.shipment_id,
            mismatch.recorded_manufacturer_id,
            mismatch.medicine_manufacturer_id
        );
    }

    if app_config.auth.api_token.is_none() {
        warn!("No API token configured; all routes are open");
    }

    // 6. Serve HTTP until Ctrl-C
    let app = api::router(AppState {
        service,
        ledger_timeout: app_config.ledger.timeout(),
        api_token: app_config.auth.api_token.map(Arc::from),
    });
    let listener = TcpListener::bind(&app_config.server.bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind_addr, e))?;
    info!("Listening on {}", app_config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}
