//! Application configuration.
//!
//! Settings come from a TOML file (`config.toml` by default, or the path in
//! `CONFIG_PATH`), then individual values can be overridden from the environment
//! (after `.env` has been loaded by `main`). Every section has defaults, so an
//! absent file yields a runnable in-memory-ledger setup.

/// Database configuration and connection management
pub mod database;

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration structure representing the entire config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Ledger bridge settings
    pub ledger: LedgerConfig,
    /// Request authentication settings
    pub auth: AuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: database::DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// Which ledger bridge implementation to build at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    /// Process-local ledger, nothing leaves the process
    #[default]
    Memory,
    /// Ethereum-compatible JSON-RPC node
    Rpc,
}

/// Ledger bridge settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bridge implementation
    pub mode: LedgerMode,
    /// JSON-RPC endpoint of the ledger node
    pub rpc_url: String,
    /// Sending account; the node's first account is used when unset
    pub from_address: Option<String>,
    /// Compiled contract artifact with `abi` and `bytecode` fields
    pub contract_artifact: PathBuf,
    /// 4-byte selector of `updateStatus(string)`
    pub update_status_selector: String,
    /// Upper bound for a single ledger call, in seconds
    pub timeout_secs: u64,
    /// Delay between receipt polls, in milliseconds
    pub receipt_poll_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::Memory,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            from_address: None,
            contract_artifact: PathBuf::from("contracts/SupplyChain.json"),
            update_status_selector: "0x2c215998".to_string(),
            timeout_secs: 30,
            receipt_poll_ms: 500,
        }
    }
}

impl LedgerConfig {
    /// Upper bound for a single ledger call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between receipt polls.
    #[must_use]
    pub const fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

/// Request authentication settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token required on protected routes; routes are open when unset
    pub api_token: Option<String>,
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config: {e}"),
    })
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(addr) = lookup("BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    if let Some(mode) = lookup("LEDGER_MODE") {
        config.ledger.mode = match mode.to_ascii_lowercase().as_str() {
            "memory" => LedgerMode::Memory,
            "rpc" => LedgerMode::Rpc,
            other => {
                return Err(Error::Config {
                    message: format!("Unknown LEDGER_MODE '{other}'"),
                });
            }
        };
    }
    if let Some(url) = lookup("LEDGER_RPC_URL") {
        config.ledger.rpc_url = url;
    }
    if let Some(address) = lookup("LEDGER_FROM_ADDRESS") {
        config.ledger.from_address = Some(address);
    }
    if let Some(token) = lookup("API_TOKEN") {
        config.auth.api_token = Some(token).filter(|t| !t.is_empty());
    }
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.ledger.timeout_secs == 0 {
        return Err(Error::Config {
            message: "ledger.timeout_secs must be greater than zero".to_string(),
        });
    }
    if config.ledger.receipt_poll_ms == 0 {
        return Err(Error::Config {
            message: "ledger.receipt_poll_ms must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// Loads the application configuration the way `main` needs it.
///
/// Reads `CONFIG_PATH` (default `config.toml`); a missing file falls back to defaults.
/// Environment overrides are applied last.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let base = if Path::new(&path).exists() {
        info!("Loading configuration from {}", path);
        load_config(&path)?
    } else {
        info!("No configuration file at {}, using defaults", path);
        AppConfig::default()
    };

    let config = apply_overrides(base, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}
