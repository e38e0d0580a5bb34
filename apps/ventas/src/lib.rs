//! # Ventas Application Library
//!
//! The procedure surface of the sales core plus the pieces a host process
//! needs to serve it: configuration, database state and tracing.
//!
//! ## Module Structure
//! ```text
//! ventas_app/
//! ├── lib.rs          ◄─── You are here (init_tracing, open)
//! ├── main.rs         ◄─── `ventas` CLI (JSON in, JSON out)
//! ├── error.rs        ◄─── ApiError, ErrorCode
//! ├── state/
//! │   ├── config.rs   ◄─── AppConfig (toml + VENTAS_* env)
//! │   └── db.rs       ◄─── DbState (Database + CheckoutService)
//! └── commands/
//!     ├── conversion.rs
//!     ├── credit.rs
//!     └── sale.rs
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,ventas=debug,sqlx=warn; override with RUST_LOG      │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • --config file, else the platform config dir                       │
//! │     • VENTAS_* environment overrides, then validation                   │
//! │                                                                         │
//! │  3. Connect to Database ──────────────────────────────────────────────► │
//! │     • SQLite with WAL mode                                              │
//! │     • Run pending migrations                                            │
//! │                                                                         │
//! │  4. Serve Procedures ─────────────────────────────────────────────────► │
//! │     • DbState shared by every call                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use error::ApiError;
use state::{AppConfig, DbState};

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so stdout stays free for responses.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=ventas_db=trace` - Trace the database crate only
/// - Default: `info,ventas=debug,sqlx=warn`
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ventas=debug,sqlx=warn"));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads configuration and opens the database.
pub async fn open(config_path: Option<&Path>) -> Result<(AppConfig, DbState), ApiError> {
    let config = AppConfig::load(config_path)?;
    info!(
        database = %config.database_path.display(),
        tax_rate_bps = config.tax_rate_bps,
        "Configuration loaded"
    );

    if let Some(dir) = config.database_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| ApiError::internal(format!("Cannot create {}: {}", dir.display(), e)))?;
    }

    let db = DbState::open(&config).await?;
    Ok((config, db))
}
