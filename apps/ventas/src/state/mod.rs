//! # State Module
//!
//! What the procedures share for the lifetime of the process.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────────┐   ┌──────────────────────────────┐   │
//! │  │          AppConfig           │   │           DbState            │   │
//! │  │                              │──►│                              │   │
//! │  │  database_path               │   │  Database (SQLite pool,      │   │
//! │  │  max_connections             │   │            graph cache)      │   │
//! │  │  tax_rate_bps                │   │  CheckoutService             │   │
//! │  │  default_term_days           │   │                              │   │
//! │  │  internal_number_prefix      │   │                              │   │
//! │  └──────────────────────────────┘   └──────────────────────────────┘   │
//! │                                                                         │
//! │  AppConfig: read-only after load                                       │
//! │  DbState: cheap to clone, pool and cache are shared                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{default_config_path, default_data_dir, AppConfig, ConfigError};
pub use db::DbState;
