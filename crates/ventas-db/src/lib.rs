//! # ventas-db: Database Layer and Sale Orchestrator
//!
//! SQLite storage for the sales core. Besides the repositories this crate
//! owns the two stateful pieces of the module: the per-tenant conversion
//! graph cache and the atomic sale transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sales Data Flow                                  │
//! │                                                                         │
//! │  Procedure (create_sale)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ventas-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database    │  │ CheckoutService│  │ ConversionGraph- │  │   │
//! │  │   │   (pool.rs)   │  │  (checkout/)   │  │ Cache            │  │   │
//! │  │   │               │  │                │  │                  │  │   │
//! │  │   │ SqlitePool    │◄─│ one tx / sale  │─►│ tenant → graph   │  │   │
//! │  │   │ Repositories  │  │ ledger steps   │  │ by generation    │  │   │
//! │  │   └───────────────┘  └────────────────┘  └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   migrations/sqlite/001_catalog_and_credit.sql, 002_sales.sql   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`conversion_cache`] - Per-tenant conversion graph cache
//! - [`checkout`] - The sale transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ventas_db::{CheckoutSettings, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ventas.db")).await?;
//!
//! let handle = db.graph_cache().get_or_build("t1", db.pool()).await?;
//! let factor = handle.resolve("kg", "lb");
//!
//! let receipt = db
//!     .checkout(CheckoutSettings::default())
//!     .create_sale(&ctx, &request)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod conversion_cache;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, CheckoutResult, CheckoutService, CheckoutSettings};
pub use conversion_cache::ConversionGraphCache;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::credit::CreditRepository;
pub use repository::fiscal::FiscalRepository;
pub use repository::product::ProductRepository;
pub use repository::register::CashRegisterRepository;
pub use repository::sale::SaleRepository;
pub use repository::unit::UnitRepository;
