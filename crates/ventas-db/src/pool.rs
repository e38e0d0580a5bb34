//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  App startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool settings                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← pool + migrations + empty graph cache   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐  ┌──────────────────────┐ │
//! │  │            SqlitePool                    │  │ ConversionGraphCache │ │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │  │ (shared by clones)   │ │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  └──────────────────────┘ │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  A sale holds one connection for its whole transaction; other          │
//! │  procedures keep running on the remaining connections.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers don't block the writer and the writer doesn't block readers,
//! so credit evaluations and conversion lookups stay responsive while a
//! sale commits.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::checkout::{CheckoutService, CheckoutSettings};
use crate::conversion_cache::ConversionGraphCache;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::client::ClientRepository;
use crate::repository::credit::CreditRepository;
use crate::repository::fiscal::FiscalRepository;
use crate::repository::product::ProductRepository;
use crate::repository::register::CashRegisterRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::unit::UnitRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for one SQLite file.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/ventas/ventas.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first connect. `:memory:` for tests.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (default 5).
    pub max_connections: u32,

    /// Connections kept open while idle (default 1).
    pub min_connections: u32,

    /// Wait for a pooled connection before giving up with `PoolExhausted`.
    pub acquire_timeout: Duration,

    /// How long a writer waits on SQLite's lock before `SQLITE_BUSY`.
    /// Concurrent sales queue here instead of failing.
    pub busy_timeout: Duration,

    /// Apply embedded migrations when connecting (default on).
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory database with migrations applied.
    ///
    /// SQLite gives every connection its own `:memory:` database, so the
    /// pool is pinned to a single connection. Each call is isolated from
    /// every other.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: clones share the pool and the conversion graph cache.
///
/// ## Usage in Procedures
/// ```rust,ignore
/// async fn evaluate_credit(db: &Database, ctx: &SaleContext, client_id: &str, total: Money)
///     -> Result<CreditDecision, ApiError>
/// {
///     let today = Utc::now().date_naive();
///     Ok(db.credits().evaluate(&ctx.tenant_id, client_id, total, today).await?)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Tenant conversion graphs, built on demand.
    graph_cache: Arc<ConversionGraphCache>,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    ///
    /// Connections run in WAL mode with `synchronous = NORMAL`, enforced
    /// foreign keys and the configured busy timeout.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ventas database");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database {
            pool,
            graph_cache: Arc::new(ConversionGraphCache::new()),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call again.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for the orchestrator and the graph cache.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn graph_cache(&self) -> &ConversionGraphCache {
        &self.graph_cache
    }

    /// Units and conversion edges.
    pub fn units(&self) -> UnitRepository {
        UnitRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    /// Credit accounts, receivables, alerts and history.
    pub fn credits(&self) -> CreditRepository {
        CreditRepository::new(self.pool.clone())
    }

    pub fn fiscal(&self) -> FiscalRepository {
        FiscalRepository::new(self.pool.clone())
    }

    pub fn registers(&self) -> CashRegisterRepository {
        CashRegisterRepository::new(self.pool.clone())
    }

    /// Read side of committed sales.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Sale orchestrator sharing this pool and cache.
    pub fn checkout(&self, settings: CheckoutSettings) -> CheckoutService {
        CheckoutService::new(self.clone(), settings)
    }

    /// Waits for checked-out connections and closes the pool. Later calls
    /// on any clone fail.
    pub async fn close(&self) {
        debug!("Closing ventas database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
