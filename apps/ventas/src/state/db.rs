//! # Database State
//!
//! Wraps the `Database` and the checkout service for use in procedures.
//!
//! ## Thread Safety
//! `Database` holds a `SqlitePool` and an `Arc`'d graph cache; both are safe
//! to share. Procedures can run concurrently without extra locking.

use tracing::info;

use ventas_db::{CheckoutService, Database};

use crate::state::AppConfig;

/// Database handle plus the checkout service configured for it.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
    checkout: CheckoutService,
}

impl DbState {
    /// Opens the configured database and applies pending migrations.
    pub async fn open(config: &AppConfig) -> Result<Self, ventas_db::DbError> {
        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database_path.display(), "Database connected and migrations applied");
        Ok(DbState::new(db, config))
    }

    pub fn new(db: Database, config: &AppConfig) -> Self {
        let checkout = db.checkout(config.checkout_settings());
        DbState { db, checkout }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    pub fn checkout(&self) -> &CheckoutService {
        &self.checkout
    }
}
