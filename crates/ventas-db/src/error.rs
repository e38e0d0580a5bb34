//! # Database Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──► DbError ──► CheckoutError ──► ApiError                 │
//! │                  (here)      (sale flow)       (apps/ventas)            │
//! │                                                                         │
//! │  Constraint failures keep their kind so callers can turn them into     │
//! │  domain answers ("sku already exists", "register already open").       │
//! │  Everything else is opaque to the caller and logged at the edge.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use ventas_core::ValidationError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row. `field` is `table.column` as SQLite
    /// reports it unless the repository renamed it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK or NOT NULL constraint, e.g. a negative stock or balance.
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Part of a SQLite constraint message after `"... constraint failed: "`.
fn constraint_target(message: &str) -> &str {
    message
        .split_once("constraint failed: ")
        .map(|(_, target)| target)
        .unwrap_or(message)
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::duplicate(constraint_target(message), "unknown"),
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: message.to_string(),
                    },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation(constraint_target(message).to_string())
                    }
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: products.tenant_id, products.sku"),
            "products.tenant_id, products.sku"
        );
        assert_eq!(constraint_target("CHECK constraint failed: stock_milli >= 0"), "stock_milli >= 0");
        assert_eq!(constraint_target("disk I/O error"), "disk I/O error");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(DbError::from(sqlx::Error::RowNotFound), DbError::NotFound { .. }));
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
    }
}
