//! # API Error Type
//!
//! Unified error type for the procedures.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Ventas                                 │
//! │                                                                         │
//! │  Caller                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  create_sale(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Procedure                                                       │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │               (logged, generic message)  │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Business Error? ─── CoreError::InsufficientStock ─ ApiError ──►│  │
//! │  │         │               (message shown verbatim)                 │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for CEM-01: available 1.5, ..." }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use ventas_core::{CoreError, ValidationError};
use ventas_db::{CheckoutError, DbError};

use crate::state::ConfigError;

/// Error returned from the procedures.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CREDIT_DENIED",
///   "message": "Credit denied: clients with classification D cannot buy on credit"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Credit policy rejected the sale
    CreditDenied,

    /// Not enough stock to deliver now
    InsufficientStock,

    /// Fiscal number range used up; needs an administrator
    SequenceExhausted,

    /// Cashier has no open register
    NoOpenCashRegister,

    /// Database operation failed
    DatabaseError,

    /// Configuration could not be loaded
    ConfigError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::Validation(e) => ApiError::validation(e.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation(e) => {
                tracing::error!("Check constraint failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::ConnectionFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database connection failed"),
            DbError::MigrationFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database migration failed"),
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted"),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors. Messages are shown as-is.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) | CoreError::ClientNotFound(_) | CoreError::FiscalDocumentTypeNotFound(_) => {
                ErrorCode::NotFound
            }
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InsufficientCash { .. } | CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::CreditDenied(_) => ErrorCode::CreditDenied,
            CoreError::ExhaustedSequence { .. } => ErrorCode::SequenceExhausted,
            CoreError::NoOpenCashRegister { .. } => ErrorCode::NoOpenCashRegister,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Core(e) => e.into(),
            CheckoutError::Db(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use ventas_core::{CreditDenial, Quantity};

    #[test]
    fn test_domain_messages_are_kept() {
        let err = ApiError::from(CheckoutError::Core(CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            sku: "CEM-01".to_string(),
            available: Quantity::from_milli(1_500),
            requested: Quantity::from_milli(2_268),
        }));
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock for CEM-01: available 1.5, requested 2.268");

        let err = ApiError::from(CoreError::CreditDenied(CreditDenial::ClassificationD));
        assert_eq!(err.code, ErrorCode::CreditDenied);
        assert!(err.message.contains("classification D"));
    }

    #[test]
    fn test_database_details_are_hidden() {
        let err = ApiError::from(CheckoutError::Db(DbError::QueryFailed("disk I/O error at page 42".to_string())));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::new(ErrorCode::SequenceExhausted, "exhausted");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "SEQUENCE_EXHAUSTED");
        assert_eq!(json["message"], "exhausted");
    }
}
