//! # Error Types
//!
//! Domain-specific error types for ventas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ventas-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Malformed input                                │
//! │  └── CreditDenial     - Credit policy rejections (credit.rs)           │
//! │                                                                         │
//! │  ventas-db errors                                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── CheckoutError    - CoreError | DbError during a sale              │
//! │                                                                         │
//! │  apps/ventas                                                           │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Conversion gaps are deliberately absent: a missing conversion path is a
//! [`crate::ConversionOutcome::Unconverted`], never an error.

use thiserror::Error;

use crate::credit::CreditDenial;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist for the tenant (or is inactive).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Client does not exist for the tenant.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Fiscal document type does not exist, is inactive, or belongs to
    /// another tenant.
    #[error("Fiscal document type not found: {0}")]
    FiscalDocumentTypeNotFound(String),

    /// Not enough stock to fulfill the requested base quantity now.
    ///
    /// ## User Workflow
    /// ```text
    /// Line: 5 lb of cement (≈ 2.268 kg to deliver now)
    ///      │
    ///      ▼
    /// Check stock: available = 1.5 kg
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "CEM-01", available: 1.5, requested: 2.268 }
    ///      │
    ///      ▼
    /// Transaction rolled back, caller resubmits with adjusted quantities
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Cash tendered does not cover the sale total.
    #[error("Insufficient cash: total {total}, received {received}")]
    InsufficientCash { total: Money, received: Money },

    /// Credit policy rejected the sale.
    #[error("Credit denied: {0}")]
    CreditDenied(#[from] CreditDenial),

    /// The fiscal sequence for this document type has reached its bound.
    ///
    /// Requires administrator action (a new authorised range).
    #[error("Fiscal sequence exhausted for document type {document_type} (limit {sequence_end})")]
    ExhaustedSequence {
        document_type: String,
        sequence_end: i64,
    },

    /// The cashier has no open cash register.
    #[error("No open cash register for user {user_id}")]
    NoOpenCashRegister { user_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any transaction is opened and are reported
/// verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value must be a whole number.
    #[error("{field} must be a whole number")]
    MustBeWhole { field: String },

    /// Value is larger than the amount it is bounded by.
    #[error("{field} must not exceed {limit}")]
    Exceeds { field: String, limit: String },

    /// An amount or quantity left the representable range.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Invalid format (e.g. a non-finite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field must not be provided in this context.
    #[error("{field} is not allowed: {reason}")]
    NotPermitted { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::MustBePositive`].
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::TooLarge`].
    pub fn too_large(field: impl Into<String>) -> Self {
        ValidationError::TooLarge {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::NotPermitted`].
    pub fn not_permitted(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::NotPermitted {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            sku: "CEM-01".to_string(),
            available: Quantity::from_milli(1_500),
            requested: Quantity::from_milli(2_268),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for CEM-01: available 1.5, requested 2.268"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("payment method").to_string(),
            "payment method is required"
        );
        assert_eq!(
            ValidationError::not_permitted("cash received", "credit sales take no cash")
                .to_string(),
            "cash received is not allowed: credit sales take no cash"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("lines").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_credit_denial_converts_to_core_error() {
        let core_err: CoreError = CreditDenial::ClassificationD.into();
        assert!(matches!(core_err, CoreError::CreditDenied(CreditDenial::ClassificationD)));
    }
}
