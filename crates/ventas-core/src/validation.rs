//! # Validation Module
//!
//! Input validation for the sales core.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Procedure surface (apps/ventas)                              │
//! │  └── Type validation (JSON deserialization into SaleRequest)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, before any transaction opens                    │
//! │  ├── Request shape (lines present, payment method, client for credit)  │
//! │  └── Reference data (SKU, unit codes, conversion factors)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (factor > 0), CHECK (stock_milli >= 0)                      │
//! │  └── UNIQUE / FOREIGN KEY constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::sale::SaleRequest;
use crate::{MAX_LINE_QUANTITY, MAX_REQUEST_AMOUNT, MAX_SALE_EXTRAS, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Reference Data
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters after trimming
/// - letters, digits, hyphens and underscores only
///
/// ```rust
/// use ventas_core::validation::validate_sku;
///
/// assert!(validate_sku("CEM-42.5").is_err());
/// assert!(validate_sku("CEM-425").is_ok());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (products, units, clients).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a unit code such as `kg` or `m2`.
pub fn validate_unit_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("unit code"));
    }

    if code.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "unit code".to_string(),
            max: 20,
        });
    }

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "unit code".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a declared conversion edge.
///
/// ## Rules
/// - factor is finite and strictly positive
/// - the two units differ (identity needs no edge)
pub fn validate_conversion_factor(unit_from: &str, unit_to: &str, factor: f64) -> ValidationResult<()> {
    if unit_from.trim().is_empty() {
        return Err(ValidationError::required("unit_from"));
    }
    if unit_to.trim().is_empty() {
        return Err(ValidationError::required("unit_to"));
    }
    if unit_from == unit_to {
        return Err(ValidationError::not_permitted(
            "conversion edge",
            "source and target unit are the same",
        ));
    }
    if !factor.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "factor".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if factor <= 0.0 {
        return Err(ValidationError::must_be_positive("factor"));
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Sale Request
// =============================================================================

fn check_quantity(field: &str, quantity: Quantity) -> ValidationResult<()> {
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive(field));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::Exceeds {
            field: field.to_string(),
            limit: MAX_LINE_QUANTITY.to_string(),
        });
    }
    Ok(())
}

fn check_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if amount > MAX_REQUEST_AMOUNT {
        return Err(ValidationError::Exceeds {
            field: field.to_string(),
            limit: MAX_REQUEST_AMOUNT.to_string(),
        });
    }
    Ok(())
}

/// Validates the shape of a sale request.
///
/// Checks only what can be decided from the request itself; stock, credit
/// and cash sufficiency need priced totals or stored data and are checked
/// later.
///
/// ## User Workflow
/// ```text
/// Cashier submits sale
///      │
///      ▼
/// validate_sale_request ← THIS FUNCTION
///      │
///      ├── no lines?                 → "lines is required"
///      ├── no payment method?        → "paymentMethod is required"
///      ├── credit without client?    → "clientId is required"
///      ├── credit with cash amount?  → "cashReceived is not allowed"
///      ├── quantity or amount beyond the request limits → rejected
///      │
///      └── OK → pricing, credit pre-check, transaction
/// ```
pub fn validate_sale_request(request: &SaleRequest) -> ValidationResult<()> {
    if request.fiscal_document_type_id.trim().is_empty() {
        return Err(ValidationError::required("fiscalDocumentTypeId"));
    }

    if request.lines.is_empty() {
        return Err(ValidationError::required("lines"));
    }
    if request.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }
    if request.extras.len() > MAX_SALE_EXTRAS {
        return Err(ValidationError::OutOfRange {
            field: "extras".to_string(),
            min: 0,
            max: MAX_SALE_EXTRAS as i64,
        });
    }

    for line in &request.lines {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required("productId"));
        }
        check_quantity("quantity", line.quantity)?;
    }

    for extra in &request.extras {
        check_quantity("extra quantity", extra.quantity)?;
        check_amount("extra unit price", extra.unit_price)?;
    }

    let method = request
        .payment_method
        .ok_or_else(|| ValidationError::required("paymentMethod"))?;

    if method.is_credit() {
        let has_client = request
            .client_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_client {
            return Err(ValidationError::required("clientId"));
        }
        if request.cash_received.is_some() {
            return Err(ValidationError::not_permitted(
                "cashReceived",
                "credit sales do not take cash",
            ));
        }
    }

    check_amount("discount", request.totals.discount)?;
    if let Some(cash) = request.cash_received {
        check_amount("cashReceived", cash)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
