//! # Procedures
//!
//! The server-side calls the sales screens make.
//!
//! ## Organization
//! ```text
//! commands/
//! ├── mod.rs         ◄─── You are here (exports)
//! ├── conversion.rs  ◄─── resolve_conversion_factor, convert_quantity
//! ├── credit.rs      ◄─── evaluate_credit
//! └── sale.rs        ◄─── create_sale
//! ```
//!
//! ## How a Procedure Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller (session layer, CLI)                                            │
//! │  ─────────────────────────                                              │
//! │  tenant_id, user_id  ◄── from the caller's session, never the body      │
//! │  JSON request        ◄── camelCase, deserialized with serde             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn create_sale(                                                  │
//! │      db: &DbState,          ◄── shared state                            │
//! │      ctx: &SaleContext,     ◄── tenant + user                           │
//! │      request: &SaleRequest, ◄── body                                    │
//! │  ) -> Result<SaleReceipt, ApiError>                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  JSON response or { code, message }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod conversion;
pub mod credit;
pub mod sale;

use crate::error::ApiError;

/// Rejects a blank identifier.
pub(crate) fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(())
}
