//! # Domain Types
//!
//! Reference records the sales core reads: units, products, clients,
//! fiscal document types and cash registers.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │      Unit       │   │      Product        │   │     Client      │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  id, code       │◄──│  base_unit_id       │   │  id, name       │   │
//! │  │  measure_kind   │◄──│  sale_unit_id?      │   │  total_purchases│   │
//! │  │  allows_decimals│   │  price_per_base_unit│   │  purchase_count │   │
//! │  └─────────────────┘   │  stock (Quantity)   │   └─────────────────┘   │
//! │                        └─────────────────────┘                          │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────┐   ┌─────────────────┐    │
//! │  │ FiscalDocumentType  │  │  CashRegister   │   │  PaymentMethod  │    │
//! │  │  ─────────────────  │  │  ─────────────  │   │  ─────────────  │    │
//! │  │  prefix  "B01"      │  │  user_id        │   │  Cash, Credit…  │    │
//! │  │  current_sequence   │  │  is_open        │   │  register_bucket│    │
//! │  │  sequence_end       │  │  bucket totals  │   └─────────────────┘    │
//! │  └─────────────────────┘  └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenancy
//! Every record carries a `tenant_id`. Units may be global (`tenant_id` is
//! `None`) and are then visible to every tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::quantity::Quantity;
use crate::FISCAL_SEQUENCE_WIDTH;

/// Generates a new primary key (UUID v4).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1800 bps = 18% (ITBIS).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Units
// =============================================================================

/// What a unit measures. Conversions are only declared within one kind,
/// but the resolver does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MeasureKind {
    Mass,
    Volume,
    Length,
    Area,
    Count,
}

/// A measurement unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Unit {
    pub id: String,
    /// `None` for units shared by every tenant.
    pub tenant_id: Option<String>,
    /// Short machine code, e.g. `kg`.
    pub code: String,
    pub name: String,
    pub abbreviation: String,
    pub measure_kind: MeasureKind,
    /// Whether fractional quantities may be sold in this unit.
    pub allows_decimals: bool,
    pub is_active: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product as seen by the sales core.
///
/// Stock and price are both expressed in the base unit; any other unit is
/// reached through the tenant's conversion graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub sku: String,
    pub name: String,

    /// Unit in which stock and the canonical price are stored.
    pub base_unit_id: String,

    /// Unit proposed by default at the counter.
    pub sale_unit_id: Option<String>,

    /// Price of one base unit.
    pub price_per_base_unit: Money,

    /// Current stock in base units.
    #[ts(type = "number")]
    pub stock: Quantity,

    /// Whether the sales tax applies to this product.
    pub tax_applicable: bool,

    /// Whether fractional quantities may be sold.
    pub allows_decimals: bool,

    pub is_active: bool,
}

impl Product {
    /// The unit used when a sale line does not name one.
    pub fn default_unit_id(&self) -> &str {
        self.sale_unit_id.as_deref().unwrap_or(&self.base_unit_id)
    }
}

// =============================================================================
// Client
// =============================================================================

/// A customer with running purchase aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Tax id (RNC / cédula).
    pub document_number: Option<String>,
    pub total_purchases: Money,
    pub purchase_count: i64,
    #[ts(as = "Option<String>")]
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    DebitCard,
    CreditCard,
    Transfer,
    Check,
    /// Store credit: creates a receivable instead of collecting payment.
    Credit,
}

impl PaymentMethod {
    /// True for store-credit sales.
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }

    /// The cash-register bucket this method accumulates into.
    ///
    /// Credit sales only count towards the register's total sales, so they
    /// have no bucket.
    pub const fn register_bucket(&self) -> Option<RegisterBucket> {
        match self {
            PaymentMethod::Cash => Some(RegisterBucket::Cash),
            PaymentMethod::DebitCard => Some(RegisterBucket::DebitCard),
            PaymentMethod::CreditCard => Some(RegisterBucket::CreditCard),
            PaymentMethod::Transfer => Some(RegisterBucket::Transfer),
            PaymentMethod::Check => Some(RegisterBucket::Check),
            PaymentMethod::Credit => None,
        }
    }
}

/// Per-method running totals kept on a cash register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterBucket {
    Cash,
    DebitCard,
    CreditCard,
    Transfer,
    Check,
}

// =============================================================================
// Fulfillment
// =============================================================================

/// Whether goods leave the store with the sale or are dispatched over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    #[default]
    Complete,
    Partial,
}

// =============================================================================
// Fiscal Document Type
// =============================================================================

/// A fiscal receipt type with its bounded number sequence.
///
/// ```text
///   prefix "B01", current_sequence 41, sequence_end 500
///        │
///        ▼  next issuance
///   B0100000042   (current_sequence becomes 42)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalDocumentType {
    pub id: String,
    pub tenant_id: String,
    /// Short code, e.g. `B01` (tax credit) or `B02` (final consumer).
    pub code: String,
    pub name: String,
    pub prefix: String,
    /// Last number issued (0 when none yet).
    pub current_sequence: i64,
    /// Highest number that may be issued.
    pub sequence_end: i64,
    pub is_active: bool,
}

impl FiscalDocumentType {
    /// True when no further numbers can be issued.
    pub fn is_exhausted(&self) -> bool {
        self.current_sequence >= self.sequence_end
    }

    /// Formats a fiscal number (NCF) from a prefix and sequence.
    ///
    /// ```rust
    /// use ventas_core::FiscalDocumentType;
    ///
    /// assert_eq!(FiscalDocumentType::fiscal_number("B01", 1), "B0100000001");
    /// ```
    pub fn fiscal_number(prefix: &str, sequence: i64) -> String {
        format!("{prefix}{sequence:0width$}", width = FISCAL_SEQUENCE_WIDTH)
    }
}

/// Formats the tenant-internal sale number.
///
/// ```rust
/// assert_eq!(ventas_core::types::internal_number("VT-", 7), "VT-00000007");
/// ```
pub fn internal_number(prefix: &str, sequence: i64) -> String {
    format!("{prefix}{sequence:0width$}", width = FISCAL_SEQUENCE_WIDTH)
}

// =============================================================================
// Cash Register
// =============================================================================

/// An open (or closed) cash drawer session for one cashier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashRegister {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub is_open: bool,
    pub opening_amount: Money,
    pub total_sales: Money,
    pub total_cash: Money,
    pub total_debit_card: Money,
    pub total_credit_card: Money,
    pub total_transfer: Money,
    pub total_check: Money,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
}

impl CashRegister {
    /// Running total for one bucket.
    pub fn bucket_total(&self, bucket: RegisterBucket) -> Money {
        match bucket {
            RegisterBucket::Cash => self.total_cash,
            RegisterBucket::DebitCard => self.total_debit_card,
            RegisterBucket::CreditCard => self.total_credit_card,
            RegisterBucket::Transfer => self.total_transfer,
            RegisterBucket::Check => self.total_check,
        }
    }
}

// =============================================================================
// Caller Context
// =============================================================================

/// Who is calling. Passed explicitly into every operation instead of being
/// looked up from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleContext {
    pub tenant_id: String,
    pub user_id: String,
}

impl SaleContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        SaleContext {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
