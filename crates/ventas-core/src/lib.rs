//! # ventas-core: Pure Business Logic for the Sales Module
//!
//! This crate holds the calculation side of a sale: unit conversion,
//! pricing, credit gating and sale planning. Everything here is a pure
//! function over plain data; `ventas-db` feeds it rows and persists the
//! results.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Sales Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/ventas (procedure surface)                    │   │
//! │  │   resolve_conversion_factor, evaluate_credit, create_sale       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ventas-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌────────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐ │   │
//! │  │  │ conversion │ │ pricing  │ │  credit  │ │      sale        │ │   │
//! │  │  │ Graph      │ │ Priced-  │ │ evaluate │ │ SaleRequest      │ │   │
//! │  │  │ Handle     │ │ Line     │ │ _credit  │ │ plan_sale        │ │   │
//! │  │  └────────────┘ └──────────┘ └──────────┘ └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         ventas-db (repositories, graph cache, checkout)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Unit, Product, FiscalDocumentType, ...)
//! - [`money`] - Integer-cent money
//! - [`quantity`] - Fixed-point quantities (thousandths)
//! - [`conversion`] - Unit conversion graph and per-operation handle
//! - [`pricing`] - Line pricing in the chosen unit
//! - [`credit`] - Credit accounts and eligibility
//! - [`sale`] - Sale request/response shapes and planning
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ventas_core::conversion::{ConversionEdge, ConversionGraph};
//!
//! let graph = ConversionGraph::build(vec![
//!     ConversionEdge::new("t1", "kg", "lb", 2.20462),
//! ]);
//!
//! assert_eq!(graph.resolve("kg", "kg"), Some(1.0));
//! assert_eq!(graph.resolve("kg", "lb"), Some(2.20462));
//! let back = graph.resolve("lb", "kg").unwrap();
//! assert!((back - 1.0 / 2.20462).abs() < 1e-12);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod conversion;
pub mod credit;
pub mod error;
pub mod money;
pub mod pricing;
pub mod quantity;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use conversion::{ConversionEdge, ConversionGraph, ConversionOutcome, FactorSource, GraphHandle};
pub use credit::{CreditAccount, CreditDecision, CreditDenial, CreditStanding};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use sale::{SaleReceipt, SaleRequest, SaleTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of product lines accepted in one sale.
pub const MAX_SALE_LINES: usize = 200;

/// Maximum number of extras (freight, labour, ...) accepted in one sale.
pub const MAX_SALE_EXTRAS: usize = 50;

/// Largest quantity accepted on a line or extra (one billion units).
pub const MAX_LINE_QUANTITY: Quantity = Quantity::from_units(1_000_000_000);

/// Largest amount accepted from a request (ten trillion cents).
pub const MAX_REQUEST_AMOUNT: Money = Money::from_cents(10_000_000_000_000);

/// Width of the zero-padded sequence part of a fiscal number (NCF).
pub const FISCAL_SEQUENCE_WIDTH: usize = 8;
