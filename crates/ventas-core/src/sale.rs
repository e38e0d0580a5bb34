//! # Sale
//!
//! Request and response shapes of a sale, the server-side plan built from a
//! request, and the persisted sale records.
//!
//! ## From Request to Plan
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRequest (client)                                                   │
//! │   lines, extras, totals (client preview), payment method, cash          │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  plan_sale ← THIS MODULE                                                │
//! │   • validate_sale_request                                               │
//! │   • price every line through the tenant's GraphHandle                   │
//! │   • price extras                                                        │
//! │   • recompute totals; client preview only produces warnings             │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  SalePlan (server truth)                                                │
//! │   priced lines, priced extras, totals, stock demand per product         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts travel as integer cents, quantities as plain decimal numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::conversion::FactorSource;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{price_extra, price_line, PricedExtra, PricedLine, PricingWarning};
use crate::quantity::Quantity;
use crate::types::{FulfillmentType, PaymentMethod, Product, TaxRate};
use crate::validation::validate_sale_request;

// =============================================================================
// Request
// =============================================================================

/// A sale as submitted by the point-of-sale screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub fiscal_document_type_id: String,
    /// Required for credit sales.
    #[serde(default)]
    pub client_id: Option<String>,
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub extras: Vec<SaleExtraRequest>,
    /// Totals as previewed by the client. Only `discount` is taken as
    /// input; the rest is recomputed.
    #[serde(default)]
    pub totals: SaleTotals,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Cash handed over; required for cash, forbidden for credit.
    #[serde(default)]
    pub cash_received: Option<Money>,
    #[serde(default)]
    pub fulfillment_type: FulfillmentType,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One product line of a [`SaleRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub product_id: String,
    /// Quantity in `unit_id`.
    #[ts(type = "number")]
    pub quantity: Quantity,
    /// Chosen unit; defaults to the product's sale unit, then base unit.
    #[serde(default)]
    pub unit_id: Option<String>,
    /// Price echoed by the client. Compared, never trusted.
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub partial_fulfillment: bool,
    #[serde(default)]
    #[ts(type = "number | null")]
    pub quantity_to_fulfill_now: Option<Quantity>,
}

impl SaleLineRequest {
    /// A fully delivered line in the product's default unit.
    pub fn new(product_id: impl Into<String>, quantity: Quantity) -> Self {
        SaleLineRequest {
            product_id: product_id.into(),
            quantity,
            unit_id: None,
            unit_price: None,
            partial_fulfillment: false,
            quantity_to_fulfill_now: None,
        }
    }

    pub fn in_unit(mut self, unit_id: impl Into<String>) -> Self {
        self.unit_id = Some(unit_id.into());
        self
    }

    pub fn fulfill_now(mut self, quantity: Quantity) -> Self {
        self.partial_fulfillment = true;
        self.quantity_to_fulfill_now = Some(quantity);
        self
    }

    /// Chosen-unit quantity delivered with the sale.
    ///
    /// Complete sales deliver everything regardless of the line flags.
    pub fn resolve_fulfill_now(&self, fulfillment: FulfillmentType) -> Quantity {
        match fulfillment {
            FulfillmentType::Partial if self.partial_fulfillment => {
                self.quantity_to_fulfill_now.unwrap_or(self.quantity)
            }
            _ => self.quantity,
        }
    }
}

/// A non-stock charge (freight, labour, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleExtraRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_price: Money,
    #[serde(default)]
    pub tax_applicable: bool,
}

/// Monetary totals of a sale.
///
/// `taxable_base = subtotal - discount`, `total = taxable_base + tax`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub taxable_base: Money,
    pub tax: Money,
    pub total: Money,
}

impl SaleTotals {
    /// Computes totals from priced rows and a discount.
    pub fn compute(lines: &[PricedLine], extras: &[PricedExtra], discount: Money) -> CoreResult<SaleTotals> {
        let subtotal = checked_sum(
            "subtotal",
            lines
                .iter()
                .map(|l| l.amounts.subtotal)
                .chain(extras.iter().map(|e| e.amounts.subtotal)),
        )?;
        let tax = checked_sum(
            "tax",
            lines
                .iter()
                .map(|l| l.amounts.tax)
                .chain(extras.iter().map(|e| e.amounts.tax)),
        )?;

        if discount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "discount".to_string(),
            }
            .into());
        }
        if discount > subtotal {
            return Err(ValidationError::Exceeds {
                field: "discount".to_string(),
                limit: subtotal.to_string(),
            }
            .into());
        }

        let taxable_base = subtotal - discount;
        let total = taxable_base
            .checked_add(tax)
            .ok_or_else(|| ValidationError::too_large("total"))?;

        Ok(SaleTotals {
            subtotal,
            discount,
            taxable_base,
            tax,
            total,
        })
    }
}

fn checked_sum(field: &str, mut amounts: impl Iterator<Item = Money>) -> CoreResult<Money> {
    amounts
        .try_fold(Money::zero(), Money::checked_add)
        .ok_or_else(|| ValidationError::too_large(field).into())
}

// =============================================================================
// Plan
// =============================================================================

/// Server-side result of pricing a request. Everything persisted comes from
/// here.
#[derive(Debug, Clone, PartialEq)]
pub struct SalePlan {
    pub payment_method: PaymentMethod,
    pub fulfillment_type: FulfillmentType,
    pub lines: Vec<PricedLine>,
    pub extras: Vec<PricedExtra>,
    pub totals: SaleTotals,
    pub warnings: Vec<PricingWarning>,
}

impl SalePlan {
    /// Base-unit quantity to take out of stock now, per product.
    ///
    /// Saturates at the `i64` bound, which no stock level can cover.
    pub fn stock_demand(&self) -> BTreeMap<String, Quantity> {
        let mut demand: BTreeMap<String, Quantity> = BTreeMap::new();
        for line in &self.lines {
            if line.base_fulfilled.is_positive() {
                let total = demand.entry(line.product_id.clone()).or_default();
                *total = total.saturating_add(line.base_fulfilled);
            }
        }
        demand
    }

    /// True when some quantity is left for later dispatch.
    pub fn has_pending(&self) -> bool {
        self.lines.iter().any(|l| l.pending.is_positive())
    }
}

/// Prices a request against the given products.
///
/// `products` must contain every product the request names (keyed by id);
/// missing or inactive products fail with [`CoreError::ProductNotFound`].
pub fn plan_sale<S: FactorSource + ?Sized>(
    request: &SaleRequest,
    products: &HashMap<String, Product>,
    source: &S,
    rate: TaxRate,
) -> CoreResult<SalePlan> {
    validate_sale_request(request)?;

    let payment_method = request
        .payment_method
        .ok_or_else(|| ValidationError::required("paymentMethod"))?;

    let mut warnings = Vec::new();
    let mut lines = Vec::with_capacity(request.lines.len());

    for line in &request.lines {
        let product = products
            .get(&line.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let unit_id = line
            .unit_id
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| product.default_unit_id());

        let fulfill_now = line.resolve_fulfill_now(request.fulfillment_type);
        let priced = price_line(source, product, unit_id, line.quantity, fulfill_now, rate)?;

        if priced.conversion.is_degraded() {
            warnings.push(PricingWarning::ConversionUnavailable {
                product_id: product.id.clone(),
                unit_from: unit_id.to_string(),
                unit_to: product.base_unit_id.clone(),
            });
        }

        if let Some(submitted) = line.unit_price {
            if submitted != priced.unit_price {
                warnings.push(PricingWarning::UnitPriceOverridden {
                    product_id: product.id.clone(),
                    submitted,
                    computed: priced.unit_price,
                });
            }
        }

        lines.push(priced);
    }

    let extras = request
        .extras
        .iter()
        .map(|e| price_extra(&e.name, &e.kind, e.quantity, e.unit_price, e.tax_applicable, rate))
        .collect::<CoreResult<Vec<_>>>()?;

    let totals = SaleTotals::compute(&lines, &extras, request.totals.discount)?;

    let submitted = request.totals.total;
    if !submitted.is_zero() && submitted != totals.total {
        warnings.push(PricingWarning::TotalsOverridden {
            submitted,
            computed: totals.total,
        });
    }

    Ok(SalePlan {
        payment_method,
        fulfillment_type: request.fulfillment_type,
        lines,
        extras,
        totals,
        warnings,
    })
}

/// Checks the cash handed over and returns the change due.
///
/// Only cash sales need (and use) `cash_received`.
///
/// ```rust
/// use ventas_core::sale::validate_cash_tender;
/// use ventas_core::{Money, PaymentMethod};
///
/// let change = validate_cash_tender(
///     PaymentMethod::Cash,
///     Some(Money::from_cents(30000)),
///     Money::from_cents(26762),
/// ).unwrap();
/// assert_eq!(change.cents(), 3238);
/// ```
pub fn validate_cash_tender(method: PaymentMethod, cash_received: Option<Money>, total: Money) -> CoreResult<Money> {
    if method != PaymentMethod::Cash {
        return Ok(Money::zero());
    }

    let received = cash_received.ok_or_else(|| ValidationError::required("cashReceived"))?;
    if received < total {
        return Err(CoreError::InsufficientCash { total, received });
    }

    Ok(received - total)
}

// =============================================================================
// Response
// =============================================================================

/// What a committed sale returns to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: String,
    pub fiscal_number: String,
    pub internal_number: String,
    pub totals: SaleTotals,
    /// Change due for cash sales, zero otherwise.
    pub change: Money,
    /// Non-fatal findings such as unconverted lines.
    pub warnings: Vec<PricingWarning>,
}

// =============================================================================
// Persisted Records
// =============================================================================

/// A committed sale header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub fiscal_document_type_id: String,
    pub fiscal_number: String,
    pub internal_number: String,
    pub client_id: Option<String>,
    pub cash_register_id: String,
    pub user_id: String,
    pub payment_method: PaymentMethod,
    pub fulfillment_type: FulfillmentType,
    pub totals: SaleTotals,
    pub cash_received: Option<Money>,
    pub change: Money,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A committed sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub line_number: i64,
    pub product_id: String,
    pub unit_id: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    #[ts(type = "number")]
    pub base_quantity: Quantity,
    #[ts(type = "number")]
    pub quantity_fulfilled: Quantity,
    #[ts(type = "number")]
    pub quantity_pending: Quantity,
    pub unit_price: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// A committed extra charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleExtra {
    pub id: String,
    pub sale_id: String,
    pub name: String,
    pub kind: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_price: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Delivery record for a partially fulfilled sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dispatch {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub dispatch_number: i64,
    pub lines: Vec<DispatchLine>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DispatchLine {
    pub id: String,
    pub dispatch_id: String,
    pub sale_line_id: String,
    pub product_id: String,
    /// Chosen-unit quantity handed over in this dispatch.
    #[ts(type = "number")]
    pub quantity_dispatched: Quantity,
    /// Chosen-unit quantity still owed after it.
    #[ts(type = "number")]
    pub quantity_pending: Quantity,
    #[ts(type = "number")]
    pub base_quantity_dispatched: Quantity,
}

/// A stock change with the level it left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub sale_id: Option<String>,
    /// `sale` for stock leaving with a sale.
    pub movement_type: String,
    /// Signed base-unit change (negative for outgoing stock).
    #[ts(type = "number")]
    pub quantity: Quantity,
    #[ts(type = "number")]
    pub stock_before: Quantity,
    #[ts(type = "number")]
    pub stock_after: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
