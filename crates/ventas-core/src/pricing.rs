//! # Pricing
//!
//! Prices a sale line in the unit the customer chose.
//!
//! ## Line Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product: Cement, base unit kg, $100.00/kg, taxable                     │
//! │  Line:    5 lb                                                          │
//! │                                                                         │
//! │  factor(lb → kg) = 0.45359…        (one lookup, memoised by handle)    │
//! │       │                                                                 │
//! │       ├──► priced_quantity       5 lb × 0.45359… = 2.268 kg            │
//! │       │                                                                 │
//! │       └──► price_per_chosen_unit $100.00 × 0.45359… = $45.36 / lb      │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │            line_amounts          subtotal 5 × $45.36 = $226.80         │
//! │                                  tax 18%             = $40.82          │
//! │                                  total               = $267.62         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Degraded Conversion
//! When the chosen unit has no path to the base unit, the quantity and the
//! price are used unconverted. The line still prices, and the outcome is
//! reported as [`ConversionOutcome::Unconverted`] plus a
//! [`PricingWarning::ConversionUnavailable`].
//!
//! ## Overflow
//! Every product and sum is checked. An amount or quantity that leaves the
//! `i64` range fails the line with [`ValidationError::TooLarge`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::conversion::{ConversionOutcome, ConvertedQuantity, FactorSource};
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Product, TaxRate};

// =============================================================================
// Building Blocks
// =============================================================================

/// Converts a chosen-unit quantity into the product's base unit.
pub fn priced_quantity<S: FactorSource + ?Sized>(
    source: &S,
    product: &Product,
    unit_id: &str,
    quantity: Quantity,
) -> CoreResult<ConvertedQuantity> {
    crate::conversion::convert_quantity(source, quantity, unit_id, &product.base_unit_id)
}

/// Price of one chosen unit, derived from the base-unit price.
///
/// Falls back to the base-unit price when no conversion exists.
pub fn price_per_chosen_unit<S: FactorSource + ?Sized>(
    source: &S,
    product: &Product,
    unit_id: &str,
) -> CoreResult<(Money, ConversionOutcome)> {
    let outcome = lookup(source, product, unit_id);
    Ok((price_with(product, outcome)?, outcome))
}

fn lookup<S: FactorSource + ?Sized>(source: &S, product: &Product, unit_id: &str) -> ConversionOutcome {
    let base = product.base_unit_id.as_str();
    ConversionOutcome::from_lookup(unit_id, base, source.factor(unit_id, base))
}

fn price_with(product: &Product, outcome: ConversionOutcome) -> CoreResult<Money> {
    match outcome {
        ConversionOutcome::Converted { factor } => product
            .price_per_base_unit
            .checked_apply_factor(factor)
            .ok_or_else(|| ValidationError::too_large(format!("unit price of {}", product.sku)).into()),
        ConversionOutcome::Identity | ConversionOutcome::Unconverted => Ok(product.price_per_base_unit),
    }
}

/// Subtotal, tax and total of one priced row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// `subtotal = quantity × unit_price`, tax only when applicable.
///
/// ```rust
/// use ventas_core::pricing::line_amounts;
/// use ventas_core::{Money, Quantity, TaxRate};
///
/// let amounts = line_amounts(
///     Quantity::from_units(5),
///     Money::from_cents(4536),
///     true,
///     TaxRate::from_bps(1800),
/// ).unwrap();
/// assert_eq!(amounts.subtotal.cents(), 22680);
/// assert_eq!(amounts.tax.cents(), 4082);
/// assert_eq!(amounts.total.cents(), 26762);
/// ```
pub fn line_amounts(
    quantity: Quantity,
    unit_price: Money,
    tax_applicable: bool,
    rate: TaxRate,
) -> CoreResult<LineAmounts> {
    let subtotal = quantity
        .checked_times_price(unit_price)
        .ok_or_else(|| ValidationError::too_large("line subtotal"))?;
    let tax = if tax_applicable {
        subtotal.calculate_tax(rate)
    } else {
        Money::zero()
    };
    let total = subtotal
        .checked_add(tax)
        .ok_or_else(|| ValidationError::too_large("line total"))?;

    Ok(LineAmounts { subtotal, tax, total })
}

/// Base-unit share of a partially fulfilled line.
///
/// Takes the proportion of the already converted base quantity instead of
/// converting the fulfilled quantity again.
pub fn fulfilled_base_quantity(base_quantity: Quantity, quantity: Quantity, fulfill_now: Quantity) -> Quantity {
    if fulfill_now == quantity {
        base_quantity
    } else {
        base_quantity.proportion(fulfill_now, quantity)
    }
}

// =============================================================================
// Priced Line
// =============================================================================

/// A fully priced product line, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub sku: String,
    pub unit_id: String,
    pub base_unit_id: String,
    /// Quantity in the chosen unit.
    #[ts(type = "number")]
    pub quantity: Quantity,
    /// Full line quantity in base units.
    #[ts(type = "number")]
    pub base_quantity: Quantity,
    /// Chosen-unit quantity delivered with the sale.
    #[ts(type = "number")]
    pub fulfill_now: Quantity,
    /// Chosen-unit quantity left for later dispatch.
    #[ts(type = "number")]
    pub pending: Quantity,
    /// Base-unit stock decrement for this line.
    #[ts(type = "number")]
    pub base_fulfilled: Quantity,
    pub unit_price: Money,
    pub amounts: LineAmounts,
    pub tax_applicable: bool,
    pub conversion: ConversionOutcome,
}

/// Prices one product line.
///
/// ## Rules
/// - `quantity` must be positive
/// - products without decimals reject fractional quantities
/// - `fulfill_now` must lie within `0..=quantity`
pub fn price_line<S: FactorSource + ?Sized>(
    source: &S,
    product: &Product,
    unit_id: &str,
    quantity: Quantity,
    fulfill_now: Quantity,
    rate: TaxRate,
) -> CoreResult<PricedLine> {
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive("quantity").into());
    }
    if !product.allows_decimals && !quantity.is_whole() {
        return Err(ValidationError::MustBeWhole {
            field: format!("quantity of {}", product.sku),
        }
        .into());
    }
    if fulfill_now.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantityToFulfillNow".to_string(),
        }
        .into());
    }
    if fulfill_now > quantity {
        return Err(ValidationError::Exceeds {
            field: "quantityToFulfillNow".to_string(),
            limit: quantity.to_string(),
        }
        .into());
    }

    let conversion = lookup(source, product, unit_id);
    let base_quantity = match conversion {
        ConversionOutcome::Converted { factor } => quantity
            .checked_convert(factor)
            .ok_or_else(|| ValidationError::too_large(format!("quantity of {}", product.sku)))?,
        ConversionOutcome::Identity | ConversionOutcome::Unconverted => quantity,
    };
    let unit_price = price_with(product, conversion)?;
    let amounts = line_amounts(quantity, unit_price, product.tax_applicable, rate)?;

    Ok(PricedLine {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        unit_id: unit_id.to_string(),
        base_unit_id: product.base_unit_id.clone(),
        quantity,
        base_quantity,
        fulfill_now,
        pending: quantity - fulfill_now,
        base_fulfilled: fulfilled_base_quantity(base_quantity, quantity, fulfill_now),
        unit_price,
        amounts,
        tax_applicable: product.tax_applicable,
        conversion,
    })
}

// =============================================================================
// Extras
// =============================================================================

/// A priced non-stock charge (freight, labour, cutting, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedExtra {
    pub name: String,
    pub kind: String,
    #[ts(type = "number")]
    pub quantity: Quantity,
    pub unit_price: Money,
    pub amounts: LineAmounts,
    pub tax_applicable: bool,
}

/// Prices an extra charge with the same tax rule as product lines.
pub fn price_extra(
    name: &str,
    kind: &str,
    quantity: Quantity,
    unit_price: Money,
    tax_applicable: bool,
    rate: TaxRate,
) -> CoreResult<PricedExtra> {
    if name.trim().is_empty() {
        return Err(ValidationError::required("extra name").into());
    }
    if !quantity.is_positive() {
        return Err(ValidationError::must_be_positive("extra quantity").into());
    }
    if unit_price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "extra unit price".to_string(),
        }
        .into());
    }

    Ok(PricedExtra {
        name: name.trim().to_string(),
        kind: kind.to_string(),
        quantity,
        unit_price,
        amounts: line_amounts(quantity, unit_price, tax_applicable, rate)?,
        tax_applicable,
    })
}

// =============================================================================
// Warnings
// =============================================================================

/// Non-fatal findings returned alongside a successful sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingWarning {
    /// No conversion path from the chosen unit to the base unit; the line
    /// was priced and stocked unconverted.
    ConversionUnavailable {
        product_id: String,
        unit_from: String,
        unit_to: String,
    },
    /// The unit price echoed by the client differed from the server price.
    UnitPriceOverridden {
        product_id: String,
        submitted: Money,
        computed: Money,
    },
    /// The client-computed totals differed from the server totals.
    TotalsOverridden { submitted: Money, computed: Money },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionEdge, ConversionGraph};
    use crate::error::CoreError;

    fn cement() -> Product {
        Product {
            id: "p-cement".to_string(),
            tenant_id: "t1".to_string(),
            sku: "CEM-01".to_string(),
            name: "Cement".to_string(),
            base_unit_id: "kg".to_string(),
            sale_unit_id: None,
            price_per_base_unit: Money::from_cents(10000),
            stock: Quantity::from_units(50),
            tax_applicable: true,
            allows_decimals: true,
            is_active: true,
        }
    }

    fn graph() -> ConversionGraph {
        ConversionGraph::build(vec![ConversionEdge::new("t1", "kg", "lb", 2.20462)])
    }

    const ITBIS: TaxRate = TaxRate::from_bps(1800);

    #[test]
    fn test_pounds_of_cement() {
        let five = Quantity::from_units(5);
        let line = price_line(&graph(), &cement(), "lb", five, five, ITBIS).unwrap();

        assert_eq!(line.base_quantity, Quantity::from_milli(2_268));
        assert_eq!(line.unit_price.cents(), 4536);
        assert_eq!(line.amounts.subtotal.cents(), 22680);
        assert_eq!(line.amounts.tax.cents(), 4082);
        assert_eq!(line.amounts.total.cents(), 26762);
        assert_eq!(line.base_fulfilled, line.base_quantity);
        assert!(line.pending.is_zero());
        assert!(matches!(line.conversion, ConversionOutcome::Converted { .. }));
    }

    #[test]
    fn test_base_unit_is_identity() {
        let two = Quantity::from_units(2);
        let line = price_line(&graph(), &cement(), "kg", two, two, ITBIS).unwrap();
        assert_eq!(line.conversion, ConversionOutcome::Identity);
        assert_eq!(line.base_quantity, two);
        assert_eq!(line.unit_price.cents(), 10000);
    }

    #[test]
    fn test_missing_path_degrades_to_unconverted() {
        let three = Quantity::from_units(3);
        let line = price_line(&graph(), &cement(), "bag", three, three, ITBIS).unwrap();
        assert_eq!(line.conversion, ConversionOutcome::Unconverted);
        assert_eq!(line.base_quantity, three);
        assert_eq!(line.unit_price, Money::from_cents(10000));

        let (price, outcome) = price_per_chosen_unit(&graph(), &cement(), "bag").unwrap();
        assert_eq!(price.cents(), 10000);
        assert!(outcome.is_degraded());
    }

    #[test]
    fn test_priced_quantity_uses_base_unit() {
        let converted = priced_quantity(&graph(), &cement(), "lb", Quantity::from_units(5)).unwrap();
        assert_eq!(converted.quantity, Quantity::from_milli(2_268));
    }

    #[test]
    fn test_partial_line_is_proportional() {
        // box → kg factor 2: 10 boxes = 20 kg, deliver 4 boxes now
        let graph = ConversionGraph::build(vec![ConversionEdge::new("t1", "box", "kg", 2.0)]);
        let line = price_line(
            &graph,
            &cement(),
            "box",
            Quantity::from_units(10),
            Quantity::from_units(4),
            ITBIS,
        )
        .unwrap();
        assert_eq!(line.base_quantity, Quantity::from_units(20));
        assert_eq!(line.base_fulfilled, Quantity::from_units(8));
        assert_eq!(line.pending, Quantity::from_units(6));
    }

    #[test]
    fn test_nothing_delivered_now() {
        let q = Quantity::from_units(10);
        let line = price_line(&graph(), &cement(), "kg", q, Quantity::zero(), ITBIS).unwrap();
        assert!(line.base_fulfilled.is_zero());
        assert_eq!(line.pending, q);
    }

    #[test]
    fn test_rejects_bad_quantities() {
        let product = cement();
        let zero = Quantity::zero();
        assert!(price_line(&graph(), &product, "kg", zero, zero, ITBIS).is_err());

        let one = Quantity::from_units(1);
        let over = price_line(&graph(), &product, "kg", one, Quantity::from_units(2), ITBIS);
        assert!(over.is_err());

        let mut whole_only = cement();
        whole_only.allows_decimals = false;
        let half = Quantity::from_milli(500);
        assert!(price_line(&graph(), &whole_only, "kg", half, half, ITBIS).is_err());
    }

    #[test]
    fn test_untaxed_product() {
        let mut product = cement();
        product.tax_applicable = false;
        let one = Quantity::from_units(1);
        let line = price_line(&graph(), &product, "kg", one, one, ITBIS).unwrap();
        assert!(line.amounts.tax.is_zero());
        assert_eq!(line.amounts.total, line.amounts.subtotal);
    }

    #[test]
    fn test_line_total_overflow_is_rejected() {
        // 1e13 kg at $9,000.00: the subtotal fits, subtotal + tax does not
        let mut product = cement();
        product.price_per_base_unit = Money::from_cents(900_000);
        let huge: Quantity = serde_json::from_str("10000000000000").unwrap();

        let err = price_line(&graph(), &product, "kg", huge, huge, ITBIS).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooLarge { ref field }) if field == "line total"
        ));
    }

    #[test]
    fn test_line_subtotal_overflow_is_rejected() {
        let huge = Quantity::from_units(100_000_000_000_000);
        let err = line_amounts(huge, Money::from_cents(1_000_000), false, ITBIS).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooLarge { ref field }) if field == "line subtotal"
        ));
    }

    #[test]
    fn test_converted_quantity_overflow_is_rejected() {
        let graph = ConversionGraph::build(vec![ConversionEdge::new("t1", "ton", "kg", 1e12)]);
        let q = Quantity::from_units(1_000_000_000);

        let err = price_line(&graph, &cement(), "ton", q, q, ITBIS).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_price_extra() {
        let freight = price_extra(
            "Delivery",
            "freight",
            Quantity::from_units(1),
            Money::from_cents(50000),
            true,
            ITBIS,
        )
        .unwrap();
        assert_eq!(freight.amounts.tax.cents(), 9000);
        assert_eq!(freight.amounts.total.cents(), 59000);

        assert!(price_extra(" ", "freight", Quantity::from_units(1), Money::zero(), false, ITBIS).is_err());
    }
}
