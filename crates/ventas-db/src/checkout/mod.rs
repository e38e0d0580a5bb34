//! # Checkout
//!
//! The sale transaction: everything a sale writes is committed together
//! or not at all.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(ctx, request)                                              │
//! │                                                                         │
//! │  ── outside the transaction (read-only) ──────────────────────────────  │
//! │  1. validate request shape                                              │
//! │  2. load products, graph handle → plan_sale (prices, totals, warnings) │
//! │  3. cash tender check → change                                          │
//! │  4. client exists; credit pre-check for credit sales                    │
//! │                                                                         │
//! │  ── BEGIN ────────────────────────────────────────────────────────────  │
//! │  5. ledger::commit_sale                                                 │
//! │       fiscal number → internal number → stock check → open register    │
//! │       → header → [credit] receivable + balance → lines + stock         │
//! │       → extras → [partial] dispatch → register totals                  │
//! │       → [credit] history → client aggregates                           │
//! │  ── COMMIT / ROLLBACK ────────────────────────────────────────────────  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error after BEGIN rolls the whole transaction back before it is
//! returned, and the connection goes back to the pool on every path.

pub mod ledger;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::error::DbError;
use crate::pool::Database;
use ventas_core::sale::{plan_sale, validate_cash_tender};
use ventas_core::validation::validate_sale_request;
use ventas_core::{CoreError, CreditDenial, SaleContext, SaleReceipt, SaleRequest, TaxRate, ValidationError};

use self::ledger::SaleDraft;

// =============================================================================
// Settings
// =============================================================================

/// Tenant-independent knobs of the sale transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Sales tax applied to taxable lines and extras.
    pub tax_rate: TaxRate,
    /// Prefix of the internal sale number, e.g. `VT-`.
    pub internal_number_prefix: String,
    /// Term used when a credit account has none configured.
    pub default_term_days: i64,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            tax_rate: TaxRate::from_bps(1800),
            internal_number_prefix: "VT-".to_string(),
            default_term_days: 30,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Why a sale was not committed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the sale (validation, stock, credit,
    /// fiscal sequence, cash register).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl CheckoutError {
    /// True for failures the caller could not have caused or fixed.
    pub fn is_unexpected(&self) -> bool {
        match self {
            CheckoutError::Core(_) => false,
            CheckoutError::Db(DbError::Validation(_)) => false,
            CheckoutError::Db(_) => true,
        }
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutError::Db(DbError::from(err))
    }
}

impl From<ValidationError> for CheckoutError {
    fn from(err: ValidationError) -> Self {
        CheckoutError::Core(CoreError::Validation(err))
    }
}

impl From<CreditDenial> for CheckoutError {
    fn from(denial: CreditDenial) -> Self {
        CheckoutError::Core(CoreError::CreditDenied(denial))
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Service
// =============================================================================

/// Commits sales.
///
/// ## Usage
/// ```rust,ignore
/// let checkout = db.checkout(CheckoutSettings::default());
/// let receipt = checkout.create_sale(&SaleContext::new("t1", "u-1"), &request).await?;
/// println!("{} {}", receipt.fiscal_number, receipt.totals.total);
/// ```
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(db: Database, settings: CheckoutSettings) -> Self {
        CheckoutService { db, settings }
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    /// Prices, checks and atomically commits one sale.
    pub async fn create_sale(&self, ctx: &SaleContext, request: &SaleRequest) -> CheckoutResult<SaleReceipt> {
        if ctx.tenant_id.trim().is_empty() {
            return Err(ValidationError::required("tenantId").into());
        }
        if ctx.user_id.trim().is_empty() {
            return Err(ValidationError::required("userId").into());
        }
        validate_sale_request(request)?;

        debug!(
            tenant_id = %ctx.tenant_id,
            user_id = %ctx.user_id,
            lines = request.lines.len(),
            extras = request.extras.len(),
            "Checkout started"
        );

        // ---------------------------------------------------------------------
        // Pricing
        // ---------------------------------------------------------------------
        let product_ids: Vec<&str> = request.lines.iter().map(|l| l.product_id.as_str()).collect();
        let products = self.db.products().get_many(&ctx.tenant_id, &product_ids).await?;
        let graph = self.db.graph_cache().get_or_build(&ctx.tenant_id, self.db.pool()).await?;

        let plan = plan_sale(request, &products, &graph, self.settings.tax_rate)?;

        for warning in &plan.warnings {
            warn!(tenant_id = %ctx.tenant_id, ?warning, "Sale priced with a warning");
        }
        debug!(
            subtotal = %plan.totals.subtotal,
            tax = %plan.totals.tax,
            total = %plan.totals.total,
            graph_generation = graph.generation(),
            "Sale priced"
        );

        // ---------------------------------------------------------------------
        // Pre-checks
        // ---------------------------------------------------------------------
        let change = validate_cash_tender(plan.payment_method, request.cash_received, plan.totals.total)?;

        let client_id = request.client_id.as_deref().filter(|id| !id.trim().is_empty());
        if let Some(client_id) = client_id {
            let client = self.db.clients().get_by_id(&ctx.tenant_id, client_id).await?;
            if !client.is_some_and(|c| c.is_active) {
                return Err(CoreError::ClientNotFound(client_id.to_string()).into());
            }
        }

        let now = Utc::now();
        if plan.payment_method.is_credit() {
            let client_id = client_id.ok_or_else(|| ValidationError::required("clientId"))?;
            let decision = self
                .db
                .credits()
                .evaluate(&ctx.tenant_id, client_id, plan.totals.total, now.date_naive())
                .await?;

            if let Some(denial) = decision.denial {
                warn!(
                    tenant_id = %ctx.tenant_id,
                    client_id = %client_id,
                    total = %plan.totals.total,
                    reason = %denial,
                    "Credit sale rejected"
                );
                return Err(denial.into());
            }
        }

        // ---------------------------------------------------------------------
        // Transaction
        // ---------------------------------------------------------------------
        let draft = SaleDraft {
            ctx,
            request,
            plan: &plan,
            client_id,
            change,
            settings: &self.settings,
            now,
        };

        let mut tx = self.db.pool().begin().await?;

        match ledger::commit_sale(&mut *tx, &draft).await {
            Ok(receipt) => {
                tx.commit().await?;
                info!(
                    tenant_id = %ctx.tenant_id,
                    sale_id = %receipt.sale_id,
                    fiscal_number = %receipt.fiscal_number,
                    internal_number = %receipt.internal_number,
                    total = %receipt.totals.total,
                    payment_method = ?plan.payment_method,
                    "Sale committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }

                if err.is_unexpected() {
                    error!(tenant_id = %ctx.tenant_id, error = %err, "Sale rolled back");
                } else {
                    warn!(tenant_id = %ctx.tenant_id, error = %err, "Sale rejected");
                }
                Err(err)
            }
        }
    }
}
