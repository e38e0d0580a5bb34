//! # Sale Ledger
//!
//! The writes of one sale, executed in order on the sale's transaction.
//! Every function here takes the transaction's connection; none of them
//! touches the pool.
//!
//! ## Guarded Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Counter / balance         Guard in the UPDATE          Miss means      │
//! │  ───────────────────────   ──────────────────────────   ─────────────   │
//! │  current_sequence + 1      current_sequence < end       exhausted       │
//! │  stock_milli - n           stock_milli >= n             out of stock    │
//! │  available_balance - t     available_balance >= t       no credit left  │
//! │  register totals + t       is_open = 1                  no register     │
//! │                                                                         │
//! │  The guard and the write are one statement, so two concurrent sales    │
//! │  cannot both pass a check that only one of them fits.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Days, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use super::{CheckoutResult, CheckoutSettings};
use crate::repository::credit::account_on;
use crate::repository::fiscal::{FiscalDocumentTypeRow, FISCAL_TYPE_SELECT};
use crate::repository::register::find_open_on;
use ventas_core::credit::ReceivableStatus;
use ventas_core::pricing::PricedLine;
use ventas_core::sale::SalePlan;
use ventas_core::types::{internal_number, new_id};
use ventas_core::{
    ConversionOutcome, CoreError, CreditAccount, CreditDenial, FiscalDocumentType, FulfillmentType, Money, Quantity,
    RegisterBucket, SaleContext, SaleReceipt, SaleRequest,
};

/// Everything the ledger needs, decided before the transaction opened.
#[derive(Debug)]
pub struct SaleDraft<'a> {
    pub ctx: &'a SaleContext,
    pub request: &'a SaleRequest,
    pub plan: &'a SalePlan,
    pub client_id: Option<&'a str>,
    pub change: Money,
    pub settings: &'a CheckoutSettings,
    pub now: DateTime<Utc>,
}

/// Balances of the credit account around this sale.
#[derive(Debug, Clone, Copy)]
struct CreditMovement {
    used_before: Money,
    used_after: Money,
    available_before: Money,
    available_after: Money,
}

/// Runs every write of the sale. The caller owns commit and rollback.
pub async fn commit_sale(conn: &mut SqliteConnection, draft: &SaleDraft<'_>) -> CheckoutResult<SaleReceipt> {
    let tenant_id = draft.ctx.tenant_id.as_str();
    let plan = draft.plan;

    let fiscal_number = allocate_fiscal_number(conn, tenant_id, &draft.request.fiscal_document_type_id).await?;
    let internal_number = allocate_internal_number(conn, tenant_id, &draft.settings.internal_number_prefix).await?;
    debug!(%fiscal_number, %internal_number, "Numbers allocated");

    verify_stock(conn, tenant_id, plan).await?;

    let register = find_open_on(conn, tenant_id, &draft.ctx.user_id)
        .await?
        .ok_or_else(|| CoreError::NoOpenCashRegister {
            user_id: draft.ctx.user_id.clone(),
        })?;
    debug!(register_id = %register.id, "Cash register resolved");

    let sale_id = new_id();
    insert_header(conn, draft, &sale_id, &fiscal_number, &internal_number, &register.id).await?;

    let credit = if plan.payment_method.is_credit() {
        let client_id = draft.client_id.ok_or(CreditDenial::NoCreditAccount)?;
        let account = account_on(conn, tenant_id, client_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or(CreditDenial::NoCreditAccount)?;

        insert_receivable(conn, draft, &account, &sale_id, &fiscal_number).await?;
        let movement = charge_account(conn, &account, plan.totals.total, draft.now).await?;
        Some((account, movement))
    } else {
        None
    };

    let mut line_ids = Vec::with_capacity(plan.lines.len());
    for (index, line) in plan.lines.iter().enumerate() {
        let line_id = insert_line(conn, &sale_id, index as i64 + 1, line).await?;

        if line.base_fulfilled.is_positive() {
            decrement_stock(conn, tenant_id, &sale_id, line, draft.now).await?;
        }
        line_ids.push(line_id);
    }
    debug!(lines = line_ids.len(), "Lines written");

    insert_extras(conn, &sale_id, plan).await?;

    if plan.fulfillment_type == FulfillmentType::Partial && plan.lines.iter().any(|l| l.fulfill_now.is_positive()) {
        insert_dispatch(conn, tenant_id, &sale_id, plan, &line_ids, draft.now).await?;
    }

    update_register_totals(conn, &register.id, draft).await?;

    if let Some((account, movement)) = &credit {
        insert_credit_history(conn, tenant_id, account, &sale_id, plan.totals.total, movement, draft.now).await?;
    }

    if let Some(client_id) = draft.client_id {
        update_client_aggregates(conn, tenant_id, client_id, plan.totals.total, draft.now).await?;
    }

    Ok(SaleReceipt {
        sale_id,
        fiscal_number,
        internal_number,
        totals: plan.totals,
        change: draft.change,
        warnings: plan.warnings.clone(),
    })
}

// =============================================================================
// Numbering
// =============================================================================

/// Issues the next fiscal number (NCF) of a document type.
pub async fn allocate_fiscal_number(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    document_type_id: &str,
) -> CheckoutResult<String> {
    let issued: Option<(String, i64)> = sqlx::query_as(
        r#"
        UPDATE fiscal_document_types
        SET current_sequence = current_sequence + 1
        WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1 AND current_sequence < sequence_end
        RETURNING prefix, current_sequence
        "#,
    )
    .bind(document_type_id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((prefix, sequence)) = issued {
        return Ok(FiscalDocumentType::fiscal_number(&prefix, sequence));
    }

    // Nothing updated: tell unknown/inactive apart from exhausted
    let doc = sqlx::query_as::<_, FiscalDocumentTypeRow>(FISCAL_TYPE_SELECT)
        .bind(document_type_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(FiscalDocumentType::from)
        .filter(|doc| doc.is_active)
        .ok_or_else(|| CoreError::FiscalDocumentTypeNotFound(document_type_id.to_string()))?;

    Err(CoreError::ExhaustedSequence {
        document_type: doc.code,
        sequence_end: doc.sequence_end,
    }
    .into())
}

/// Issues the next internal sale number of a tenant.
pub async fn allocate_internal_number(conn: &mut SqliteConnection, tenant_id: &str, prefix: &str) -> CheckoutResult<String> {
    let next: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sale_sequences (tenant_id, last_number) VALUES (?1, 1)
        ON CONFLICT (tenant_id) DO UPDATE SET last_number = last_number + 1
        RETURNING last_number
        "#,
    )
    .bind(tenant_id)
    .fetch_one(conn)
    .await?;

    Ok(internal_number(prefix, next))
}

// =============================================================================
// Stock
// =============================================================================

/// Checks every product can cover what the sale delivers now, summed over
/// all of its lines.
async fn verify_stock(conn: &mut SqliteConnection, tenant_id: &str, plan: &SalePlan) -> CheckoutResult<()> {
    for (product_id, requested) in plan.stock_demand() {
        let (sku, stock_milli): (String, i64) =
            sqlx::query_as("SELECT sku, stock_milli FROM products WHERE id = ?1 AND tenant_id = ?2")
                .bind(&product_id)
                .bind(tenant_id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.clone()))?;

        let available = Quantity::from_milli(stock_milli);
        if available < requested {
            return Err(CoreError::InsufficientStock {
                product_id,
                sku,
                available,
                requested,
            }
            .into());
        }
    }
    Ok(())
}

async fn decrement_stock(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
    line: &PricedLine,
    now: DateTime<Utc>,
) -> CheckoutResult<()> {
    let amount = line.base_fulfilled;

    let after: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_milli = stock_milli - ?1, updated_at = ?2
        WHERE id = ?3 AND tenant_id = ?4 AND stock_milli >= ?1
        RETURNING stock_milli
        "#,
    )
    .bind(amount.milli())
    .bind(now)
    .bind(&line.product_id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(after) = after else {
        let available: i64 = sqlx::query_scalar("SELECT stock_milli FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(&line.product_id)
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?
            .unwrap_or(0);

        return Err(CoreError::InsufficientStock {
            product_id: line.product_id.clone(),
            sku: line.sku.clone(),
            available: Quantity::from_milli(available),
            requested: amount,
        }
        .into());
    };

    let stock_after = Quantity::from_milli(after);
    let stock_before = stock_after + amount;

    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, tenant_id, product_id, sale_id, movement_type, quantity_milli,
            stock_before_milli, stock_after_milli, created_at
        ) VALUES (?1, ?2, ?3, ?4, 'sale', ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(new_id())
    .bind(tenant_id)
    .bind(&line.product_id)
    .bind(sale_id)
    .bind(-amount.milli())
    .bind(stock_before.milli())
    .bind(stock_after.milli())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %line.product_id,
        decrement = %amount,
        stock_before = %stock_before,
        stock_after = %stock_after,
        "Stock decremented"
    );
    Ok(())
}

// =============================================================================
// Sale Rows
// =============================================================================

async fn insert_header(
    conn: &mut SqliteConnection,
    draft: &SaleDraft<'_>,
    sale_id: &str,
    fiscal_number: &str,
    internal_number: &str,
    register_id: &str,
) -> CheckoutResult<()> {
    let totals = &draft.plan.totals;

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, tenant_id, fiscal_document_type_id, fiscal_number, internal_number,
            client_id, cash_register_id, user_id, payment_method, fulfillment_type,
            subtotal_cents, discount_cents, taxable_base_cents, tax_cents, total_cents,
            cash_received_cents, change_cents, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        "#,
    )
    .bind(sale_id)
    .bind(&draft.ctx.tenant_id)
    .bind(&draft.request.fiscal_document_type_id)
    .bind(fiscal_number)
    .bind(internal_number)
    .bind(draft.client_id)
    .bind(register_id)
    .bind(&draft.ctx.user_id)
    .bind(draft.plan.payment_method)
    .bind(draft.plan.fulfillment_type)
    .bind(totals.subtotal.cents())
    .bind(totals.discount.cents())
    .bind(totals.taxable_base.cents())
    .bind(totals.tax.cents())
    .bind(totals.total.cents())
    .bind(draft.request.cash_received.map(|m| m.cents()))
    .bind(draft.change.cents())
    .bind(&draft.request.notes)
    .bind(draft.now)
    .execute(conn)
    .await?;

    Ok(())
}

fn conversion_columns(outcome: ConversionOutcome) -> (&'static str, Option<f64>) {
    match outcome {
        ConversionOutcome::Identity => ("identity", None),
        ConversionOutcome::Converted { factor } => ("converted", Some(factor)),
        ConversionOutcome::Unconverted => ("unconverted", None),
    }
}

async fn insert_line(
    conn: &mut SqliteConnection,
    sale_id: &str,
    line_number: i64,
    line: &PricedLine,
) -> CheckoutResult<String> {
    let id = new_id();
    let (conversion_kind, conversion_factor) = conversion_columns(line.conversion);

    sqlx::query(
        r#"
        INSERT INTO sale_lines (
            id, sale_id, line_number, product_id, unit_id, quantity_milli,
            base_quantity_milli, fulfilled_milli, pending_milli, unit_price_cents,
            subtotal_cents, tax_cents, total_cents, conversion_kind, conversion_factor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&id)
    .bind(sale_id)
    .bind(line_number)
    .bind(&line.product_id)
    .bind(&line.unit_id)
    .bind(line.quantity.milli())
    .bind(line.base_quantity.milli())
    .bind(line.fulfill_now.milli())
    .bind(line.pending.milli())
    .bind(line.unit_price.cents())
    .bind(line.amounts.subtotal.cents())
    .bind(line.amounts.tax.cents())
    .bind(line.amounts.total.cents())
    .bind(conversion_kind)
    .bind(conversion_factor)
    .execute(conn)
    .await?;

    Ok(id)
}

async fn insert_extras(conn: &mut SqliteConnection, sale_id: &str, plan: &SalePlan) -> CheckoutResult<()> {
    for extra in &plan.extras {
        sqlx::query(
            r#"
            INSERT INTO sale_extras (
                id, sale_id, name, kind, quantity_milli, unit_price_cents,
                subtotal_cents, tax_cents, total_cents, tax_applicable
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(new_id())
        .bind(sale_id)
        .bind(&extra.name)
        .bind(&extra.kind)
        .bind(extra.quantity.milli())
        .bind(extra.unit_price.cents())
        .bind(extra.amounts.subtotal.cents())
        .bind(extra.amounts.tax.cents())
        .bind(extra.amounts.total.cents())
        .bind(extra.tax_applicable)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// First dispatch of a partially fulfilled sale: what leaves now, and what
/// is still owed per line.
async fn insert_dispatch(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    sale_id: &str,
    plan: &SalePlan,
    line_ids: &[String],
    now: DateTime<Utc>,
) -> CheckoutResult<()> {
    let dispatch_id = new_id();

    sqlx::query(
        "INSERT INTO dispatches (id, tenant_id, sale_id, dispatch_number, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
    )
    .bind(&dispatch_id)
    .bind(tenant_id)
    .bind(sale_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for (line, line_id) in plan.lines.iter().zip(line_ids) {
        if !line.fulfill_now.is_positive() {
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO dispatch_lines (
                id, dispatch_id, sale_line_id, product_id, quantity_milli,
                pending_milli, base_quantity_milli
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(new_id())
        .bind(&dispatch_id)
        .bind(line_id)
        .bind(&line.product_id)
        .bind(line.fulfill_now.milli())
        .bind(line.pending.milli())
        .bind(line.base_fulfilled.milli())
        .execute(&mut *conn)
        .await?;
    }

    debug!(dispatch_id = %dispatch_id, "Dispatch recorded");
    Ok(())
}

// =============================================================================
// Cash Register & Client
// =============================================================================

fn bucket_column(bucket: RegisterBucket) -> &'static str {
    match bucket {
        RegisterBucket::Cash => "total_cash_cents",
        RegisterBucket::DebitCard => "total_debit_card_cents",
        RegisterBucket::CreditCard => "total_credit_card_cents",
        RegisterBucket::Transfer => "total_transfer_cents",
        RegisterBucket::Check => "total_check_cents",
    }
}

/// Adds the sale to the register: total sales always, plus exactly one
/// payment bucket unless the sale is on credit.
async fn update_register_totals(conn: &mut SqliteConnection, register_id: &str, draft: &SaleDraft<'_>) -> CheckoutResult<()> {
    let sql = match draft.plan.payment_method.register_bucket() {
        Some(bucket) => {
            let column = bucket_column(bucket);
            format!(
                "UPDATE cash_registers SET total_sales_cents = total_sales_cents + ?1, \
                 {column} = {column} + ?1 WHERE id = ?2 AND is_open = 1"
            )
        }
        None => "UPDATE cash_registers SET total_sales_cents = total_sales_cents + ?1 WHERE id = ?2 AND is_open = 1"
            .to_string(),
    };

    let result = sqlx::query(&sql)
        .bind(draft.plan.totals.total.cents())
        .bind(register_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NoOpenCashRegister {
            user_id: draft.ctx.user_id.clone(),
        }
        .into());
    }
    Ok(())
}

async fn update_client_aggregates(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    client_id: &str,
    total: Money,
    now: DateTime<Utc>,
) -> CheckoutResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE clients
        SET total_purchases_cents = total_purchases_cents + ?1,
            purchase_count = purchase_count + 1,
            last_purchase_at = ?2
        WHERE id = ?3 AND tenant_id = ?4
        "#,
    )
    .bind(total.cents())
    .bind(now)
    .bind(client_id)
    .bind(tenant_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ClientNotFound(client_id.to_string()).into());
    }
    Ok(())
}

// =============================================================================
// Credit
// =============================================================================

async fn insert_receivable(
    conn: &mut SqliteConnection,
    draft: &SaleDraft<'_>,
    account: &CreditAccount,
    sale_id: &str,
    document_number: &str,
) -> CheckoutResult<()> {
    let issue_date = draft.now.date_naive();
    let due_date = if account.term_days > 0 {
        account.due_date(issue_date)
    } else {
        let days = Days::new(draft.settings.default_term_days.max(0) as u64);
        issue_date.checked_add_days(days).unwrap_or(issue_date)
    };
    let total = draft.plan.totals.total;

    sqlx::query(
        r#"
        INSERT INTO receivables (
            id, tenant_id, client_id, credit_account_id, sale_id, document_number,
            amount_cents, balance_cents, issue_date, due_date, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(new_id())
    .bind(&account.tenant_id)
    .bind(&account.client_id)
    .bind(&account.id)
    .bind(sale_id)
    .bind(document_number)
    .bind(total.cents())
    .bind(issue_date)
    .bind(due_date)
    .bind(ReceivableStatus::Pending)
    .bind(draft.now)
    .execute(conn)
    .await?;

    debug!(account_id = %account.id, %due_date, amount = %total, "Receivable created");
    Ok(())
}

/// Moves `total` from available to used, refusing to go below zero.
async fn charge_account(
    conn: &mut SqliteConnection,
    account: &CreditAccount,
    total: Money,
    now: DateTime<Utc>,
) -> CheckoutResult<CreditMovement> {
    let balances: Option<(i64, i64)> = sqlx::query_as(
        r#"
        UPDATE credit_accounts
        SET used_balance_cents = used_balance_cents + ?1,
            available_balance_cents = available_balance_cents - ?1,
            updated_at = ?2
        WHERE id = ?3 AND available_balance_cents >= ?1
        RETURNING used_balance_cents, available_balance_cents
        "#,
    )
    .bind(total.cents())
    .bind(now)
    .bind(&account.id)
    .fetch_optional(conn)
    .await?;

    let (used_after, available_after) = balances.ok_or(CreditDenial::InsufficientCredit {
        available: account.available_balance,
        requested: total,
    })?;

    let used_after = Money::from_cents(used_after);
    let available_after = Money::from_cents(available_after);

    Ok(CreditMovement {
        used_before: used_after - total,
        used_after,
        available_before: available_after + total,
        available_after,
    })
}

async fn insert_credit_history(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    account: &CreditAccount,
    sale_id: &str,
    total: Money,
    movement: &CreditMovement,
    now: DateTime<Utc>,
) -> CheckoutResult<()> {
    sqlx::query(
        r#"
        INSERT INTO credit_history (
            id, tenant_id, credit_account_id, sale_id, movement, amount_cents,
            used_before_cents, used_after_cents, available_before_cents,
            available_after_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, 'sale', ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(new_id())
    .bind(tenant_id)
    .bind(&account.id)
    .bind(sale_id)
    .bind(total.cents())
    .bind(movement.used_before.cents())
    .bind(movement.used_after.cents())
    .bind(movement.available_before.cents())
    .bind(movement.available_after.cents())
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}
