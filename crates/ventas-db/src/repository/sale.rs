//! # Sale Repository
//!
//! Read side of committed sales: headers, lines, extras, dispatches and
//! the stock movements a sale produced.
//!
//! ## Sale Record Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sales (header)                                                         │
//! │  ├── fiscal_number / internal_number                                    │
//! │  ├── payment_method, fulfillment_type                                   │
//! │  ├── subtotal / discount / taxable_base / tax / total                  │
//! │  │                                                                      │
//! │  ├── sale_lines (1..n)        quantity, base_quantity, fulfilled,       │
//! │  │                            pending, unit_price, amounts              │
//! │  ├── sale_extras (0..n)       freight, labour, ...                      │
//! │  ├── dispatches (0..1 at sale time)                                     │
//! │  │   └── dispatch_lines                                                 │
//! │  ├── inventory_movements      one per line that moved stock             │
//! │  └── receivables              credit sales only                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All writes happen in [`checkout`](crate::checkout) inside the sale
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::DbResult;
use ventas_core::credit::Receivable;
use ventas_core::sale::{Dispatch, DispatchLine, InventoryMovement, Sale, SaleExtra, SaleLine};
use ventas_core::{FulfillmentType, Money, PaymentMethod, Quantity, SaleTotals};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    tenant_id: String,
    fiscal_document_type_id: String,
    fiscal_number: String,
    internal_number: String,
    client_id: Option<String>,
    cash_register_id: String,
    user_id: String,
    payment_method: PaymentMethod,
    fulfillment_type: FulfillmentType,
    subtotal_cents: i64,
    discount_cents: i64,
    taxable_base_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    cash_received_cents: Option<i64>,
    change_cents: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            tenant_id: row.tenant_id,
            fiscal_document_type_id: row.fiscal_document_type_id,
            fiscal_number: row.fiscal_number,
            internal_number: row.internal_number,
            client_id: row.client_id,
            cash_register_id: row.cash_register_id,
            user_id: row.user_id,
            payment_method: row.payment_method,
            fulfillment_type: row.fulfillment_type,
            totals: SaleTotals {
                subtotal: Money::from_cents(row.subtotal_cents),
                discount: Money::from_cents(row.discount_cents),
                taxable_base: Money::from_cents(row.taxable_base_cents),
                tax: Money::from_cents(row.tax_cents),
                total: Money::from_cents(row.total_cents),
            },
            cash_received: row.cash_received_cents.map(Money::from_cents),
            change: Money::from_cents(row.change_cents),
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    id: String,
    sale_id: String,
    line_number: i64,
    product_id: String,
    unit_id: String,
    quantity_milli: i64,
    base_quantity_milli: i64,
    fulfilled_milli: i64,
    pending_milli: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        SaleLine {
            id: row.id,
            sale_id: row.sale_id,
            line_number: row.line_number,
            product_id: row.product_id,
            unit_id: row.unit_id,
            quantity: Quantity::from_milli(row.quantity_milli),
            base_quantity: Quantity::from_milli(row.base_quantity_milli),
            quantity_fulfilled: Quantity::from_milli(row.fulfilled_milli),
            quantity_pending: Quantity::from_milli(row.pending_milli),
            unit_price: Money::from_cents(row.unit_price_cents),
            subtotal: Money::from_cents(row.subtotal_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleExtraRow {
    id: String,
    sale_id: String,
    name: String,
    kind: String,
    quantity_milli: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
}

impl From<SaleExtraRow> for SaleExtra {
    fn from(row: SaleExtraRow) -> Self {
        SaleExtra {
            id: row.id,
            sale_id: row.sale_id,
            name: row.name,
            kind: row.kind,
            quantity: Quantity::from_milli(row.quantity_milli),
            unit_price: Money::from_cents(row.unit_price_cents),
            subtotal: Money::from_cents(row.subtotal_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DispatchRow {
    id: String,
    tenant_id: String,
    sale_id: String,
    dispatch_number: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DispatchLineRow {
    id: String,
    dispatch_id: String,
    sale_line_id: String,
    product_id: String,
    quantity_milli: i64,
    pending_milli: i64,
    base_quantity_milli: i64,
}

impl From<DispatchLineRow> for DispatchLine {
    fn from(row: DispatchLineRow) -> Self {
        DispatchLine {
            id: row.id,
            dispatch_id: row.dispatch_id,
            sale_line_id: row.sale_line_id,
            product_id: row.product_id,
            quantity_dispatched: Quantity::from_milli(row.quantity_milli),
            quantity_pending: Quantity::from_milli(row.pending_milli),
            base_quantity_dispatched: Quantity::from_milli(row.base_quantity_milli),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    tenant_id: String,
    product_id: String,
    sale_id: Option<String>,
    movement_type: String,
    quantity_milli: i64,
    stock_before_milli: i64,
    stock_after_milli: i64,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for InventoryMovement {
    fn from(row: MovementRow) -> Self {
        InventoryMovement {
            id: row.id,
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            sale_id: row.sale_id,
            movement_type: row.movement_type,
            quantity: Quantity::from_milli(row.quantity_milli),
            stock_before: Quantity::from_milli(row.stock_before_milli),
            stock_after: Quantity::from_milli(row.stock_after_milli),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleReceivableRow {
    id: String,
    tenant_id: String,
    client_id: String,
    credit_account_id: String,
    sale_id: String,
    document_number: String,
    amount_cents: i64,
    balance_cents: i64,
    issue_date: chrono::NaiveDate,
    due_date: chrono::NaiveDate,
    status: ventas_core::credit::ReceivableStatus,
}

impl From<SaleReceivableRow> for Receivable {
    fn from(row: SaleReceivableRow) -> Self {
        Receivable {
            id: row.id,
            tenant_id: row.tenant_id,
            client_id: row.client_id,
            credit_account_id: row.credit_account_id,
            sale_id: row.sale_id,
            document_number: row.document_number,
            amount: Money::from_cents(row.amount_cents),
            balance: Money::from_cents(row.balance_cents),
            issue_date: row.issue_date,
            due_date: row.due_date,
            status: row.status,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for committed sales.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.sales().get_by_id("t1", &receipt.sale_id).await?;
/// let lines = db.sales().get_lines(&receipt.sale_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale header of the tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, tenant_id, fiscal_document_type_id, fiscal_number, internal_number,
                   client_id, cash_register_id, user_id, payment_method, fulfillment_type,
                   subtotal_cents, discount_cents, taxable_base_cents, tax_cents, total_cents,
                   cash_received_cents, change_cents, notes, created_at
            FROM sales
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Sale::from))
    }

    /// Number of sales stored for a tenant.
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Lines of a sale in entry order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let rows = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT id, sale_id, line_number, product_id, unit_id, quantity_milli,
                   base_quantity_milli, fulfilled_milli, pending_milli, unit_price_cents,
                   subtotal_cents, tax_cents, total_cents
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY line_number
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SaleLine::from).collect())
    }

    pub async fn get_extras(&self, sale_id: &str) -> DbResult<Vec<SaleExtra>> {
        let rows = sqlx::query_as::<_, SaleExtraRow>(
            r#"
            SELECT id, sale_id, name, kind, quantity_milli, unit_price_cents,
                   subtotal_cents, tax_cents, total_cents
            FROM sale_extras
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SaleExtra::from).collect())
    }

    /// Dispatches of a sale with their lines.
    pub async fn get_dispatches(&self, sale_id: &str) -> DbResult<Vec<Dispatch>> {
        let headers = sqlx::query_as::<_, DispatchRow>(
            r#"
            SELECT id, tenant_id, sale_id, dispatch_number, created_at
            FROM dispatches
            WHERE sale_id = ?1
            ORDER BY dispatch_number
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        let mut dispatches = Vec::with_capacity(headers.len());
        for header in headers {
            let lines = sqlx::query_as::<_, DispatchLineRow>(
                r#"
                SELECT id, dispatch_id, sale_line_id, product_id, quantity_milli,
                       pending_milli, base_quantity_milli
                FROM dispatch_lines
                WHERE dispatch_id = ?1
                ORDER BY rowid
                "#,
            )
            .bind(&header.id)
            .fetch_all(&self.pool)
            .await?;

            dispatches.push(Dispatch {
                id: header.id,
                tenant_id: header.tenant_id,
                sale_id: header.sale_id,
                dispatch_number: header.dispatch_number,
                lines: lines.into_iter().map(DispatchLine::from).collect(),
                created_at: header.created_at,
            });
        }

        Ok(dispatches)
    }

    /// Stock movements a sale produced.
    pub async fn get_movements(&self, sale_id: &str) -> DbResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, tenant_id, product_id, sale_id, movement_type, quantity_milli,
                   stock_before_milli, stock_after_milli, created_at
            FROM inventory_movements
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InventoryMovement::from).collect())
    }

    /// The receivable opened by a credit sale.
    pub async fn get_receivable(&self, sale_id: &str) -> DbResult<Option<Receivable>> {
        let row = sqlx::query_as::<_, SaleReceivableRow>(
            r#"
            SELECT id, tenant_id, client_id, credit_account_id, sale_id, document_number,
                   amount_cents, balance_cents, issue_date, due_date, status
            FROM receivables
            WHERE sale_id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Receivable::from))
    }
}
