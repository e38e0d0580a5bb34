//! # Credit Repository
//!
//! Credit accounts, credit alerts, receivables and the credit history
//! ledger.
//!
//! ## Evaluation Inputs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(tenant, client, total, today)                                 │
//! │       │                                                                 │
//! │       ├──► credit_accounts   (tenant, client)          → CreditAccount  │
//! │       ├──► receivables       status = overdue                           │
//! │       │                      OR pending/partial with due_date < today   │
//! │       ├──► credit_alerts     severity = critical AND is_active          │
//! │       │                                                 → CreditStanding│
//! │       ▼                                                                 │
//! │  ventas_core::credit::evaluate_credit (pure)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Evaluation never writes. Balances move only inside a committed sale.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use ventas_core::credit::{
    evaluate_credit, AlertSeverity, CreditClassification, CreditHistoryEntry, CreditStatus, Receivable,
    ReceivableStatus,
};
use ventas_core::types::new_id;
use ventas_core::{CreditAccount, CreditDecision, CreditStanding, Money, ValidationError};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CreditAccountRow {
    id: String,
    tenant_id: String,
    client_id: String,
    credit_limit_cents: i64,
    used_balance_cents: i64,
    available_balance_cents: i64,
    classification: CreditClassification,
    status: CreditStatus,
    term_days: i64,
    is_active: bool,
}

impl From<CreditAccountRow> for CreditAccount {
    fn from(row: CreditAccountRow) -> Self {
        CreditAccount {
            id: row.id,
            tenant_id: row.tenant_id,
            client_id: row.client_id,
            credit_limit: Money::from_cents(row.credit_limit_cents),
            used_balance: Money::from_cents(row.used_balance_cents),
            available_balance: Money::from_cents(row.available_balance_cents),
            classification: row.classification,
            status: row.status,
            term_days: row.term_days,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReceivableRow {
    id: String,
    tenant_id: String,
    client_id: String,
    credit_account_id: String,
    sale_id: String,
    document_number: String,
    amount_cents: i64,
    balance_cents: i64,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    status: ReceivableStatus,
}

impl From<ReceivableRow> for Receivable {
    fn from(row: ReceivableRow) -> Self {
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

#[derive(Debug, sqlx::FromRow)]
struct CreditHistoryRow {
    id: String,
    tenant_id: String,
    credit_account_id: String,
    sale_id: Option<String>,
    movement: String,
    amount_cents: i64,
    used_before_cents: i64,
    used_after_cents: i64,
    available_before_cents: i64,
    available_after_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<CreditHistoryRow> for CreditHistoryEntry {
    fn from(row: CreditHistoryRow) -> Self {
        CreditHistoryEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            credit_account_id: row.credit_account_id,
            sale_id: row.sale_id,
            movement: row.movement,
            amount: Money::from_cents(row.amount_cents),
            used_before: Money::from_cents(row.used_before_cents),
            used_after: Money::from_cents(row.used_after_cents),
            available_before: Money::from_cents(row.available_before_cents),
            available_after: Money::from_cents(row.available_after_cents),
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Connection-level reads (shared with the sale transaction)
// =============================================================================

/// Loads a client's credit account through any connection.
pub(crate) async fn account_on(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    client_id: &str,
) -> DbResult<Option<CreditAccount>> {
    let row = sqlx::query_as::<_, CreditAccountRow>(
        r#"
        SELECT id, tenant_id, client_id, credit_limit_cents, used_balance_cents,
               available_balance_cents, classification, status, term_days, is_active
        FROM credit_accounts
        WHERE tenant_id = ?1 AND client_id = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(client_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(CreditAccount::from))
}

/// Counts what blocks new credit for a client as of `today`.
pub(crate) async fn standing_on(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    client_id: &str,
    today: NaiveDate,
) -> DbResult<CreditStanding> {
    let overdue_receivables: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM receivables
        WHERE tenant_id = ?1 AND client_id = ?2
          AND (status = 'overdue' OR (status IN ('pending', 'partial') AND due_date < ?3))
        "#,
    )
    .bind(tenant_id)
    .bind(client_id)
    .bind(today)
    .fetch_one(&mut *conn)
    .await?;

    let critical_alerts: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM credit_alerts
        WHERE tenant_id = ?1 AND client_id = ?2 AND severity = 'critical' AND is_active = 1
        "#,
    )
    .bind(tenant_id)
    .bind(client_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(CreditStanding {
        overdue_receivables,
        critical_alerts,
    })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for credit data.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Opens a credit line for a client. Starts with nothing used.
    pub async fn open_account(
        &self,
        tenant_id: &str,
        client_id: &str,
        credit_limit: Money,
        classification: CreditClassification,
        term_days: i64,
    ) -> DbResult<CreditAccount> {
        if credit_limit.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "credit_limit".to_string(),
            }
            .into());
        }
        if term_days < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "term_days".to_string(),
            }
            .into());
        }

        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO credit_accounts (
                id, tenant_id, client_id, credit_limit_cents, used_balance_cents,
                available_balance_cents, classification, status, term_days, is_active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?4, ?5, ?6, ?7, 1, ?8)
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(client_id)
        .bind(credit_limit.cents())
        .bind(classification)
        .bind(CreditStatus::Active)
        .bind(term_days)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(account_id = %id, client_id = %client_id, limit = %credit_limit, "Credit account opened");

        self.get_account(tenant_id, client_id)
            .await?
            .ok_or_else(|| DbError::not_found("CreditAccount", id))
    }

    pub async fn get_account(&self, tenant_id: &str, client_id: &str) -> DbResult<Option<CreditAccount>> {
        let mut conn = self.pool.acquire().await?;
        account_on(&mut conn, tenant_id, client_id).await
    }

    /// Changes the status or classification of an account.
    pub async fn update_standing(
        &self,
        tenant_id: &str,
        client_id: &str,
        status: CreditStatus,
        classification: CreditClassification,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE credit_accounts
            SET status = ?1, classification = ?2, updated_at = ?3
            WHERE tenant_id = ?4 AND client_id = ?5
            "#,
        )
        .bind(status)
        .bind(classification)
        .bind(Utc::now())
        .bind(tenant_id)
        .bind(client_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CreditAccount", client_id));
        }
        Ok(())
    }

    /// Overdue receivables and critical alerts of a client as of `today`.
    pub async fn standing(&self, tenant_id: &str, client_id: &str, today: NaiveDate) -> DbResult<CreditStanding> {
        let mut conn = self.pool.acquire().await?;
        standing_on(&mut conn, tenant_id, client_id, today).await
    }

    /// Decides whether the client may buy `proposed_total` on credit.
    ///
    /// Read-only; a denial is a normal decision, not an error.
    pub async fn evaluate(
        &self,
        tenant_id: &str,
        client_id: &str,
        proposed_total: Money,
        today: NaiveDate,
    ) -> DbResult<CreditDecision> {
        let mut conn = self.pool.acquire().await?;
        let account = account_on(&mut conn, tenant_id, client_id).await?;
        let standing = standing_on(&mut conn, tenant_id, client_id, today).await?;

        let decision = evaluate_credit(account.as_ref(), &standing, proposed_total);
        debug!(
            client_id = %client_id,
            total = %proposed_total,
            allowed = decision.allowed,
            "Credit evaluated"
        );
        Ok(decision)
    }

    /// Raises an alert against a client.
    pub async fn add_alert(
        &self,
        tenant_id: &str,
        client_id: &str,
        severity: AlertSeverity,
        message: &str,
    ) -> DbResult<String> {
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO credit_alerts (id, tenant_id, client_id, severity, message, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(client_id)
        .bind(severity)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Deactivates an alert.
    pub async fn resolve_alert(&self, tenant_id: &str, alert_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE credit_alerts SET is_active = 0 WHERE id = ?1 AND tenant_id = ?2")
            .bind(alert_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CreditAlert", alert_id));
        }
        Ok(())
    }

    /// Records a receivable outside of a sale (opening balances, imports).
    pub async fn record_receivable(&self, receivable: &Receivable) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO receivables (
                id, tenant_id, client_id, credit_account_id, sale_id, document_number,
                amount_cents, balance_cents, issue_date, due_date, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, NULLIF(?5, ''), ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&receivable.id)
        .bind(&receivable.tenant_id)
        .bind(&receivable.client_id)
        .bind(&receivable.credit_account_id)
        .bind(&receivable.sale_id)
        .bind(&receivable.document_number)
        .bind(receivable.amount.cents())
        .bind(receivable.balance.cents())
        .bind(receivable.issue_date)
        .bind(receivable.due_date)
        .bind(receivable.status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Receivables of a client, oldest due first.
    pub async fn receivables_for_client(&self, tenant_id: &str, client_id: &str) -> DbResult<Vec<Receivable>> {
        let rows = sqlx::query_as::<_, ReceivableRow>(
            r#"
            SELECT id, tenant_id, client_id, credit_account_id, COALESCE(sale_id, '') AS sale_id,
                   document_number, amount_cents, balance_cents, issue_date, due_date, status
            FROM receivables
            WHERE tenant_id = ?1 AND client_id = ?2
            ORDER BY due_date, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Receivable::from).collect())
    }

    /// Movements on an account, oldest first.
    pub async fn history_for_account(&self, tenant_id: &str, account_id: &str) -> DbResult<Vec<CreditHistoryEntry>> {
        let rows = sqlx::query_as::<_, CreditHistoryRow>(
            r#"
            SELECT id, tenant_id, credit_account_id, sale_id, movement, amount_cents,
                   used_before_cents, used_after_cents, available_before_cents,
                   available_after_cents, created_at
            FROM credit_history
            WHERE tenant_id = ?1 AND credit_account_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(tenant_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CreditHistoryEntry::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
