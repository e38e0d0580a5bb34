//! # Cash Register Repository
//!
//! Register sessions: a cashier opens one, sales accumulate into it, the
//! cashier closes it. At most one session per cashier is open at a time
//! (enforced by a partial unique index).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use ventas_core::types::new_id;
use ventas_core::{CashRegister, Money, ValidationError};

#[derive(Debug, sqlx::FromRow)]
struct CashRegisterRow {
    id: String,
    tenant_id: String,
    user_id: String,
    is_open: bool,
    opening_amount_cents: i64,
    total_sales_cents: i64,
    total_cash_cents: i64,
    total_debit_card_cents: i64,
    total_credit_card_cents: i64,
    total_transfer_cents: i64,
    total_check_cents: i64,
    opened_at: DateTime<Utc>,
}

impl From<CashRegisterRow> for CashRegister {
    fn from(row: CashRegisterRow) -> Self {
        CashRegister {
            id: row.id,
            tenant_id: row.tenant_id,
            user_id: row.user_id,
            is_open: row.is_open,
            opening_amount: Money::from_cents(row.opening_amount_cents),
            total_sales: Money::from_cents(row.total_sales_cents),
            total_cash: Money::from_cents(row.total_cash_cents),
            total_debit_card: Money::from_cents(row.total_debit_card_cents),
            total_credit_card: Money::from_cents(row.total_credit_card_cents),
            total_transfer: Money::from_cents(row.total_transfer_cents),
            total_check: Money::from_cents(row.total_check_cents),
            opened_at: row.opened_at,
        }
    }
}

const REGISTER_COLUMNS: &str = "id, tenant_id, user_id, is_open, opening_amount_cents, total_sales_cents, \
     total_cash_cents, total_debit_card_cents, total_credit_card_cents, total_transfer_cents, \
     total_check_cents, opened_at";

/// The open register of a cashier, read through any connection.
pub(crate) async fn find_open_on(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    user_id: &str,
) -> DbResult<Option<CashRegister>> {
    let sql = format!(
        "SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE tenant_id = ?1 AND user_id = ?2 AND is_open = 1"
    );

    let row = sqlx::query_as::<_, CashRegisterRow>(&sql)
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(CashRegister::from))
}

/// Repository for cash register sessions.
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    /// Opens a register session for the cashier.
    pub async fn open(&self, tenant_id: &str, user_id: &str, opening_amount: Money) -> DbResult<CashRegister> {
        if user_id.trim().is_empty() {
            return Err(ValidationError::required("user_id").into());
        }
        if opening_amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "opening_amount".to_string(),
            }
            .into());
        }

        let id = new_id();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO cash_registers (id, tenant_id, user_id, is_open, opening_amount_cents, opened_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(tenant_id)
        .bind(user_id)
        .bind(opening_amount.cents())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("open cash register", user_id),
            other => other,
        })?;

        info!(register_id = %id, tenant_id = %tenant_id, user_id = %user_id, "Cash register opened");

        self.get(tenant_id, &id)
            .await?
            .ok_or_else(|| DbError::not_found("CashRegister", id))
    }

    /// The cashier's open register, if any.
    pub async fn find_open(&self, tenant_id: &str, user_id: &str) -> DbResult<Option<CashRegister>> {
        let mut conn = self.pool.acquire().await?;
        find_open_on(&mut conn, tenant_id, user_id).await
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<CashRegister>> {
        let sql = format!("SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE id = ?1 AND tenant_id = ?2");

        let row = sqlx::query_as::<_, CashRegisterRow>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CashRegister::from))
    }

    /// Closes a session. Closing an already closed one is a not-found.
    pub async fn close(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE cash_registers SET is_open = 0, closed_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND is_open = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("open CashRegister", id));
        }

        info!(register_id = %id, "Cash register closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_one_open_register_per_cashier() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let registers = db.registers();

        let first = registers.open("t1", "u-1", Money::from_cents(5000)).await.unwrap();
        assert!(first.is_open);
        assert_eq!(first.opening_amount.cents(), 5000);
        assert!(first.total_sales.is_zero());

        let err = registers.open("t1", "u-1", Money::zero()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Another cashier can open their own
        registers.open("t1", "u-2", Money::zero()).await.unwrap();

        registers.close("t1", &first.id).await.unwrap();
        assert!(registers.find_open("t1", "u-1").await.unwrap().is_none());

        // After closing, a new session may be opened
        let second = registers.open("t1", "u-1", Money::zero()).await.unwrap();
        assert_eq!(registers.find_open("t1", "u-1").await.unwrap().map(|r| r.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_close_twice_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = db.registers().open("t1", "u-1", Money::zero()).await.unwrap();

        db.registers().close("t1", &register.id).await.unwrap();
        let err = db.registers().close("t1", &register.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
