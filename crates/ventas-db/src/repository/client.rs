//! # Client Repository
//!
//! Clients and their running purchase aggregates. The aggregates are only
//! advanced by committed sales.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use ventas_core::validation::validate_name;
use ventas_core::{Client, Money};

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    tenant_id: String,
    name: String,
    document_number: Option<String>,
    total_purchases_cents: i64,
    purchase_count: i64,
    last_purchase_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            document_number: row.document_number,
            total_purchases: Money::from_cents(row.total_purchases_cents),
            purchase_count: row.purchase_count,
            last_purchase_at: row.last_purchase_at,
            is_active: row.is_active,
        }
    }
}

/// Repository for clients.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a client. Aggregates start from whatever the record carries.
    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        validate_name("name", &client.name)?;

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, tenant_id, name, document_number, total_purchases_cents,
                purchase_count, last_purchase_at, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.name)
        .bind(&client.document_number)
        .bind(client.total_purchases.cents())
        .bind(client.purchase_count)
        .bind(client.last_purchase_at)
        .bind(client.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(id = %client.id, "Client inserted");
        Ok(())
    }

    /// Gets a client of the tenant by its ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT id, tenant_id, name, document_number, total_purchases_cents,
                   purchase_count, last_purchase_at, is_active
            FROM clients
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_and_get_scoped_by_tenant() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let client = Client {
            id: "c-1".to_string(),
            tenant_id: "t1".to_string(),
            name: "Ferretería Central".to_string(),
            document_number: Some("101-00000-1".to_string()),
            total_purchases: Money::zero(),
            purchase_count: 0,
            last_purchase_at: None,
            is_active: true,
        };

        db.clients().insert(&client).await.unwrap();

        assert_eq!(db.clients().get_by_id("t1", "c-1").await.unwrap(), Some(client));
        assert_eq!(db.clients().get_by_id("t2", "c-1").await.unwrap(), None);
    }
}
