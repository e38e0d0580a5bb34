//! # Product Repository
//!
//! Products as the sales core sees them: base unit, price per base unit
//! and stock in base units.
//!
//! Stock is only ever decremented inside a sale transaction
//! (see [`checkout`](crate::checkout)); this repository reads it and
//! supports receiving stock for setup and tests.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use ventas_core::validation::{validate_name, validate_sku};
use ventas_core::{Money, Product, Quantity, ValidationError};

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, name, base_unit_id, sale_unit_id, price_cents, \
     stock_milli, tax_applicable, allows_decimals, is_active";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    tenant_id: String,
    sku: String,
    name: String,
    base_unit_id: String,
    sale_unit_id: Option<String>,
    price_cents: i64,
    stock_milli: i64,
    tax_applicable: bool,
    allows_decimals: bool,
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            tenant_id: row.tenant_id,
            sku: row.sku,
            name: row.name,
            base_unit_id: row.base_unit_id,
            sale_unit_id: row.sale_unit_id,
            price_per_base_unit: Money::from_cents(row.price_cents),
            stock: Quantity::from_milli(row.stock_milli),
            tax_applicable: row.tax_applicable,
            allows_decimals: row.allows_decimals,
            is_active: row.is_active,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("t1", "p-cement").await?;
/// let batch = repo.get_many("t1", &["p-cement", "p-rebar"]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_sku(&product.sku)?;
        validate_name("name", &product.name)?;
        if product.price_per_base_unit.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "price".to_string(),
            }
            .into());
        }
        if product.stock.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string(),
            }
            .into());
        }

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, base_unit_id, sale_unit_id,
                price_cents, stock_milli, tax_applicable, allows_decimals,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.base_unit_id)
        .bind(&product.sale_unit_id)
        .bind(product.price_per_base_unit.cents())
        .bind(product.stock.milli())
        .bind(product.tax_applicable)
        .bind(product.allows_decimals)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.contains("sku") => {
                DbError::duplicate("sku", product.sku.clone())
            }
            other => other,
        })?;

        debug!(id = %product.id, sku = %product.sku, "Product inserted");
        Ok(())
    }

    /// Gets a product of the tenant by its ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Loads several products of the tenant at once, keyed by id.
    ///
    /// Ids that don't exist (or belong to another tenant) are simply absent
    /// from the map.
    pub async fn get_many<S: AsRef<str>>(&self, tenant_id: &str, ids: &[S]) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
        builder.push(PRODUCT_COLUMNS);
        builder.push(" FROM products WHERE tenant_id = ");
        builder.push_bind(tenant_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_ref());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        debug!(requested = ids.len(), found = rows.len(), "Products loaded");
        Ok(rows
            .into_iter()
            .map(|row| (row.id.clone(), Product::from(row)))
            .collect())
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 AND is_active = 1 ORDER BY name LIMIT ?2"
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Current stock of a product, in base units.
    pub async fn stock(&self, tenant_id: &str, id: &str) -> DbResult<Quantity> {
        let milli: i64 = sqlx::query_scalar("SELECT stock_milli FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        Ok(Quantity::from_milli(milli))
    }

    /// Adds received goods to stock. Returns the new level.
    pub async fn receive_stock(&self, tenant_id: &str, id: &str, quantity: Quantity) -> DbResult<Quantity> {
        if !quantity.is_positive() {
            return Err(ValidationError::must_be_positive("quantity").into());
        }

        let milli: i64 = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_milli = stock_milli + ?1, updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4
            RETURNING stock_milli
            "#,
        )
        .bind(quantity.milli())
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        debug!(id = %id, received = %quantity, stock_milli = milli, "Stock received");
        Ok(Quantity::from_milli(milli))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
