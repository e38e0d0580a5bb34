//! # Unit Repository
//!
//! Units of measure, declared conversion edges and the per-tenant graph
//! generation counter.
//!
//! ## Generation Counter
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert_edge / delete_edge (one transaction)                            │
//! │       │                                                                 │
//! │       ├──► write conversion_edges row                                   │
//! │       └──► conversion_graph_versions.generation += 1                    │
//! │                                                                         │
//! │  ConversionGraphCache compares its cached generation with the stored   │
//! │  one and rebuilds when they differ. A write is therefore visible to    │
//! │  every operation that starts after it commits.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use ventas_core::types::new_id;
use ventas_core::validation::{validate_conversion_factor, validate_name, validate_unit_code};
use ventas_core::{ConversionEdge, MeasureKind, Unit};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UnitRow {
    id: String,
    tenant_id: Option<String>,
    code: String,
    name: String,
    abbreviation: String,
    measure_kind: MeasureKind,
    allows_decimals: bool,
    is_active: bool,
}

impl From<UnitRow> for Unit {
    fn from(row: UnitRow) -> Self {
        Unit {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name: row.name,
            abbreviation: row.abbreviation,
            measure_kind: row.measure_kind,
            allows_decimals: row.allows_decimals,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EdgeRow {
    tenant_id: String,
    unit_from: String,
    unit_to: String,
    factor: f64,
}

impl From<EdgeRow> for ConversionEdge {
    fn from(row: EdgeRow) -> Self {
        ConversionEdge::new(row.tenant_id, row.unit_from, row.unit_to, row.factor)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for units and conversion edges.
#[derive(Debug, Clone)]
pub struct UnitRepository {
    pool: SqlitePool,
}

impl UnitRepository {
    /// Creates a new UnitRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UnitRepository { pool }
    }

    /// Inserts a unit. `unit.tenant_id = None` creates a shared unit.
    pub async fn insert_unit(&self, unit: &Unit) -> DbResult<()> {
        validate_unit_code(&unit.code)?;
        validate_name("name", &unit.name)?;

        sqlx::query(
            r#"
            INSERT INTO units (
                id, tenant_id, code, name, abbreviation, measure_kind,
                allows_decimals, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&unit.id)
        .bind(&unit.tenant_id)
        .bind(&unit.code)
        .bind(&unit.name)
        .bind(&unit.abbreviation)
        .bind(unit.measure_kind)
        .bind(unit.allows_decimals)
        .bind(unit.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(id = %unit.id, code = %unit.code, "Unit inserted");
        Ok(())
    }

    /// Units visible to a tenant: its own plus the shared ones.
    pub async fn list_units(&self, tenant_id: &str) -> DbResult<Vec<Unit>> {
        let rows = sqlx::query_as::<_, UnitRow>(
            r#"
            SELECT id, tenant_id, code, name, abbreviation, measure_kind,
                   allows_decimals, is_active
            FROM units
            WHERE (tenant_id = ?1 OR tenant_id IS NULL) AND is_active = 1
            ORDER BY code
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Unit::from).collect())
    }

    /// Gets a unit visible to the tenant.
    pub async fn get_unit(&self, tenant_id: &str, id: &str) -> DbResult<Option<Unit>> {
        let row = sqlx::query_as::<_, UnitRow>(
            r#"
            SELECT id, tenant_id, code, name, abbreviation, measure_kind,
                   allows_decimals, is_active
            FROM units
            WHERE id = ?1 AND (tenant_id = ?2 OR tenant_id IS NULL)
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Unit::from))
    }

    /// All conversion edges declared by a tenant, in insertion order.
    pub async fn list_edges(&self, tenant_id: &str) -> DbResult<Vec<ConversionEdge>> {
        let rows = sqlx::query_as::<_, EdgeRow>(
            r#"
            SELECT tenant_id, unit_from, unit_to, factor
            FROM conversion_edges
            WHERE tenant_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConversionEdge::from).collect())
    }

    /// Declares (or re-declares) `1 unit_from = factor unit_to` and bumps the
    /// tenant's graph generation. Returns the new generation.
    pub async fn upsert_edge(&self, tenant_id: &str, unit_from: &str, unit_to: &str, factor: f64) -> DbResult<i64> {
        validate_conversion_factor(unit_from, unit_to, factor)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO conversion_edges (id, tenant_id, unit_from, unit_to, factor, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (tenant_id, unit_from, unit_to)
            DO UPDATE SET factor = excluded.factor, updated_at = excluded.updated_at
            "#,
        )
        .bind(new_id())
        .bind(tenant_id)
        .bind(unit_from)
        .bind(unit_to)
        .bind(factor)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let generation = bump_generation(&mut tx, tenant_id, now).await?;
        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            unit_from = %unit_from,
            unit_to = %unit_to,
            factor,
            generation,
            "Conversion edge saved"
        );
        Ok(generation)
    }

    /// Removes an edge. Returns the new generation.
    pub async fn delete_edge(&self, tenant_id: &str, unit_from: &str, unit_to: &str) -> DbResult<i64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "DELETE FROM conversion_edges WHERE tenant_id = ?1 AND unit_from = ?2 AND unit_to = ?3",
        )
        .bind(tenant_id)
        .bind(unit_from)
        .bind(unit_to)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::not_found(
                "ConversionEdge",
                format!("{unit_from}->{unit_to}"),
            ));
        }

        let generation = bump_generation(&mut tx, tenant_id, now).await?;
        tx.commit().await?;

        info!(tenant_id = %tenant_id, unit_from = %unit_from, unit_to = %unit_to, generation, "Conversion edge removed");
        Ok(generation)
    }

    /// Current graph generation of a tenant (0 when it never declared an edge).
    pub async fn graph_generation(&self, tenant_id: &str) -> DbResult<i64> {
        let generation: Option<i64> =
            sqlx::query_scalar("SELECT generation FROM conversion_graph_versions WHERE tenant_id = ?1")
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(generation.unwrap_or(0))
    }
}

async fn bump_generation(conn: &mut SqliteConnection, tenant_id: &str, now: DateTime<Utc>) -> DbResult<i64> {
    let generation: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO conversion_graph_versions (tenant_id, generation, updated_at)
        VALUES (?1, 1, ?2)
        ON CONFLICT (tenant_id)
        DO UPDATE SET generation = generation + 1, updated_at = excluded.updated_at
        RETURNING generation
        "#,
    )
    .bind(tenant_id)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(generation)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn unit(id: &str, tenant: Option<&str>, kind: MeasureKind) -> Unit {
        Unit {
            id: id.to_string(),
            tenant_id: tenant.map(str::to_string),
            code: id.to_string(),
            name: id.to_uppercase(),
            abbreviation: id.to_string(),
            measure_kind: kind,
            allows_decimals: true,
            is_active: true,
        }
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let units = db.units();
        units.insert_unit(&unit("kg", None, MeasureKind::Mass)).await.unwrap();
        units.insert_unit(&unit("lb", None, MeasureKind::Mass)).await.unwrap();
        units.insert_unit(&unit("saco", Some("t1"), MeasureKind::Count)).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_list_units_includes_shared_and_own() {
        let db = setup().await;

        let t1: Vec<String> = db.units().list_units("t1").await.unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(t1, vec!["kg", "lb", "saco"]);

        let t2 = db.units().list_units("t2").await.unwrap();
        assert_eq!(t2.len(), 2);
        assert!(db.units().get_unit("t2", "saco").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_edge_bumps_generation() {
        let db = setup().await;
        let units = db.units();

        assert_eq!(units.graph_generation("t1").await.unwrap(), 0);
        assert_eq!(units.upsert_edge("t1", "kg", "lb", 2.2).await.unwrap(), 1);
        assert_eq!(units.upsert_edge("t1", "kg", "lb", 2.20462).await.unwrap(), 2);

        let edges = units.list_edges("t1").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].factor, 2.20462);

        // Other tenants are untouched
        assert_eq!(units.graph_generation("t2").await.unwrap(), 0);
        assert!(units.list_edges("t2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_edge_rejects_bad_factor() {
        let db = setup().await;

        let err = db.units().upsert_edge("t1", "kg", "lb", 0.0).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let err = db.units().upsert_edge("t1", "kg", "kg", 1.0).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        assert_eq!(db.units().graph_generation("t1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_edge() {
        let db = setup().await;
        let units = db.units();

        units.upsert_edge("t1", "kg", "lb", 2.20462).await.unwrap();
        assert_eq!(units.delete_edge("t1", "kg", "lb").await.unwrap(), 2);
        assert!(units.list_edges("t1").await.unwrap().is_empty());

        let err = units.delete_edge("t1", "kg", "lb").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(units.graph_generation("t1").await.unwrap(), 2);
    }
}
