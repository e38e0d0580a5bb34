//! # Fiscal Repository
//!
//! Fiscal document types and their bounded number sequences.
//!
//! Issuing a number happens inside the sale transaction
//! (`checkout::ledger::allocate_fiscal_number`) so that a failed sale never
//! consumes one. This repository only creates and reads the types.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use ventas_core::validation::validate_name;
use ventas_core::{FiscalDocumentType, ValidationError};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FiscalDocumentTypeRow {
    id: String,
    tenant_id: String,
    code: String,
    name: String,
    prefix: String,
    current_sequence: i64,
    sequence_end: i64,
    is_active: bool,
}

impl From<FiscalDocumentTypeRow> for FiscalDocumentType {
    fn from(row: FiscalDocumentTypeRow) -> Self {
        FiscalDocumentType {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name: row.name,
            prefix: row.prefix,
            current_sequence: row.current_sequence,
            sequence_end: row.sequence_end,
            is_active: row.is_active,
        }
    }
}

pub(crate) const FISCAL_TYPE_SELECT: &str = r#"
    SELECT id, tenant_id, code, name, prefix, current_sequence, sequence_end, is_active
    FROM fiscal_document_types
    WHERE id = ?1 AND tenant_id = ?2
"#;

/// Repository for fiscal document types.
#[derive(Debug, Clone)]
pub struct FiscalRepository {
    pool: SqlitePool,
}

impl FiscalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FiscalRepository { pool }
    }

    pub async fn insert(&self, doc: &FiscalDocumentType) -> DbResult<()> {
        validate_name("name", &doc.name)?;
        if doc.prefix.trim().is_empty() {
            return Err(ValidationError::required("prefix").into());
        }
        if doc.sequence_end <= 0 {
            return Err(ValidationError::must_be_positive("sequence_end").into());
        }

        sqlx::query(
            r#"
            INSERT INTO fiscal_document_types (
                id, tenant_id, code, name, prefix, current_sequence, sequence_end, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.tenant_id)
        .bind(&doc.code)
        .bind(&doc.name)
        .bind(&doc.prefix)
        .bind(doc.current_sequence)
        .bind(doc.sequence_end)
        .bind(doc.is_active)
        .execute(&self.pool)
        .await?;

        debug!(id = %doc.id, code = %doc.code, "Fiscal document type inserted");
        Ok(())
    }

    /// Gets a document type of the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<FiscalDocumentType>> {
        let row = sqlx::query_as::<_, FiscalDocumentTypeRow>(FISCAL_TYPE_SELECT)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FiscalDocumentType::from))
    }
}
