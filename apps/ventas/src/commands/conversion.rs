//! # Conversion Procedures

use serde::{Deserialize, Serialize};
use tracing::debug;

use ventas_core::conversion::{self, ConvertedQuantity};
use ventas_core::Quantity;

use crate::commands::require;
use crate::error::ApiError;
use crate::state::DbState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFactorRequest {
    pub unit_from_id: String,
    pub unit_to_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFactorResponse {
    /// `null` when no path exists.
    pub factor: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuantityRequest {
    pub quantity: Quantity,
    pub unit_from_id: String,
    pub unit_to_id: String,
}

/// Factor that turns one `unit_from` into `unit_to` for the tenant.
pub async fn resolve_conversion_factor(
    db: &DbState,
    tenant_id: &str,
    request: &ConversionFactorRequest,
) -> Result<ConversionFactorResponse, ApiError> {
    require("tenantId", tenant_id)?;
    require("unitFromId", &request.unit_from_id)?;
    require("unitToId", &request.unit_to_id)?;

    let graph = db.inner().graph_cache().get_or_build(tenant_id, db.inner().pool()).await?;
    let factor = graph.resolve(&request.unit_from_id, &request.unit_to_id);

    debug!(
        tenant_id = %tenant_id,
        from = %request.unit_from_id,
        to = %request.unit_to_id,
        ?factor,
        "resolve_conversion_factor"
    );
    Ok(ConversionFactorResponse { factor })
}

/// Carries a quantity into another unit. Without a path the quantity comes
/// back unchanged with an `unconverted` outcome.
pub async fn convert_quantity(
    db: &DbState,
    tenant_id: &str,
    request: &ConvertQuantityRequest,
) -> Result<ConvertedQuantity, ApiError> {
    require("tenantId", tenant_id)?;
    require("unitFromId", &request.unit_from_id)?;
    require("unitToId", &request.unit_to_id)?;

    let graph = db.inner().graph_cache().get_or_build(tenant_id, db.inner().pool()).await?;
    let converted =
        conversion::convert_quantity(&graph, request.quantity, &request.unit_from_id, &request.unit_to_id)?;

    if converted.outcome.is_degraded() {
        tracing::warn!(
            tenant_id = %tenant_id,
            from = %request.unit_from_id,
            to = %request.unit_to_id,
            "No conversion path, quantity returned unconverted"
        );
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use ventas_core::{ConversionOutcome, MeasureKind, Unit};
    use ventas_db::{Database, DbConfig};

    async fn state() -> DbState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for id in ["kg", "lb", "g", "m"] {
            db.units()
                .insert_unit(&Unit {
                    id: id.to_string(),
                    tenant_id: None,
                    code: id.to_string(),
                    name: id.to_string(),
                    abbreviation: id.to_string(),
                    measure_kind: if id == "m" { MeasureKind::Length } else { MeasureKind::Mass },
                    allows_decimals: true,
                    is_active: true,
                })
                .await
                .unwrap();
        }
        db.units().upsert_edge("t1", "kg", "lb", 2.20462).await.unwrap();
        db.units().upsert_edge("t1", "kg", "g", 1000.0).await.unwrap();
        DbState::new(db, &AppConfig::default())
    }

    fn factor_request(from: &str, to: &str) -> ConversionFactorRequest {
        ConversionFactorRequest {
            unit_from_id: from.to_string(),
            unit_to_id: to.to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_factor() {
        let db = state().await;

        let same = resolve_conversion_factor(&db, "t1", &factor_request("kg", "kg")).await.unwrap();
        assert_eq!(same.factor, Some(1.0));

        let direct = resolve_conversion_factor(&db, "t1", &factor_request("kg", "g")).await.unwrap();
        assert_eq!(direct.factor, Some(1000.0));

        // lb → kg → g
        let chained = resolve_conversion_factor(&db, "t1", &factor_request("lb", "g")).await.unwrap();
        assert!((chained.factor.unwrap() - 1000.0 / 2.20462).abs() < 1e-9);

        let none = resolve_conversion_factor(&db, "t1", &factor_request("kg", "m")).await.unwrap();
        assert_eq!(none.factor, None);

        // Edges are per tenant
        let other = resolve_conversion_factor(&db, "t2", &factor_request("kg", "g")).await.unwrap();
        assert_eq!(other.factor, None);
    }

    #[tokio::test]
    async fn test_convert_quantity() {
        let db = state().await;

        let request = ConvertQuantityRequest {
            quantity: Quantity::from_units(2),
            unit_from_id: "kg".to_string(),
            unit_to_id: "g".to_string(),
        };
        let converted = convert_quantity(&db, "t1", &request).await.unwrap();
        assert_eq!(converted.quantity, Quantity::from_units(2000));
        assert_eq!(converted.outcome, ConversionOutcome::Converted { factor: 1000.0 });

        let request = ConvertQuantityRequest {
            unit_to_id: "m".to_string(),
            ..request
        };
        let converted = convert_quantity(&db, "t1", &request).await.unwrap();
        assert_eq!(converted.quantity, Quantity::from_units(2));
        assert_eq!(converted.outcome, ConversionOutcome::Unconverted);
    }

    #[tokio::test]
    async fn test_convert_quantity_too_large() {
        let db = state().await;

        let request = ConvertQuantityRequest {
            quantity: Quantity::from_milli(i64::MAX / 10),
            unit_from_id: "kg".to_string(),
            unit_to_id: "g".to_string(),
        };
        let err = convert_quantity(&db, "t1", &request).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_blank_tenant_rejected() {
        let db = state().await;
        let err = resolve_conversion_factor(&db, " ", &factor_request("kg", "g")).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);
    }
}
