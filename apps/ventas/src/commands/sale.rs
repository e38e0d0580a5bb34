//! # Sale Procedures

use tracing::debug;

use ventas_core::{SaleContext, SaleReceipt, SaleRequest};

use crate::error::ApiError;
use crate::state::DbState;

/// Prices, checks and commits a sale in one transaction.
///
/// Tenant and cashier come from `ctx`; the body never names them.
pub async fn create_sale(db: &DbState, ctx: &SaleContext, request: &SaleRequest) -> Result<SaleReceipt, ApiError> {
    debug!(
        tenant_id = %ctx.tenant_id,
        user_id = %ctx.user_id,
        lines = request.lines.len(),
        "create_sale"
    );

    let receipt = db.checkout().create_sale(ctx, request).await?;
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppConfig;
    use ventas_core::{FiscalDocumentType, MeasureKind, Money, Product, Quantity, Unit};
    use ventas_db::{Database, DbConfig};

    async fn state(config: &AppConfig) -> DbState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.units()
            .insert_unit(&Unit {
                id: "unit".to_string(),
                tenant_id: None,
                code: "unit".to_string(),
                name: "Unidad".to_string(),
                abbreviation: "u".to_string(),
                measure_kind: MeasureKind::Count,
                allows_decimals: false,
                is_active: true,
            })
            .await
            .unwrap();
        db.products()
            .insert(&Product {
                id: "p-1".to_string(),
                tenant_id: "t1".to_string(),
                sku: "LLV-01".to_string(),
                name: "Llave inglesa".to_string(),
                base_unit_id: "unit".to_string(),
                sale_unit_id: None,
                price_per_base_unit: Money::from_cents(1000),
                stock: Quantity::from_units(5),
                tax_applicable: true,
                allows_decimals: false,
                is_active: true,
            })
            .await
            .unwrap();
        db.fiscal()
            .insert(&FiscalDocumentType {
                id: "ncf".to_string(),
                tenant_id: "t1".to_string(),
                code: "B02".to_string(),
                name: "Consumidor final".to_string(),
                prefix: "B02".to_string(),
                current_sequence: 0,
                sequence_end: 10,
                is_active: true,
            })
            .await
            .unwrap();
        db.registers().open("t1", "u-1", Money::zero()).await.unwrap();
        DbState::new(db, config)
    }

    fn request_json(quantity: u32) -> String {
        format!(
            r#"{{
                "fiscalDocumentTypeId": "ncf",
                "lines": [{{ "productId": "p-1", "quantity": {quantity} }}],
                "paymentMethod": "cash",
                "cashReceived": 50000
            }}"#
        )
    }

    #[tokio::test]
    async fn test_create_sale_from_json() {
        let config = AppConfig {
            internal_number_prefix: "FAC-".to_string(),
            tax_rate_bps: 1600,
            ..AppConfig::default()
        };
        let db = state(&config).await;
        let request: SaleRequest = serde_json::from_str(&request_json(2)).unwrap();

        let receipt = create_sale(&db, &SaleContext::new("t1", "u-1"), &request).await.unwrap();
        assert_eq!(receipt.fiscal_number, "B0200000001");
        assert_eq!(receipt.internal_number, "FAC-00000001");
        assert_eq!(receipt.totals.total.cents(), 2320);
        assert_eq!(receipt.change.cents(), 47680);

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["fiscalNumber"], "B0200000001");
    }

    #[tokio::test]
    async fn test_rejection_maps_to_code() {
        let db = state(&AppConfig::default()).await;
        let request: SaleRequest = serde_json::from_str(&request_json(9)).unwrap();

        let err = create_sale(&db, &SaleContext::new("t1", "u-1"), &request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = create_sale(&db, &SaleContext::new("t1", "u-2"), &serde_json::from_str(&request_json(1)).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOpenCashRegister);
    }
}
