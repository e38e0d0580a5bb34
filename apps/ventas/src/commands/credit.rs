//! # Credit Procedures

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ventas_core::{CreditDecision, Money};

use crate::commands::require;
use crate::error::ApiError;
use crate::state::DbState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateCreditRequest {
    pub client_id: String,
    /// Cents.
    pub proposed_total: Money,
}

/// Whether the client may buy `proposed_total` on credit today.
///
/// A denial is a normal answer (`allowed: false` with a reason), not an
/// error.
pub async fn evaluate_credit(
    db: &DbState,
    tenant_id: &str,
    request: &EvaluateCreditRequest,
) -> Result<CreditDecision, ApiError> {
    require("tenantId", tenant_id)?;
    require("clientId", &request.client_id)?;
    if request.proposed_total.is_negative() {
        return Err(ApiError::validation("proposedTotal must not be negative"));
    }

    let decision = db
        .inner()
        .credits()
        .evaluate(tenant_id, &request.client_id, request.proposed_total, Utc::now().date_naive())
        .await?;

    debug!(
        tenant_id = %tenant_id,
        client_id = %request.client_id,
        allowed = decision.allowed,
        "evaluate_credit"
    );
    Ok(decision)
}
