//! # Credit
//!
//! Credit accounts, receivables and the eligibility check run before a
//! credit sale.
//!
//! ## Eligibility Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate_credit(account, standing, proposed_total)                     │
//! │                                                                         │
//! │  1. account missing or inactive      ──► NoCreditAccount                │
//! │  2. status = blocked                 ──► CreditBlocked                  │
//! │  3. status = suspended               ──► CreditSuspended                │
//! │  4. classification = D               ──► ClassificationD                │
//! │  5. proposed_total > available       ──► InsufficientCredit             │
//! │  6. any overdue receivable           ──► OverdueReceivables             │
//! │  7. any active critical alert        ──► CriticalCreditAlert            │
//! │  8. otherwise                        ──► allowed                        │
//! │                                                                         │
//! │  First failing check wins. Equality with the available balance passes.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Account
// =============================================================================

/// Risk tier of a credit account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum CreditClassification {
    A,
    B,
    C,
    /// Worst tier; never granted new credit.
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Active,
    Blocked,
    Suspended,
}

/// A client's credit line with one tenant.
///
/// `available_balance` is stored alongside `used_balance` and must always
/// equal `credit_limit - used_balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditAccount {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub credit_limit: Money,
    pub used_balance: Money,
    pub available_balance: Money,
    pub classification: CreditClassification,
    pub status: CreditStatus,
    /// Days between issue and due date of new receivables.
    pub term_days: i64,
    pub is_active: bool,
}

impl CreditAccount {
    /// Due date for a receivable issued on `issued`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// # use ventas_core::credit::*;
    /// # use ventas_core::Money;
    /// # let account = CreditAccount {
    /// #     id: "ca".into(), tenant_id: "t".into(), client_id: "c".into(),
    /// #     credit_limit: Money::zero(), used_balance: Money::zero(),
    /// #     available_balance: Money::zero(),
    /// #     classification: CreditClassification::A, status: CreditStatus::Active,
    /// #     term_days: 30, is_active: true,
    /// # };
    /// let issued = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    /// assert_eq!(account.due_date(issued), NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
    /// ```
    pub fn due_date(&self, issued: NaiveDate) -> NaiveDate {
        let days = Days::new(self.term_days.max(0) as u64);
        issued.checked_add_days(days).unwrap_or(NaiveDate::MAX)
    }

    /// Balances after charging `amount` to the account.
    pub fn after_charge(&self, amount: Money) -> (Money, Money) {
        (self.used_balance + amount, self.available_balance - amount)
    }
}

/// Severity of a credit alert raised against a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    /// Blocks new credit sales while active.
    Critical,
}

/// Outstanding obligations that block new credit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditStanding {
    /// Receivables that are overdue (by status or by due date).
    pub overdue_receivables: i64,
    /// Active alerts with critical severity.
    pub critical_alerts: i64,
}

// =============================================================================
// Decision
// =============================================================================

/// Why a credit sale was refused. Each variant carries its own user-facing
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditDenial {
    #[error("the client has no active credit account")]
    NoCreditAccount,

    #[error("the client's credit is blocked")]
    CreditBlocked,

    #[error("the client's credit is suspended")]
    CreditSuspended,

    #[error("clients with classification D cannot buy on credit")]
    ClassificationD,

    #[error("insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit { available: Money, requested: Money },

    #[error("the client has {count} overdue receivable(s)")]
    OverdueReceivables { count: i64 },

    #[error("the client has {count} active critical credit alert(s)")]
    CriticalCreditAlert { count: i64 },
}

/// Result of a credit evaluation as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditDecision {
    pub allowed: bool,
    /// Human-readable reason when not allowed.
    pub reason: Option<String>,
    /// Machine-readable denial when not allowed.
    pub denial: Option<CreditDenial>,
}

impl CreditDecision {
    pub fn allowed() -> Self {
        CreditDecision {
            allowed: true,
            reason: None,
            denial: None,
        }
    }

    pub fn denied(denial: CreditDenial) -> Self {
        CreditDecision {
            allowed: false,
            reason: Some(denial.to_string()),
            denial: Some(denial),
        }
    }
}

impl From<Result<(), CreditDenial>> for CreditDecision {
    fn from(result: Result<(), CreditDenial>) -> Self {
        match result {
            Ok(()) => CreditDecision::allowed(),
            Err(denial) => CreditDecision::denied(denial),
        }
    }
}

/// Runs the eligibility checks in order.
pub fn check_credit(
    account: Option<&CreditAccount>,
    standing: &CreditStanding,
    proposed_total: Money,
) -> Result<(), CreditDenial> {
    let account = match account {
        Some(account) if account.is_active => account,
        _ => return Err(CreditDenial::NoCreditAccount),
    };

    match account.status {
        CreditStatus::Blocked => return Err(CreditDenial::CreditBlocked),
        CreditStatus::Suspended => return Err(CreditDenial::CreditSuspended),
        CreditStatus::Active => {}
    }

    if account.classification == CreditClassification::D {
        return Err(CreditDenial::ClassificationD);
    }

    if proposed_total > account.available_balance {
        return Err(CreditDenial::InsufficientCredit {
            available: account.available_balance,
            requested: proposed_total,
        });
    }

    if standing.overdue_receivables > 0 {
        return Err(CreditDenial::OverdueReceivables {
            count: standing.overdue_receivables,
        });
    }

    if standing.critical_alerts > 0 {
        return Err(CreditDenial::CriticalCreditAlert {
            count: standing.critical_alerts,
        });
    }

    Ok(())
}

/// [`check_credit`] shaped as a caller-facing decision.
pub fn evaluate_credit(
    account: Option<&CreditAccount>,
    standing: &CreditStanding,
    proposed_total: Money,
) -> CreditDecision {
    check_credit(account, standing, proposed_total).into()
}

// =============================================================================
// Receivables & History
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ReceivableStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl ReceivableStatus {
    /// Overdue either explicitly or because an open receivable passed its
    /// due date.
    pub fn is_overdue(&self, due_date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            ReceivableStatus::Overdue => true,
            ReceivableStatus::Pending | ReceivableStatus::Partial => due_date < today,
            ReceivableStatus::Paid => false,
        }
    }
}

/// Amount owed by a client after a credit sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receivable {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub credit_account_id: String,
    pub sale_id: String,
    pub document_number: String,
    pub amount: Money,
    pub balance: Money,
    #[ts(as = "String")]
    pub issue_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: ReceivableStatus,
}

/// Audit row written for every movement on a credit account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditHistoryEntry {
    pub id: String,
    pub tenant_id: String,
    pub credit_account_id: String,
    pub sale_id: Option<String>,
    /// Movement kind, e.g. `sale`.
    pub movement: String,
    pub amount: Money,
    pub used_before: Money,
    pub used_after: Money,
    pub available_before: Money,
    pub available_after: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
