//! # Repository Module
//!
//! Database repository implementations for the sales core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Procedure                                                             │
//! │       │                                                                 │
//! │       │  db.credits().evaluate("t1", "c-1", total, today)              │
//! │       ▼                                                                 │
//! │  CreditRepository                                                      │
//! │  ├── get_account(&self, tenant, client)                                │
//! │  ├── standing(&self, tenant, client, today)                            │
//! │  └── evaluate(&self, tenant, client, total, today)                     │
//! │       │                                                                 │
//! │       │  SQL Query (runtime-checked, FromRow rows)                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Every query is scoped by tenant_id.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UnitRepository`](unit::UnitRepository) - Units, conversion edges, graph generation
//! - [`ProductRepository`](product::ProductRepository) - Products and stock
//! - [`ClientRepository`](client::ClientRepository) - Clients and purchase aggregates
//! - [`CreditRepository`](credit::CreditRepository) - Credit accounts, alerts, receivables
//! - [`FiscalRepository`](fiscal::FiscalRepository) - Fiscal document types
//! - [`CashRegisterRepository`](register::CashRegisterRepository) - Register sessions
//! - [`SaleRepository`](sale::SaleRepository) - Committed sales (read side)
//!
//! Writes that belong to a sale are not here; they live in
//! [`checkout::ledger`](crate::checkout) and run on the sale's transaction.

pub mod client;
pub mod credit;
pub mod fiscal;
pub mod product;
pub mod register;
pub mod sale;
pub mod unit;
