//! End-to-end sale scenarios against an in-memory database.

use chrono::Days;

use ventas_core::credit::{AlertSeverity, CreditClassification, CreditStatus, ReceivableStatus};
use ventas_core::pricing::PricingWarning;
use ventas_core::sale::{SaleExtraRequest, SaleLineRequest};
use ventas_core::{
    Client, CoreError, CreditDenial, FiscalDocumentType, FulfillmentType, MeasureKind, Money, PaymentMethod, Product,
    Quantity, SaleContext, SaleRequest, SaleTotals, Unit,
};
use ventas_db::{CheckoutError, CheckoutSettings, Database, DbConfig};

const TENANT: &str = "t1";
const CASHIER: &str = "u-1";
const NCF: &str = "ncf-b02";

// =============================================================================
// Fixtures
// =============================================================================

async fn add_unit(db: &Database, id: &str, kind: MeasureKind, decimals: bool) {
    db.units()
        .insert_unit(&Unit {
            id: id.to_string(),
            tenant_id: None,
            code: id.to_string(),
            name: id.to_string(),
            abbreviation: id.to_string(),
            measure_kind: kind,
            allows_decimals: decimals,
            is_active: true,
        })
        .await
        .unwrap();
}

async fn add_product(db: &Database, id: &str, base: &str, sale: Option<&str>, price: i64, stock: i64, decimals: bool) {
    db.products()
        .insert(&Product {
            id: id.to_string(),
            tenant_id: TENANT.to_string(),
            sku: id.to_uppercase(),
            name: id.to_string(),
            base_unit_id: base.to_string(),
            sale_unit_id: sale.map(str::to_string),
            price_per_base_unit: Money::from_cents(price),
            stock: Quantity::from_milli(stock),
            tax_applicable: true,
            allows_decimals: decimals,
            is_active: true,
        })
        .await
        .unwrap();
}

async fn add_fiscal(db: &Database, id: &str, code: &str, current: i64, end: i64) {
    db.fiscal()
        .insert(&FiscalDocumentType {
            id: id.to_string(),
            tenant_id: TENANT.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            prefix: code.to_string(),
            current_sequence: current,
            sequence_end: end,
            is_active: true,
        })
        .await
        .unwrap();
}

/// Cement sold by the pound (kg base), tiles sold by the box of two, rope by
/// the metre. One open register for the cashier and a credit client whose
/// line is exactly the price of 5 lb of cement.
async fn store() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    add_unit(&db, "kg", MeasureKind::Mass, true).await;
    add_unit(&db, "lb", MeasureKind::Mass, true).await;
    add_unit(&db, "unit", MeasureKind::Count, false).await;
    add_unit(&db, "box", MeasureKind::Count, false).await;
    add_unit(&db, "m", MeasureKind::Length, true).await;

    db.units().upsert_edge(TENANT, "kg", "lb", 2.20462).await.unwrap();
    db.units().upsert_edge(TENANT, "box", "unit", 2.0).await.unwrap();

    add_product(&db, "cement", "kg", Some("lb"), 10000, 50_000, true).await;
    add_product(&db, "tile", "unit", Some("box"), 500, 100_000, false).await;
    add_product(&db, "rope", "m", None, 300, 100_000, true).await;

    db.clients()
        .insert(&Client {
            id: "c-1".to_string(),
            tenant_id: TENANT.to_string(),
            name: "Constructora Uno".to_string(),
            document_number: None,
            total_purchases: Money::zero(),
            purchase_count: 0,
            last_purchase_at: None,
            is_active: true,
        })
        .await
        .unwrap();
    db.credits()
        .open_account(TENANT, "c-1", Money::from_cents(26762), CreditClassification::A, 30)
        .await
        .unwrap();

    add_fiscal(&db, NCF, "B02", 0, 100).await;
    db.registers().open(TENANT, CASHIER, Money::zero()).await.unwrap();

    db
}

fn ctx() -> SaleContext {
    SaleContext::new(TENANT, CASHIER)
}

fn cash_sale(lines: Vec<SaleLineRequest>, cash: i64) -> SaleRequest {
    SaleRequest {
        fiscal_document_type_id: NCF.to_string(),
        client_id: None,
        lines,
        extras: Vec::new(),
        totals: SaleTotals::default(),
        payment_method: Some(PaymentMethod::Cash),
        cash_received: Some(Money::from_cents(cash)),
        fulfillment_type: FulfillmentType::Complete,
        notes: None,
    }
}

fn credit_sale(client_id: &str, lines: Vec<SaleLineRequest>) -> SaleRequest {
    SaleRequest {
        client_id: Some(client_id.to_string()),
        payment_method: Some(PaymentMethod::Credit),
        cash_received: None,
        ..cash_sale(lines, 0)
    }
}

fn five_lb_of_cement() -> Vec<SaleLineRequest> {
    vec![SaleLineRequest::new("cement", Quantity::from_units(5)).in_unit("lb")]
}

async fn fiscal_sequence(db: &Database, id: &str) -> i64 {
    db.fiscal().get(TENANT, id).await.unwrap().unwrap().current_sequence
}

async fn stock(db: &Database, product_id: &str) -> i64 {
    db.products().stock(TENANT, product_id).await.unwrap().milli()
}

async fn count_rows(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

/// Asserts the store looks exactly as [`store`] left it.
async fn assert_untouched(db: &Database) {
    assert_eq!(db.sales().count(TENANT).await.unwrap(), 0);
    assert_eq!(count_rows(db, "sale_lines").await, 0);
    assert_eq!(count_rows(db, "inventory_movements").await, 0);
    assert_eq!(count_rows(db, "receivables").await, 0);
    assert_eq!(count_rows(db, "credit_history").await, 0);
    assert_eq!(fiscal_sequence(db, NCF).await, 0);
    assert_eq!(stock(db, "cement").await, 50_000);
    assert_eq!(stock(db, "tile").await, 100_000);
    assert_eq!(stock(db, "rope").await, 100_000);

    let register = db.registers().find_open(TENANT, CASHIER).await.unwrap().unwrap();
    assert_eq!(register.total_sales, Money::zero());

    let account = db.credits().get_account(TENANT, "c-1").await.unwrap().unwrap();
    assert_eq!(account.available_balance.cents(), 26762);
}

// =============================================================================
// Committed Sales
// =============================================================================

#[tokio::test]
async fn test_cash_sale_in_pounds_of_a_kilogram_product() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let receipt = checkout.create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 30000)).await.unwrap();

    assert_eq!(receipt.fiscal_number, "B0200000001");
    assert_eq!(receipt.internal_number, "VT-00000001");
    assert_eq!(receipt.totals.subtotal.cents(), 22680);
    assert_eq!(receipt.totals.tax.cents(), 4082);
    assert_eq!(receipt.totals.total.cents(), 26762);
    assert_eq!(receipt.change.cents(), 3238);
    assert!(receipt.warnings.is_empty());

    // 5 lb ≈ 2.268 kg leaves the warehouse
    assert_eq!(stock(&db, "cement").await, 47_732);
    assert_eq!(fiscal_sequence(&db, NCF).await, 1);

    let sale = db.sales().get_by_id(TENANT, &receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(sale.payment_method, PaymentMethod::Cash);
    assert_eq!(sale.fiscal_number, receipt.fiscal_number);
    assert_eq!(sale.totals, receipt.totals);
    assert_eq!(sale.cash_received, Some(Money::from_cents(30000)));
    assert_eq!(sale.change.cents(), 3238);
    assert_eq!(sale.user_id, CASHIER);

    let lines = db.sales().get_lines(&receipt.sale_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_id, "lb");
    assert_eq!(lines[0].quantity.milli(), 5_000);
    assert_eq!(lines[0].base_quantity.milli(), 2_268);
    assert_eq!(lines[0].unit_price.cents(), 4536);
    assert_eq!(lines[0].quantity_pending, Quantity::zero());

    let movements = db.sales().get_movements(&receipt.sale_id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "sale");
    assert_eq!(movements[0].quantity.milli(), -2_268);
    assert_eq!(movements[0].stock_before.milli(), 50_000);
    assert_eq!(movements[0].stock_after.milli(), 47_732);

    let register = db.registers().find_open(TENANT, CASHIER).await.unwrap().unwrap();
    assert_eq!(register.id, sale.cash_register_id);
    assert_eq!(register.total_sales.cents(), 26762);
    assert_eq!(register.total_cash.cents(), 26762);
    assert_eq!(register.total_transfer, Money::zero());

    assert!(db.sales().get_receivable(&receipt.sale_id).await.unwrap().is_none());
    assert!(db.sales().get_dispatches(&receipt.sale_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_numbers_advance_per_sale() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let first = checkout.create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 30000)).await.unwrap();
    let second = checkout.create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 30000)).await.unwrap();

    assert_eq!(first.fiscal_number, "B0200000001");
    assert_eq!(second.fiscal_number, "B0200000002");
    assert_eq!(second.internal_number, "VT-00000002");
    assert_eq!(db.sales().count(TENANT).await.unwrap(), 2);
    assert_eq!(stock(&db, "cement").await, 50_000 - 2 * 2_268);

    let register = db.registers().find_open(TENANT, CASHIER).await.unwrap().unwrap();
    assert_eq!(register.total_cash.cents(), 2 * 26762);
}

#[tokio::test]
async fn test_extras_and_discount() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let mut request = cash_sale(vec![SaleLineRequest::new("rope", Quantity::from_units(10))], 100_000);
    request.extras.push(SaleExtraRequest {
        name: "Delivery".to_string(),
        kind: "freight".to_string(),
        quantity: Quantity::from_units(1),
        unit_price: Money::from_cents(1000),
        tax_applicable: false,
    });
    request.totals.discount = Money::from_cents(500);

    let receipt = checkout.create_sale(&ctx(), &request).await.unwrap();

    // rope 10 × 3.00 = 30.00 (+5.40 tax), freight 10.00 untaxed, 5.00 off
    assert_eq!(receipt.totals.subtotal.cents(), 4000);
    assert_eq!(receipt.totals.discount.cents(), 500);
    assert_eq!(receipt.totals.taxable_base.cents(), 3500);
    assert_eq!(receipt.totals.tax.cents(), 540);
    assert_eq!(receipt.totals.total.cents(), 4040);

    let extras = db.sales().get_extras(&receipt.sale_id).await.unwrap();
    assert_eq!(extras.len(), 1);
    assert_eq!(extras[0].kind, "freight");
    assert_eq!(extras[0].tax, Money::zero());
    assert_eq!(stock(&db, "rope").await, 90_000);
}

#[tokio::test]
async fn test_credit_sale_up_to_the_available_balance() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    // Total equals the available balance exactly
    let receipt = checkout
        .create_sale(&ctx(), &credit_sale("c-1", five_lb_of_cement()))
        .await
        .unwrap();
    assert_eq!(receipt.totals.total.cents(), 26762);
    assert_eq!(receipt.change, Money::zero());

    let account = db.credits().get_account(TENANT, "c-1").await.unwrap().unwrap();
    assert_eq!(account.used_balance.cents(), 26762);
    assert_eq!(account.available_balance, Money::zero());
    assert_eq!(account.used_balance + account.available_balance, account.credit_limit);

    let receivable = db.sales().get_receivable(&receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(receivable.client_id, "c-1");
    assert_eq!(receivable.credit_account_id, account.id);
    assert_eq!(receivable.document_number, receipt.fiscal_number);
    assert_eq!(receivable.amount.cents(), 26762);
    assert_eq!(receivable.balance.cents(), 26762);
    assert_eq!(receivable.status, ReceivableStatus::Pending);
    assert_eq!(
        receivable.due_date,
        receivable.issue_date.checked_add_days(Days::new(30)).unwrap()
    );

    let history = db.credits().history_for_account(TENANT, &account.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movement, "sale");
    assert_eq!(history[0].sale_id.as_deref(), Some(receipt.sale_id.as_str()));
    assert_eq!(history[0].used_before, Money::zero());
    assert_eq!(history[0].used_after.cents(), 26762);
    assert_eq!(history[0].available_before.cents(), 26762);
    assert_eq!(history[0].available_after, Money::zero());

    // Credit sales count towards total sales only
    let register = db.registers().find_open(TENANT, CASHIER).await.unwrap().unwrap();
    assert_eq!(register.total_sales.cents(), 26762);
    assert_eq!(register.total_cash, Money::zero());

    let client = db.clients().get_by_id(TENANT, "c-1").await.unwrap().unwrap();
    assert_eq!(client.total_purchases.cents(), 26762);
    assert_eq!(client.purchase_count, 1);
    assert!(client.last_purchase_at.is_some());

    // Nothing left on the line
    let err = checkout
        .create_sale(
            &ctx(),
            &credit_sale("c-1", vec![SaleLineRequest::new("rope", Quantity::from_units(1))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::CreditDenied(CreditDenial::InsufficientCredit { .. }))
    ));
    assert_eq!(db.sales().count(TENANT).await.unwrap(), 1);
    assert_eq!(fiscal_sequence(&db, NCF).await, 1);
}

#[tokio::test]
async fn test_partial_fulfillment_records_a_dispatch() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let mut request = cash_sale(
        vec![SaleLineRequest::new("tile", Quantity::from_units(10)).fulfill_now(Quantity::from_units(4))],
        0,
    );
    request.payment_method = Some(PaymentMethod::Transfer);
    request.cash_received = None;
    request.fulfillment_type = FulfillmentType::Partial;

    let receipt = checkout.create_sale(&ctx(), &request).await.unwrap();

    // 10 boxes of 2 at 10.00 per box
    assert_eq!(receipt.totals.subtotal.cents(), 10000);
    assert_eq!(receipt.totals.total.cents(), 11800);

    // 4 of 10 boxes go now: 4/10 of 20 units
    assert_eq!(stock(&db, "tile").await, 92_000);

    let lines = db.sales().get_lines(&receipt.sale_id).await.unwrap();
    assert_eq!(lines[0].base_quantity.milli(), 20_000);
    assert_eq!(lines[0].quantity_fulfilled.milli(), 4_000);
    assert_eq!(lines[0].quantity_pending.milli(), 6_000);

    let dispatches = db.sales().get_dispatches(&receipt.sale_id).await.unwrap();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0].dispatch_number, 1);
    assert_eq!(dispatches[0].lines.len(), 1);
    assert_eq!(dispatches[0].lines[0].sale_line_id, lines[0].id);
    assert_eq!(dispatches[0].lines[0].quantity_dispatched.milli(), 4_000);
    assert_eq!(dispatches[0].lines[0].quantity_pending.milli(), 6_000);
    assert_eq!(dispatches[0].lines[0].base_quantity_dispatched.milli(), 8_000);

    let register = db.registers().find_open(TENANT, CASHIER).await.unwrap().unwrap();
    assert_eq!(register.total_transfer.cents(), 11800);
    assert_eq!(register.total_cash, Money::zero());
}

#[tokio::test]
async fn test_partial_sale_with_nothing_delivered_now() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let mut request = cash_sale(
        vec![SaleLineRequest::new("tile", Quantity::from_units(3)).fulfill_now(Quantity::zero())],
        10_000,
    );
    request.fulfillment_type = FulfillmentType::Partial;

    let receipt = checkout.create_sale(&ctx(), &request).await.unwrap();

    assert_eq!(stock(&db, "tile").await, 100_000);
    assert!(db.sales().get_movements(&receipt.sale_id).await.unwrap().is_empty());
    assert!(db.sales().get_dispatches(&receipt.sale_id).await.unwrap().is_empty());

    let lines = db.sales().get_lines(&receipt.sale_id).await.unwrap();
    assert_eq!(lines[0].quantity_pending.milli(), 3_000);
}

#[tokio::test]
async fn test_unit_without_a_path_sells_unconverted() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let request = cash_sale(
        vec![SaleLineRequest::new("cement", Quantity::from_units(2)).in_unit("m")],
        30_000,
    );
    let receipt = checkout.create_sale(&ctx(), &request).await.unwrap();

    assert_eq!(
        receipt.warnings,
        vec![PricingWarning::ConversionUnavailable {
            product_id: "cement".to_string(),
            unit_from: "m".to_string(),
            unit_to: "kg".to_string(),
        }]
    );
    // Priced and stocked as if 2 m were 2 kg
    assert_eq!(receipt.totals.subtotal.cents(), 20000);
    assert_eq!(stock(&db, "cement").await, 48_000);
}

#[tokio::test]
async fn test_graph_change_applies_to_the_next_sale() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    checkout.create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 30000)).await.unwrap();

    db.units().upsert_edge(TENANT, "kg", "lb", 2.0).await.unwrap();

    let receipt = checkout.create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 30000)).await.unwrap();
    assert_eq!(receipt.totals.subtotal.cents(), 25000);
    assert_eq!(stock(&db, "cement").await, 50_000 - 2_268 - 2_500);
}

// =============================================================================
// Rejected Sales
// =============================================================================

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    let request = cash_sale(
        vec![SaleLineRequest::new("cement", Quantity::from_units(60)).in_unit("kg")],
        10_000_000,
    );
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    match err {
        CheckoutError::Core(CoreError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        }) => {
            assert_eq!(product_id, "cement");
            assert_eq!(available.milli(), 50_000);
            assert_eq!(requested.milli(), 60_000);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_untouched(&db).await;

    // Two lines that fit alone but not together
    let request = cash_sale(
        vec![
            SaleLineRequest::new("cement", Quantity::from_units(30)).in_unit("kg"),
            SaleLineRequest::new("cement", Quantity::from_units(30)).in_unit("kg"),
        ],
        10_000_000,
    );
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::InsufficientStock { .. })));
    assert_untouched(&db).await;
}

#[tokio::test]
async fn test_failure_after_partial_writes_rolls_back() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    sqlx::query(
        r#"
        CREATE TRIGGER fail_second_line BEFORE INSERT ON sale_lines
        WHEN NEW.line_number = 2
        BEGIN
            SELECT RAISE(ABORT, 'simulated line failure');
        END
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let request = cash_sale(
        vec![
            SaleLineRequest::new("cement", Quantity::from_units(1)).in_unit("kg"),
            SaleLineRequest::new("tile", Quantity::from_units(2)),
            SaleLineRequest::new("rope", Quantity::from_units(3)),
        ],
        100_000,
    );
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Db(_)));
    assert!(err.is_unexpected());

    // Line 1 and its stock movement were written before the failure
    assert_untouched(&db).await;

    sqlx::query("DROP TRIGGER fail_second_line").execute(db.pool()).await.unwrap();

    // Numbers consumed by the failed attempt are reissued
    let receipt = checkout.create_sale(&ctx(), &request).await.unwrap();
    assert_eq!(receipt.fiscal_number, "B0200000001");
    assert_eq!(receipt.internal_number, "VT-00000001");
    assert_eq!(db.sales().get_lines(&receipt.sale_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_credit_denials() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());
    let small = || credit_sale("c-1", vec![SaleLineRequest::new("rope", Quantity::from_units(1))]);

    db.credits()
        .update_standing(TENANT, "c-1", CreditStatus::Active, CreditClassification::D)
        .await
        .unwrap();
    let err = checkout.create_sale(&ctx(), &small()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::CreditDenied(CreditDenial::ClassificationD))
    ));

    db.credits()
        .update_standing(TENANT, "c-1", CreditStatus::Blocked, CreditClassification::A)
        .await
        .unwrap();
    let err = checkout.create_sale(&ctx(), &small()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::CreditDenied(CreditDenial::CreditBlocked))
    ));

    db.credits()
        .update_standing(TENANT, "c-1", CreditStatus::Active, CreditClassification::A)
        .await
        .unwrap();
    let alert = db
        .credits()
        .add_alert(TENANT, "c-1", AlertSeverity::Critical, "Returned cheque")
        .await
        .unwrap();
    let err = checkout.create_sale(&ctx(), &small()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::CreditDenied(CreditDenial::CriticalCreditAlert { count: 1 }))
    ));

    assert_untouched(&db).await;

    db.credits().resolve_alert(TENANT, &alert).await.unwrap();
    checkout.create_sale(&ctx(), &small()).await.unwrap();
}

#[tokio::test]
async fn test_credit_without_an_account() {
    let db = store().await;
    db.clients()
        .insert(&Client {
            id: "c-2".to_string(),
            tenant_id: TENANT.to_string(),
            name: "Walk-in".to_string(),
            document_number: None,
            total_purchases: Money::zero(),
            purchase_count: 0,
            last_purchase_at: None,
            is_active: true,
        })
        .await
        .unwrap();

    let err = db
        .checkout(CheckoutSettings::default())
        .create_sale(&ctx(), &credit_sale("c-2", five_lb_of_cement()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::CreditDenied(CreditDenial::NoCreditAccount))
    ));
    assert_untouched(&db).await;
}

#[tokio::test]
async fn test_no_open_register() {
    let db = store().await;

    let err = db
        .checkout(CheckoutSettings::default())
        .create_sale(&SaleContext::new(TENANT, "u-2"), &cash_sale(five_lb_of_cement(), 30000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::NoOpenCashRegister { ref user_id }) if user_id == "u-2"
    ));
    assert_untouched(&db).await;
}

#[tokio::test]
async fn test_exhausted_sequence() {
    let db = store().await;
    add_fiscal(&db, "ncf-full", "B14", 5, 5).await;

    let mut request = cash_sale(five_lb_of_cement(), 30000);
    request.fiscal_document_type_id = "ncf-full".to_string();

    let err = db
        .checkout(CheckoutSettings::default())
        .create_sale(&ctx(), &request)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Core(CoreError::ExhaustedSequence { sequence_end: 5, .. })
    ));
    assert_eq!(fiscal_sequence(&db, "ncf-full").await, 5);
    assert_untouched(&db).await;
}

#[tokio::test]
async fn test_pre_transaction_rejections() {
    let db = store().await;
    let checkout = db.checkout(CheckoutSettings::default());

    // Cash does not cover the total
    let err = checkout
        .create_sale(&ctx(), &cash_sale(five_lb_of_cement(), 100))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::InsufficientCash { .. })));

    // Unknown client
    let mut request = cash_sale(five_lb_of_cement(), 30000);
    request.client_id = Some("nobody".to_string());
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::ClientNotFound(_))));

    // Unknown product
    let request = cash_sale(vec![SaleLineRequest::new("ghost", Quantity::from_units(1))], 30000);
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::ProductNotFound(_))));

    // Fractional tiles
    let request = cash_sale(vec![SaleLineRequest::new("tile", Quantity::from_milli(1_500))], 30000);
    let err = checkout.create_sale(&ctx(), &request).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));
    assert!(!err.is_unexpected());

    // Missing tenant
    let err = checkout
        .create_sale(&SaleContext::new("", CASHIER), &cash_sale(five_lb_of_cement(), 30000))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::Validation(_))));

    assert_untouched(&db).await;
}

#[tokio::test]
async fn test_tenants_do_not_share_products() {
    let db = store().await;

    let err = db
        .checkout(CheckoutSettings::default())
        .create_sale(&SaleContext::new("t2", CASHIER), &cash_sale(five_lb_of_cement(), 30000))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Core(CoreError::ProductNotFound(_))));
    assert_eq!(db.sales().count("t2").await.unwrap(), 0);
}
