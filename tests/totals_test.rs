//! Totals aggregation against the real ledgers: always derived, never
//! clamped, currency-disciplined.

mod common;

use assert_matches::assert_matches;
use atelier_api::entities::order::{ActiveModel as OrderActiveModel, Entity as OrderEntity};
use atelier_api::errors::ServiceError;
use atelier_api::services::orders::AddItemRequest;
use atelier_api::services::payments::RecordPaymentRequest;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

fn add(description: &str, quantity: i32, unit_price: Decimal) -> AddItemRequest {
    AddItemRequest {
        description: description.to_string(),
        quantity,
        unit_price,
        currency: "USD".to_string(),
    }
}

fn pay(amount: i64) -> RecordPaymentRequest {
    RecordPaymentRequest {
        amount,
        method: "cash".to_string(),
        currency: "USD".to_string(),
        reference: None,
    }
}

#[tokio::test]
async fn subtotal_matches_the_item_ledger() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .orders
        .add_item(&app.owner, order.id, add("Suit", 2, dec!(150.00)))
        .await
        .expect("add suit");
    services
        .orders
        .add_item(&app.owner, order.id, add("Alterations", 1, dec!(25.50)))
        .await
        .expect("add alterations");

    let totals = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("compute totals");

    assert_eq!(totals.subtotal, dec!(325.50));
    assert_eq!(totals.computed_total, dec!(325.50));
    assert_eq!(totals.paid_total, Decimal::ZERO);
    assert_eq!(totals.balance, dec!(325.50));
}

#[tokio::test]
async fn adjustments_and_payments_reconcile() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .orders
        .add_item(&app.owner, order.id, add("Suit", 2, dec!(150.00)))
        .await
        .expect("add suit");
    services
        .orders
        .add_item(&app.owner, order.id, add("Alterations", 1, dec!(25.50)))
        .await
        .expect("add alterations");

    // Grant a 20.00 discount on the order record.
    let mut active: OrderActiveModel = OrderEntity::find_by_id(order.id)
        .one(&*app.state.db)
        .await
        .expect("fetch order")
        .expect("order exists")
        .into();
    active.discount_total = Set(dec!(20.00));
    active.update(&*app.state.db).await.expect("apply discount");

    services
        .payments
        .record_payment(&app.owner, order.id, pay(200))
        .await
        .expect("record payment");

    let totals = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("compute totals");

    assert_eq!(totals.subtotal, dec!(325.50));
    assert_eq!(totals.discount_total, dec!(20.00));
    assert_eq!(totals.computed_total, dec!(305.50));
    assert_eq!(totals.paid_total, dec!(200));
    assert_eq!(totals.balance, dec!(105.50));
}

#[tokio::test]
async fn overpayment_shows_as_negative_balance() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .orders
        .add_item(&app.owner, order.id, add("Shirt", 1, dec!(40.00)))
        .await
        .expect("add shirt");
    services
        .payments
        .record_payment(&app.owner, order.id, pay(100))
        .await
        .expect("overpay");

    let totals = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("compute totals");

    assert_eq!(totals.balance, dec!(-60.00));
    // The floor exists only at display time.
    assert_eq!(totals.display_total(), dec!(40.00));
}

#[tokio::test]
async fn totals_are_recomputed_on_every_read() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .orders
        .add_item(&app.owner, order.id, add("Dress", 1, dec!(120.00)))
        .await
        .expect("add dress");

    let before = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("first read");
    assert_eq!(before.balance, dec!(120.00));

    services
        .payments
        .record_payment(&app.owner, order.id, pay(50))
        .await
        .expect("pay 50");

    let after = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("second read");
    assert_eq!(after.paid_total, dec!(50));
    assert_eq!(after.balance, dec!(70.00));
}

#[tokio::test]
async fn item_currency_mismatch_is_rejected_without_mutating_state() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let mut request = add("Imported fabric", 1, dec!(30.00));
    request.currency = "EUR".to_string();

    let err = services
        .orders
        .add_item(&app.owner, order.id, request)
        .await
        .expect_err("mismatched item must fail");
    assert_matches!(err, ServiceError::CurrencyMismatch(_));

    let items = services
        .orders
        .list_items(&app.owner, order.id)
        .await
        .expect("list items");
    assert!(items.is_empty());
}

#[tokio::test]
async fn payment_currency_mismatch_is_rejected_without_mutating_state() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let mut request = pay(100);
    request.currency = "KES".to_string();

    let err = services
        .payments
        .record_payment(&app.owner, order.id, request)
        .await
        .expect_err("mismatched payment must fail");
    assert_matches!(err, ServiceError::CurrencyMismatch(_));

    let payments = services
        .payments
        .list_payments(&app.owner, order.id)
        .await
        .expect("list payments");
    assert!(payments.is_empty());
}
