//! The public tracking boundary: idempotent token mint, allow-listed view,
//! enumeration-resistant misses.

mod common;

use assert_matches::assert_matches;
use atelier_api::errors::ServiceError;
use atelier_api::services::orders::AddItemRequest;
use atelier_api::services::payments::RecordPaymentRequest;
use common::TestApp;
use rust_decimal_macros::dec;

#[tokio::test]
async fn issuing_twice_returns_the_same_token() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let first = services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("first mint");
    let second = services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("second call");

    assert_eq!(first, second);
    assert_eq!(first.len(), 32);
}

#[tokio::test]
async fn resolve_round_trips_the_order_view() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .orders
        .add_item(
            &app.owner,
            order.id,
            AddItemRequest {
                description: "Suit".to_string(),
                quantity: 2,
                unit_price: dec!(150.00),
                currency: "USD".to_string(),
            },
        )
        .await
        .expect("add item");
    services
        .payments
        .record_payment(
            &app.owner,
            order.id,
            RecordPaymentRequest {
                amount: 100,
                method: "mobile_money".to_string(),
                currency: "USD".to_string(),
                reference: Some("mm-tx-991".to_string()),
            },
        )
        .await
        .expect("record payment");

    let token = services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("mint token");

    let view = services.tracking.resolve(&token).await.expect("resolve");
    let expected = services
        .totals
        .compute_totals(&app.owner, order.id)
        .await
        .expect("compute totals");

    assert_eq!(view.currency, "USD");
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].line_total, dec!(300.00));
    assert_eq!(view.totals.subtotal, expected.subtotal);
    assert_eq!(view.totals.paid_total, expected.paid_total);
    assert_eq!(view.totals.balance, expected.balance);
    assert_eq!(view.payments.len(), 1);
    assert_eq!(view.payments[0].amount, 100);
}

#[tokio::test]
async fn the_public_view_never_leaks_internal_fields() {
    let app = TestApp::new().await;
    // Seeded orders carry internal notes.
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .attachments
        .register_attachment(
            &app.owner,
            order.id,
            atelier_api::services::attachments::RegisterAttachmentRequest {
                object_key: format!("orders/{}/sketch.png", order.id),
                kind: "image/png".to_string(),
            },
        )
        .await
        .expect("register attachment");

    let token = services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("mint token");
    let view = services.tracking.resolve(&token).await.expect("resolve");

    let json = serde_json::to_value(&view).expect("serialize view");
    let rendered = json.to_string();

    // Allow-listed surface only: no notes, no payment references, no raw
    // object keys, no customer identity.
    assert!(!rendered.contains("fitting on thursday"));
    assert!(!rendered.contains("notes"));
    assert!(!rendered.contains("reference"));
    assert!(!rendered.contains("object_key"));
    assert!(!rendered.contains("customer"));
    assert!(!rendered.contains("owner"));

    // Attachments come back as signed links, not paths.
    assert_eq!(view.attachments.len(), 1);
    let url = view.attachments[0].url.as_deref().expect("signed url");
    assert!(url.contains("expires="));
    assert!(url.contains("signature="));
}

#[tokio::test]
async fn misses_are_indistinguishable() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("mint token");

    // Unknown-but-well-formed, and malformed, collapse to the same kind with
    // the same body.
    let unknown = services
        .tracking
        .resolve("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
        .await
        .expect_err("unknown token");
    let malformed = services
        .tracking
        .resolve("../../etc/passwd")
        .await
        .expect_err("malformed token");
    let empty = services.tracking.resolve("").await.expect_err("empty token");

    for err in [&unknown, &malformed, &empty] {
        assert_matches!(err, ServiceError::NotFound(_));
    }
    assert_eq!(unknown.response_message(), malformed.response_message());
    assert_eq!(unknown.response_message(), empty.response_message());
}

#[tokio::test]
async fn strangers_cannot_mint_a_token() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let stranger = app.stranger();

    let err = app
        .services()
        .tracking
        .issue_or_retrieve_token(&stranger, order.id)
        .await
        .expect_err("stranger mint must fail");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn token_resolution_reflects_later_mutations() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let token = services
        .tracking
        .issue_or_retrieve_token(&app.owner, order.id)
        .await
        .expect("mint token");

    let before = services.tracking.resolve(&token).await.expect("resolve");
    assert!(before.items.is_empty());

    services
        .orders
        .add_item(
            &app.owner,
            order.id,
            AddItemRequest {
                description: "Kaftan".to_string(),
                quantity: 1,
                unit_price: dec!(75.00),
                currency: "USD".to_string(),
            },
        )
        .await
        .expect("add item");

    let after = services.tracking.resolve(&token).await.expect("resolve again");
    assert_eq!(after.items.len(), 1);
    assert_eq!(after.totals.subtotal, dec!(75.00));
}
