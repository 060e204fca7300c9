//! End-to-end tests for the order status pipeline and the immutability rules
//! that hang off it.

mod common;

use assert_matches::assert_matches;
use atelier_api::entities::order::OrderStatus;
use atelier_api::errors::ServiceError;
use atelier_api::services::orders::AddItemRequest;
use common::TestApp;
use rust_decimal_macros::dec;

fn item(description: &str) -> AddItemRequest {
    AddItemRequest {
        description: description.to_string(),
        quantity: 1,
        unit_price: dec!(50.00),
        currency: "USD".to_string(),
    }
}

#[tokio::test]
async fn order_walks_the_full_forward_path() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    assert_eq!(order.status, OrderStatus::Pending);

    let services = app.services();
    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Active,
        OrderStatus::InProduction,
        OrderStatus::Ready,
        OrderStatus::Delivered,
    ] {
        let updated = services
            .order_status
            .set_status(&app.owner, order.id, next)
            .await
            .expect("legal transition");
        assert_eq!(updated.status, next);
    }
}

#[tokio::test]
async fn illegal_transition_fails_and_leaves_status_unchanged() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::Active,
        OrderStatus::InProduction,
        OrderStatus::Ready,
    ] {
        services
            .order_status
            .set_status(&app.owner, order.id, next)
            .await
            .expect("legal transition");
    }

    // ready -> pending is not in the table
    let err = services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Pending)
        .await
        .expect_err("backward transition must fail");
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let reloaded = services
        .orders
        .get_order(&app.owner, order.id)
        .await
        .expect("reload");
    assert_eq!(reloaded.status, OrderStatus::Ready);
}

#[tokio::test]
async fn skipping_a_stage_is_rejected() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;

    let err = app
        .services()
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Ready)
        .await
        .expect_err("pending -> ready skips stages");
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn cancellation_is_reachable_from_any_live_state_and_is_final() {
    let app = TestApp::new().await;
    let services = app.services();

    // From pending
    let order = app.seed_order(&app.owner, "USD").await;
    let cancelled = services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel from pending");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    // No resurrection
    let err = services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Confirmed)
        .await
        .expect_err("cancelled is terminal");
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // From a mid-pipeline state
    let order = app.seed_order(&app.owner, "USD").await;
    services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Confirmed)
        .await
        .expect("confirm");
    services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Active)
        .await
        .expect("activate");
    let cancelled = services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel from active");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn items_are_frozen_once_the_order_is_terminal() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let kept = services
        .orders
        .add_item(&app.owner, order.id, item("Jacket"))
        .await
        .expect("add item while live");

    services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");

    let err = services
        .orders
        .add_item(&app.owner, order.id, item("Trousers"))
        .await
        .expect_err("items frozen after cancel");
    assert_matches!(err, ServiceError::InvalidState(_));

    let err = services
        .orders
        .remove_item(&app.owner, order.id, kept.id)
        .await
        .expect_err("removal frozen after cancel");
    assert_matches!(err, ServiceError::InvalidState(_));

    // The historical billing record is intact.
    let items = services
        .orders
        .list_items(&app.owner, order.id)
        .await
        .expect("list items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "Jacket");
}

#[tokio::test]
async fn ready_at_is_free_until_terminal() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let when = chrono::Utc::now() + chrono::Duration::days(7);
    let updated = services
        .order_status
        .set_ready_at(&app.owner, order.id, Some(when))
        .await
        .expect("set ready date while pending");
    assert!(updated.ready_at.is_some());

    // Revisable, and clearable
    let updated = services
        .order_status
        .set_ready_at(&app.owner, order.id, None)
        .await
        .expect("clear ready date");
    assert!(updated.ready_at.is_none());

    services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");

    let err = services
        .order_status
        .set_ready_at(&app.owner, order.id, Some(when))
        .await
        .expect_err("terminal orders take no ready date");
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn strangers_cannot_see_or_mutate_an_order() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let stranger = app.stranger();
    let services = app.services();

    let err = services
        .orders
        .get_order(&stranger, order.id)
        .await
        .expect_err("stranger read must fail");
    // Indistinguishable from a missing order: no existence oracle.
    assert_matches!(err, ServiceError::NotFound(_));

    let err = services
        .order_status
        .set_status(&stranger, order.id, OrderStatus::Confirmed)
        .await
        .expect_err("stranger mutation must fail");
    assert_matches!(err, ServiceError::NotFound(_));

    let reloaded = services
        .orders
        .get_order(&app.owner, order.id)
        .await
        .expect("owner still sees the order");
    assert_eq!(reloaded.status, OrderStatus::Pending);
}

#[tokio::test]
async fn notes_are_editable_only_while_live() {
    let app = TestApp::new().await;
    let order = app.seed_order(&app.owner, "USD").await;
    let services = app.services();

    let updated = services
        .orders
        .update_notes(&app.owner, order.id, Some("lining fabric arrived".to_string()))
        .await
        .expect("edit notes while live");
    assert_eq!(updated.notes.as_deref(), Some("lining fabric arrived"));

    services
        .order_status
        .set_status(&app.owner, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel");

    let err = services
        .orders
        .update_notes(&app.owner, order.id, None)
        .await
        .expect_err("notes frozen after terminal");
    assert_matches!(err, ServiceError::InvalidState(_));
}
