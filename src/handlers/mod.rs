pub mod attachments;
pub mod customers;
pub mod health;
pub mod orders;
pub mod payments;
pub mod tracking;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use http::HeaderValue;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::storage::{HmacObjectStore, ObjectStore};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<crate::services::customers::CustomerService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub order_status: Arc<crate::services::order_status::OrderStatusService>,
    pub payments: Arc<crate::services::payments::PaymentService>,
    pub totals: Arc<crate::services::totals::TotalsService>,
    pub attachments: Arc<crate::services::attachments::AttachmentService>,
    pub tracking: Arc<crate::services::tracking::TrackingService>,
}

impl AppServices {
    /// Builds the service container with the HMAC-signing object store.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let object_store: Arc<dyn ObjectStore> = Arc::new(HmacObjectStore::new(
            config.storage_public_base_url.clone(),
            config.storage_signing_secret.clone(),
        ));
        Self::with_object_store(db_pool, event_sender, config, object_store)
    }

    /// Builds the service container against an explicit object store.
    /// Tests use this to substitute a stub signer.
    pub fn with_object_store(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        let customers = Arc::new(crate::services::customers::CustomerService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let order_status = Arc::new(crate::services::order_status::OrderStatusService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let payments = Arc::new(crate::services::payments::PaymentService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let totals = Arc::new(crate::services::totals::TotalsService::new(db_pool.clone()));
        let attachments = Arc::new(crate::services::attachments::AttachmentService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
            object_store,
            config.attachment_url_ttl_secs,
        ));
        let tracking = Arc::new(crate::services::tracking::TrackingService::new(
            db_pool,
            Some(event_sender),
            attachments.clone(),
        ));

        Self {
            customers,
            orders,
            order_status,
            payments,
            totals,
            attachments,
            tracking,
        }
    }
}

/// Assembles the HTTP surface.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/customers",
            post(customers::create_customer).get(customers::list_customers),
        )
        .route(
            "/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/notes", put(orders::update_notes))
        .route("/orders/:id/status", put(orders::set_status))
        .route("/orders/:id/ready-at", put(orders::set_ready_at))
        .route(
            "/orders/:id/items",
            post(orders::add_item).get(orders::list_items),
        )
        .route("/orders/:id/items/:item_id", axum::routing::delete(orders::remove_item))
        .route(
            "/orders/:id/payments",
            post(payments::record_payment).get(payments::list_payments),
        )
        .route("/orders/:id/totals", get(orders::get_totals))
        .route(
            "/orders/:id/tracking-token",
            post(tracking::issue_or_retrieve_token),
        )
        .route(
            "/orders/:id/attachments",
            post(attachments::register_attachment).get(attachments::list_attachments),
        )
        .route(
            "/orders/:id/attachments/:attachment_id",
            axum::routing::delete(attachments::delete_attachment),
        );

    Router::new()
        .route("/health", get(health::check))
        .route("/track/:token", get(tracking::resolve))
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn(crate::request_id::propagate))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&state.config))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )))
        .with_state(state)
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    if config.cors_allow_any_origin {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
