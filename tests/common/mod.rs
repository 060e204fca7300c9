//! Shared integration-test harness.
//!
//! Spins up the real service stack against an in-memory SQLite database with
//! the real migrations applied. One connection only: each `sqlite::memory:`
//! connection is its own database, so the pool must not fan out.

use std::sync::Arc;

use atelier_api::{
    auth::AuthUser,
    config::AppConfig,
    entities::customer::Model as CustomerModel,
    entities::order::Model as OrderModel,
    events::EventSender,
    handlers::AppServices,
    services::customers::CreateCustomerRequest,
    services::orders::CreateOrderRequest,
    AppState,
};
use sea_orm::{ConnectOptions, Database};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "integration-test-secret-integration-test-secret-integration-test!!";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration: 3600,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        request_timeout_secs: 30,
        storage_public_base_url: "http://cdn.test/attachments".to_string(),
        storage_signing_secret: "test-storage-signing-secret-32ch".to_string(),
        attachment_url_ttl_secs: 3600,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub owner: AuthUser,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options).await.expect("connect sqlite");
        atelier_api::db::run_migrations(&db)
            .await
            .expect("run migrations");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(atelier_api::events::process_events(event_rx));

        let config = test_config();
        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()), &config);

        let state = AppState {
            db,
            config,
            event_sender,
            services,
        };

        Self {
            state,
            owner: AuthUser {
                account_id: Uuid::new_v4(),
            },
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// A second, unrelated account.
    pub fn stranger(&self) -> AuthUser {
        AuthUser {
            account_id: Uuid::new_v4(),
        }
    }

    pub async fn seed_customer(&self, caller: &AuthUser) -> CustomerModel {
        self.services()
            .customers
            .create_customer(
                caller,
                CreateCustomerRequest {
                    name: "Amina Diallo".to_string(),
                    phone: Some("+221770000000".to_string()),
                    email: Some("amina@example.com".to_string()),
                    city: Some("Dakar".to_string()),
                    country_code: Some("SN".to_string()),
                },
            )
            .await
            .expect("seed customer")
    }

    pub async fn seed_order(&self, caller: &AuthUser, currency: &str) -> OrderModel {
        let customer = self.seed_customer(caller).await;
        self.services()
            .orders
            .create_order(
                caller,
                CreateOrderRequest {
                    customer_id: customer.id,
                    currency: currency.to_string(),
                    order_number: None,
                    notes: Some("fitting on thursday".to_string()),
                },
            )
            .await
            .expect("seed order")
    }
}
