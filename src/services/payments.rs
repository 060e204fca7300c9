use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::payment::{
        self, ActiveModel as PaymentActiveModel, Entity as PaymentEntity, Model as PaymentModel,
        PaymentMethod,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    money::Currency,
    services::orders::load_owned_order,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    /// Whole units of the order's currency. Must be positive.
    pub amount: i64,
    /// One of `cash`, `mobile_money`, `card`.
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub method: String,
    /// Currency the payment was taken in. Must match the order's.
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
    pub reference: Option<String>,
}

/// Payments of an order, newest first, for internal composition.
pub(crate) async fn fetch_payments(
    db: &DbPool,
    order_id: Uuid,
) -> Result<Vec<PaymentModel>, ServiceError> {
    Ok(PaymentEntity::find()
        .filter(payment::Column::OrderId.eq(order_id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await?)
}

/// Append-only payment ledger.
///
/// There is deliberately no update or delete operation here: a correction is
/// a new ledger entry, and the totals aggregator sums entries as signed
/// contributions.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Records a payment against an order.
    #[instrument(skip(self, request), fields(order_id = %order_id, amount = request.amount))]
    pub async fn record_payment(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<PaymentModel, ServiceError> {
        request.validate()?;

        let order = load_owned_order(&self.db, caller, order_id).await?;

        if request.amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Payment amount must be a positive whole number of currency units".to_string(),
            ));
        }

        let method: PaymentMethod = request.method.parse().map_err(|_| {
            ServiceError::ValidationError(format!("Unknown payment method: {}", request.method))
        })?;

        let payment_currency = Currency::new(&request.currency)?;
        let order_currency = Currency::new(&order.currency)?;
        if payment_currency != order_currency {
            return Err(ServiceError::CurrencyMismatch(format!(
                "Payment taken in {} but order is denominated in {}",
                payment_currency, order_currency
            )));
        }

        let payment_id = Uuid::new_v4();
        let model = PaymentActiveModel {
            id: Set(payment_id),
            order_id: Set(order_id),
            amount: Set(request.amount),
            method: Set(method),
            reference: Set(request.reference),
            created_at: Set(Utc::now()),
        };

        let saved = model.insert(&*self.db).await?;
        info!(order_id = %order_id, payment_id = %payment_id, amount = request.amount, "Payment recorded");

        self.emit(Event::PaymentRecorded {
            order_id,
            payment_id,
        })
        .await;

        Ok(saved)
    }

    /// Lists an order's payments, newest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_payments(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<Vec<PaymentModel>, ServiceError> {
        load_owned_order(&self.db, caller, order_id).await?;
        fetch_payments(&self.db, order_id).await
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send payment event");
            }
        }
    }
}
