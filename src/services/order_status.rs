use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::order::{ActiveModel as OrderActiveModel, Model as OrderModel, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::load_owned_order,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Service driving an order through its production pipeline
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Moves an order to `new_status`.
    ///
    /// Fails without touching the order when the transition is not in the
    /// table (see [`OrderStatus::can_transition_to`]), including every
    /// transition out of a terminal status.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn set_status(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;
        let old_status = order.status;

        if !old_status.can_transition_to(new_status) {
            warn!(
                order_id = %order_id,
                old_status = %old_status,
                new_status = %new_status,
                "Illegal status transition rejected"
            );
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot transition from '{}' to '{}'",
                old_status, new_status
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );

        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
        })
        .await;

        Ok(updated)
    }

    /// Sets or clears the promised completion time.
    ///
    /// Independent of the status machine: operators may revise the pickup
    /// estimate at any stage before the order is terminal.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn set_ready_at(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        ready_at: Option<DateTime<Utc>>,
    ) -> Result<OrderModel, ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot set a ready date on a {} order",
                order.status
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.ready_at = Set(ready_at);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        self.emit(Event::OrderReadyAtUpdated(order_id)).await;
        Ok(updated)
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send order status event");
            }
        }
    }
}
