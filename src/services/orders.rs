use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    entities::order::{
        self, ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel,
        OrderStatus,
    },
    entities::order_item::{
        self, ActiveModel as OrderItemActiveModel, Entity as OrderItemEntity,
        Model as OrderItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    money::Currency,
    services::customers::load_owned_customer,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Request/Response types for the order service
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
    #[validate(length(max = 50, message = "Order number must be at most 50 characters"))]
    pub order_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddItemRequest {
    #[validate(length(max = 200, message = "Description must be at most 200 characters"))]
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Currency the unit price is denominated in. Must match the order's.
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,
}

/// Loads an order, requiring the caller to own it through its customer.
///
/// An order owned by another account takes the same not-found path as a
/// missing one, so callers cannot probe which ids exist.
pub(crate) async fn load_owned_order(
    db: &DbPool,
    caller: &AuthUser,
    order_id: Uuid,
) -> Result<OrderModel, ServiceError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    let customer = CustomerEntity::find_by_id(order.customer_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    if customer.owner_id != caller.account_id {
        warn!(order_id = %order_id, caller = %caller.account_id, "Ownership check failed for order");
        return Err(ServiceError::NotFound(format!(
            "Order {} not found",
            order_id
        )));
    }

    Ok(order)
}

/// Items of an order in insertion order, for internal composition.
pub(crate) async fn fetch_items(
    db: &DbPool,
    order_id: Uuid,
) -> Result<Vec<OrderItemModel>, ServiceError> {
    Ok(OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?)
}

fn default_order_number(order_id: Uuid) -> String {
    let mut tail: String = order_id.simple().to_string();
    tail.truncate(8);
    format!("ORD-{}", tail.to_ascii_uppercase())
}

/// Service for managing orders and their item ledger
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    /// Creates a new order service instance
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new order for one of the caller's customers.
    ///
    /// The currency is fixed here and immutable for the order's lifetime.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        caller: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        let currency = Currency::new(&request.currency)?;

        load_owned_customer(&self.db, caller, request.customer_id).await?;

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order_number = request
            .order_number
            .unwrap_or_else(|| default_order_number(order_id));

        let model = OrderActiveModel {
            id: Set(order_id),
            customer_id: Set(request.customer_id),
            order_number: Set(Some(order_number)),
            currency: Set(currency.as_str().to_string()),
            status: Set(OrderStatus::Pending),
            tax_total: Set(Decimal::ZERO),
            discount_total: Set(Decimal::ZERO),
            shipping_total: Set(Decimal::ZERO),
            notes: Set(request.notes),
            ready_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let order = model.insert(&*self.db).await?;
        info!(order_id = %order_id, customer_id = %request.customer_id, "Order created");

        self.emit(Event::OrderCreated(order_id)).await;
        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        load_owned_order(&self.db, caller, order_id).await
    }

    /// Lists the caller's orders across all their customers, newest first.
    #[instrument(skip(self), fields(owner_id = %caller.account_id))]
    pub async fn list_orders(
        &self,
        caller: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = OrderEntity::find()
            .join(JoinType::InnerJoin, order::Relation::Customer.def())
            .filter(customer::Column::OwnerId.eq(caller.account_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page).await?;

        Ok((orders, total))
    }

    /// Updates the internal notes on a live order.
    #[instrument(skip(self, notes), fields(order_id = %order_id))]
    pub async fn update_notes(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        notes: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot edit a {} order",
                order.status
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.notes = Set(notes);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        self.emit(Event::OrderNotesUpdated(order_id)).await;
        Ok(updated)
    }

    /// Adds a line item to an order.
    ///
    /// Rejected once the order is terminal: the item ledger of a delivered or
    /// cancelled order is historical billing record.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn add_item(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        request: AddItemRequest,
    ) -> Result<OrderItemModel, ServiceError> {
        request.validate()?;

        let order = load_owned_order(&self.db, caller, order_id).await?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot modify items on a {} order",
                order.status
            )));
        }

        if request.description.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Item description is required".to_string(),
            ));
        }
        if request.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be a positive integer".to_string(),
            ));
        }
        if request.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price cannot be negative".to_string(),
            ));
        }

        let item_currency = Currency::new(&request.currency)?;
        let order_currency = Currency::new(&order.currency)?;
        if item_currency != order_currency {
            return Err(ServiceError::CurrencyMismatch(format!(
                "Item priced in {} but order is denominated in {}",
                item_currency, order_currency
            )));
        }

        let item_id = Uuid::new_v4();
        let model = OrderItemActiveModel {
            id: Set(item_id),
            order_id: Set(order_id),
            description: Set(request.description.trim().to_string()),
            quantity: Set(request.quantity),
            unit_price: Set(request.unit_price),
            created_at: Set(Utc::now()),
        };

        let item = model.insert(&*self.db).await?;
        info!(order_id = %order_id, item_id = %item_id, "Order item added");

        self.emit(Event::OrderItemAdded { order_id, item_id }).await;
        Ok(item)
    }

    /// Removes a line item from a live order.
    #[instrument(skip(self), fields(order_id = %order_id, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        item_id: Uuid,
    ) -> Result<(), ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;

        if order.status.is_terminal() {
            return Err(ServiceError::InvalidState(format!(
                "Cannot modify items on a {} order",
                order.status
            )));
        }

        let item = OrderItemEntity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .filter(|item| item.order_id == order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order item {} not found", item_id)))?;

        item.delete(&*self.db).await?;
        info!(order_id = %order_id, item_id = %item_id, "Order item removed");

        self.emit(Event::OrderItemRemoved { order_id, item_id }).await;
        Ok(())
    }

    /// Lists an order's items in insertion order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_items(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemModel>, ServiceError> {
        load_owned_order(&self.db, caller, order_id).await?;
        fetch_items(&self.db, order_id).await
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send order event");
            }
        }
    }
}
