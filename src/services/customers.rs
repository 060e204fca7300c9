use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::customer::{
        self, ActiveModel as CustomerActiveModel, Entity as CustomerEntity, Model as CustomerModel,
    },
    entities::order,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub city: Option<String>,
    #[validate(length(min = 2, max = 2, message = "Country code must be 2 characters"))]
    pub country_code: Option<String>,
}

/// Fields left as `None` are unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub city: Option<String>,
    #[validate(length(min = 2, max = 2, message = "Country code must be 2 characters"))]
    pub country_code: Option<String>,
}

/// Loads a customer record, requiring the caller to own it.
///
/// An existing record owned by someone else takes the same not-found path as
/// a missing one, so callers cannot probe which ids exist.
pub(crate) async fn load_owned_customer(
    db: &DbPool,
    caller: &AuthUser,
    customer_id: Uuid,
) -> Result<CustomerModel, ServiceError> {
    let customer = CustomerEntity::find_by_id(customer_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

    if customer.owner_id != caller.account_id {
        warn!(customer_id = %customer_id, caller = %caller.account_id, "Ownership check failed for customer");
        return Err(ServiceError::NotFound(format!(
            "Customer {} not found",
            customer_id
        )));
    }

    Ok(customer)
}

/// Service for managing customer records
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, request), fields(owner_id = %caller.account_id))]
    pub async fn create_customer(
        &self,
        caller: &AuthUser,
        request: CreateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request.validate()?;

        let customer_id = Uuid::new_v4();
        let now = Utc::now();

        let model = CustomerActiveModel {
            id: Set(customer_id),
            owner_id: Set(caller.account_id),
            name: Set(request.name),
            phone: Set(request.phone),
            email: Set(request.email),
            city: Set(request.city),
            country_code: Set(request.country_code),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let customer = model.insert(&*self.db).await?;
        info!(customer_id = %customer_id, "Customer created");

        self.emit(Event::CustomerCreated(customer_id)).await;
        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(
        &self,
        caller: &AuthUser,
        customer_id: Uuid,
    ) -> Result<CustomerModel, ServiceError> {
        load_owned_customer(&self.db, caller, customer_id).await
    }

    /// Lists the caller's customers, most recently created first.
    #[instrument(skip(self), fields(owner_id = %caller.account_id))]
    pub async fn list_customers(
        &self,
        caller: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<CustomerModel>, u64), ServiceError> {
        let paginator = CustomerEntity::find()
            .filter(customer::Column::OwnerId.eq(caller.account_id))
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db, limit);

        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page).await?;

        Ok((customers, total))
    }

    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        caller: &AuthUser,
        customer_id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<CustomerModel, ServiceError> {
        request.validate()?;

        let customer = load_owned_customer(&self.db, caller, customer_id).await?;
        let mut active: CustomerActiveModel = customer.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(email) = request.email {
            active.email = Set(Some(email));
        }
        if let Some(city) = request.city {
            active.city = Set(Some(city));
        }
        if let Some(country_code) = request.country_code {
            active.country_code = Set(Some(country_code));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(customer_id = %customer_id, "Customer updated");

        self.emit(Event::CustomerUpdated(customer_id)).await;
        Ok(updated)
    }

    /// Deletes a customer record.
    ///
    /// Refused while orders still reference the customer; order history is
    /// billing history and must not disappear out from under it.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(
        &self,
        caller: &AuthUser,
        customer_id: Uuid,
    ) -> Result<(), ServiceError> {
        let customer = load_owned_customer(&self.db, caller, customer_id).await?;

        let order_count = order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .count(&*self.db)
            .await?;
        if order_count > 0 {
            return Err(ServiceError::Conflict(format!(
                "Customer has {} orders and cannot be deleted",
                order_count
            )));
        }

        customer.delete(&*self.db).await?;
        info!(customer_id = %customer_id, "Customer deleted");

        self.emit(Event::CustomerDeleted(customer_id)).await;
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send customer event");
            }
        }
    }
}
