use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Enum representing the lifecycle status of an order.
///
/// The pipeline is forward-only (intake through pickup); `cancelled` is the
/// escape hatch from any live state and is never reversible.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "in_production")]
    InProduction,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Active)
            | (Self::Active, Self::InProduction)
            | (Self::InProduction, Self::Ready)
            | (Self::Ready, Self::Delivered) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_id: Uuid,

    /// Optional human-readable code shown on receipts and the tracking page.
    #[validate(length(max = 50, message = "Order number must be at most 50 characters"))]
    pub order_number: Option<String>,

    /// Fixed at creation. Every item and payment on the order uses it.
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,

    pub status: OrderStatus,

    /// Billing adjustments. Defaults are zero; totals are derived on read.
    pub tax_total: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,

    /// Internal notes. Never exposed through the public tracking view.
    pub notes: Option<String>,

    /// Promised completion time; freely revisable until the order is terminal.
    pub ready_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachments,
    #[sea_orm(has_one = "super::tracking_token::Entity")]
    TrackingToken,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl Related<super::tracking_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackingToken.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }

        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
