use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::payment::PaymentMethod,
    entities::tracking_token::{
        self, ActiveModel as TrackingTokenActiveModel, Entity as TrackingTokenEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::attachments::{fetch_attachments, AttachmentService},
    services::orders::{fetch_items, load_owned_order},
    services::payments::fetch_payments,
    services::totals::{totals_from_parts, Totals},
};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const TOKEN_LENGTH: usize = 32;

/// Read-only, field-limited snapshot of one order, safe for an
/// unauthenticated reader holding the tracking token.
///
/// Strict allow-list: internal notes, customer identity, payment references
/// and raw object keys never appear here.
#[derive(Debug, Serialize)]
pub struct PublicOrderView {
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub items: Vec<PublicOrderItem>,
    pub totals: Totals,
    pub payments: Vec<PublicPayment>,
    pub attachments: Vec<PublicAttachment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicOrderItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PublicPayment {
    pub amount: i64,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicAttachment {
    pub kind: String,
    /// Short-lived signed link; `null` when signing is unavailable.
    pub url: Option<String>,
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Every resolve miss collapses to this one error so a caller probing the
/// endpoint learns nothing from the response shape.
fn resolve_miss() -> ServiceError {
    ServiceError::NotFound("Tracking token does not resolve".to_string())
}

/// Public tracking boundary: mints the per-order token and serves the
/// anonymous read-only view behind it.
#[derive(Clone)]
pub struct TrackingService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    attachments: Arc<AttachmentService>,
}

impl TrackingService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        attachments: Arc<AttachmentService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            attachments,
        }
    }

    /// Returns the order's tracking token, minting it on first call.
    ///
    /// Idempotent: every later call returns the same token, so links already
    /// shared with a client stay valid for the order's lifetime. Two callers
    /// racing the first mint are serialized by the primary key on order_id;
    /// the loser re-reads and returns the winner's token.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn issue_or_retrieve_token(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<String, ServiceError> {
        let order = load_owned_order(&self.db, caller, order_id).await?;

        if let Some(existing) = TrackingTokenEntity::find_by_id(order.id)
            .one(&*self.db)
            .await?
        {
            return Ok(existing.token);
        }

        let token = generate_token();
        let model = TrackingTokenActiveModel {
            order_id: Set(order.id),
            token: Set(token),
            created_at: Set(Utc::now()),
        };

        match model.insert(&*self.db).await {
            Ok(saved) => {
                info!(order_id = %order_id, "Tracking token issued");
                self.emit(Event::TrackingTokenIssued(order_id)).await;
                Ok(saved.token)
            }
            Err(insert_err) => {
                // Lost the first-mint race; the winner's row is durable.
                match TrackingTokenEntity::find_by_id(order.id).one(&*self.db).await {
                    Ok(Some(existing)) => Ok(existing.token),
                    _ => Err(insert_err.into()),
                }
            }
        }
    }

    /// Resolves a tracking token to the public order view.
    ///
    /// Fails closed: a malformed token, an unknown token and a token whose
    /// order has been deleted all return the same generic not-found result.
    #[instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<PublicOrderView, ServiceError> {
        let token = token.trim();
        if token.is_empty()
            || token.len() > TOKEN_LENGTH * 2
            || !token.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(resolve_miss());
        }

        let record = TrackingTokenEntity::find()
            .filter(tracking_token::Column::Token.eq(token))
            .one(&*self.db)
            .await?
            .ok_or_else(resolve_miss)?;

        let order = OrderEntity::find_by_id(record.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(resolve_miss)?;

        let items = fetch_items(&self.db, order.id).await?;
        let payments = fetch_payments(&self.db, order.id).await?;
        let totals = totals_from_parts(&order, &items, &payments)?;

        let mut attachments = Vec::new();
        for attachment in fetch_attachments(&self.db, order.id).await? {
            let url = self.attachments.signed_url(&attachment).await;
            attachments.push(PublicAttachment {
                kind: attachment.kind,
                url,
            });
        }

        Ok(PublicOrderView {
            order_number: order.order_number.clone(),
            status: order.status,
            currency: order.currency.clone(),
            created_at: order.created_at,
            ready_at: order.ready_at,
            items: items
                .iter()
                .map(|item| PublicOrderItem {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total(),
                })
                .collect(),
            totals,
            payments: payments
                .iter()
                .map(|entry| PublicPayment {
                    amount: entry.amount,
                    method: entry.method,
                    paid_at: entry.created_at,
                })
                .collect(),
            attachments,
        })
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send tracking event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_long_alphanumeric_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
