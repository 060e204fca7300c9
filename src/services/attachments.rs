use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::attachment::{
        self, ActiveModel as AttachmentActiveModel, Entity as AttachmentEntity,
        Model as AttachmentModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::load_owned_order,
    storage::ObjectStore,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterAttachmentRequest {
    /// Opaque key of the uploaded object in the store.
    #[validate(length(min = 1, max = 500, message = "Object key is required"))]
    pub object_key: String,
    /// MIME type of the uploaded object.
    #[validate(length(min = 1, max = 100, message = "Attachment kind is required"))]
    pub kind: String,
}

/// Attachments of an order, newest first, for internal composition.
pub(crate) async fn fetch_attachments(
    db: &DbPool,
    order_id: Uuid,
) -> Result<Vec<AttachmentModel>, ServiceError> {
    Ok(AttachmentEntity::find()
        .filter(attachment::Column::OrderId.eq(order_id))
        .order_by_desc(attachment::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Attachment records and the gateway to their binary content.
///
/// The permanent object key never leaves this service; readers get
/// short-lived signed URLs minted per read.
#[derive(Clone)]
pub struct AttachmentService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    object_store: Arc<dyn ObjectStore>,
    url_ttl_secs: u64,
}

impl AttachmentService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        object_store: Arc<dyn ObjectStore>,
        url_ttl_secs: u64,
    ) -> Self {
        Self {
            db,
            event_sender,
            object_store,
            url_ttl_secs,
        }
    }

    /// Records an uploaded object against an order.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn register_attachment(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        request: RegisterAttachmentRequest,
    ) -> Result<AttachmentModel, ServiceError> {
        request.validate()?;
        load_owned_order(&self.db, caller, order_id).await?;

        let attachment_id = Uuid::new_v4();
        let model = AttachmentActiveModel {
            id: Set(attachment_id),
            order_id: Set(order_id),
            object_key: Set(request.object_key),
            kind: Set(request.kind),
            created_at: Set(Utc::now()),
        };

        let attachment = model.insert(&*self.db).await?;
        info!(order_id = %order_id, attachment_id = %attachment_id, "Attachment registered");

        self.emit(Event::AttachmentUploaded {
            order_id,
            attachment_id,
        })
        .await;

        Ok(attachment)
    }

    /// Lists an order's attachments, newest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_attachments(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
    ) -> Result<Vec<AttachmentModel>, ServiceError> {
        load_owned_order(&self.db, caller, order_id).await?;
        fetch_attachments(&self.db, order_id).await
    }

    /// Deletes an attachment record.
    #[instrument(skip(self), fields(order_id = %order_id, attachment_id = %attachment_id))]
    pub async fn delete_attachment(
        &self,
        caller: &AuthUser,
        order_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(), ServiceError> {
        load_owned_order(&self.db, caller, order_id).await?;

        let attachment = AttachmentEntity::find_by_id(attachment_id)
            .one(&*self.db)
            .await?
            .filter(|attachment| attachment.order_id == order_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Attachment {} not found", attachment_id))
            })?;

        attachment.delete(&*self.db).await?;
        info!(order_id = %order_id, attachment_id = %attachment_id, "Attachment deleted");

        self.emit(Event::AttachmentDeleted {
            order_id,
            attachment_id,
        })
        .await;

        Ok(())
    }

    /// Mints a short-lived download link for an attachment.
    ///
    /// Returns `None` when signing fails: attachment display is not critical
    /// to order correctness, so callers render a placeholder instead of
    /// failing the whole read.
    pub async fn signed_url(&self, attachment: &AttachmentModel) -> Option<String> {
        match self
            .object_store
            .signed_url(&attachment.object_key, self.url_ttl_secs)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(
                    attachment_id = %attachment.id,
                    error = %err,
                    "Failed to sign attachment URL"
                );
                None
            }
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send attachment event");
            }
        }
    }
}
