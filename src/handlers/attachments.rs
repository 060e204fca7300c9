use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::attachment::Model as AttachmentModel,
    errors::ServiceError,
    services::attachments::RegisterAttachmentRequest,
    ApiResponse, AppState,
};

/// Attachment as rendered to clients.
///
/// Carries a signed download link instead of the raw object key; the key
/// never leaves the server.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    /// Short-lived signed link; `null` when signing is unavailable.
    pub url: Option<String>,
}

async fn to_response(state: &AppState, attachment: AttachmentModel) -> AttachmentResponse {
    let url = state.services.attachments.signed_url(&attachment).await;
    AttachmentResponse {
        id: attachment.id,
        order_id: attachment.order_id,
        kind: attachment.kind,
        created_at: attachment.created_at,
        url,
    }
}

pub async fn register_attachment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RegisterAttachmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let attachment = state
        .services
        .attachments
        .register_attachment(&caller, order_id, request)
        .await?;
    let response = to_response(&state, attachment).await;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let attachments = state
        .services
        .attachments
        .list_attachments(&caller, order_id)
        .await?;

    let mut responses = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        responses.push(to_response(&state, attachment).await);
    }

    Ok(Json(ApiResponse::success(responses)))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((order_id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .attachments
        .delete_attachment(&caller, order_id, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
