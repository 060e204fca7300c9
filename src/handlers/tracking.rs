use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{auth::AuthUser, errors::ServiceError, ApiResponse, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingTokenResponse {
    pub token: String,
}

/// Returns the order's public tracking token, minting it on first request.
pub async fn issue_or_retrieve_token(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = state
        .services
        .tracking
        .issue_or_retrieve_token(&caller, order_id)
        .await?;
    Ok(Json(ApiResponse::success(TrackingTokenResponse { token })))
}

/// Public, unauthenticated order view behind the tracking token.
pub async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.tracking.resolve(&token).await?;
    Ok(Json(ApiResponse::success(view)))
}
