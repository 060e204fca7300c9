use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    auth::AuthUser, errors::ServiceError, services::payments::RecordPaymentRequest, ApiResponse,
    AppState,
};

pub async fn record_payment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment = state
        .services
        .payments
        .record_payment(&caller, order_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(payment))))
}

pub async fn list_payments(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let payments = state
        .services
        .payments
        .list_payments(&caller, order_id)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}
