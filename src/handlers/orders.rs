use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::order::{Model as OrderModel, OrderStatus},
    entities::order_item::Model as OrderItemModel,
    entities::payment::Model as PaymentModel,
    errors::ServiceError,
    services::orders::{AddItemRequest, CreateOrderRequest},
    services::totals::Totals,
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReadyAtRequest {
    pub ready_at: Option<DateTime<Utc>>,
}

/// Operator-facing order detail: the order plus everything billed against it.
#[derive(Debug, serde::Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub payments: Vec<PaymentModel>,
    pub totals: Totals,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    raw.parse::<OrderStatus>().map_err(|_| {
        ServiceError::ValidationError(format!("Unknown order status: {}", raw))
    })
}

pub async fn create_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.create_order(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit();
    let (orders, total) = state
        .services
        .orders
        .list_orders(&caller, query.page_index(), limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        orders, total, query.page, limit,
    ))))
}

pub async fn get_order(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(&caller, order_id).await?;
    let items = state.services.orders.list_items(&caller, order_id).await?;
    let payments = state
        .services
        .payments
        .list_payments(&caller, order_id)
        .await?;
    let totals = state
        .services
        .totals
        .compute_totals(&caller, order_id)
        .await?;

    Ok(Json(ApiResponse::success(OrderDetailResponse {
        order,
        items,
        payments,
        totals,
    })))
}

pub async fn update_notes(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .update_notes(&caller, order_id, request.notes)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn set_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_status = parse_status(&request.status)?;
    let order = state
        .services
        .order_status
        .set_status(&caller, order_id, new_status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn set_ready_at(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateReadyAtRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .order_status
        .set_ready_at(&caller, order_id, request.ready_at)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn add_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .orders
        .add_item(&caller, order_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(item))))
}

pub async fn list_items(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.orders.list_items(&caller, order_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .orders
        .remove_item(&caller, order_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_totals(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let totals = state
        .services
        .totals
        .compute_totals(&caller, order_id)
        .await?;
    Ok(Json(ApiResponse::success(totals)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_parse_to_the_snake_case_enum() {
        assert_eq!(parse_status("pending").unwrap(), OrderStatus::Pending);
        assert_eq!(
            parse_status("in_production").unwrap(),
            OrderStatus::InProduction
        );
        assert!(parse_status("shipped").is_err());
    }
}
