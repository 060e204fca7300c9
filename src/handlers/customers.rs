use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::customers::{CreateCustomerRequest, UpdateCustomerRequest},
    ApiResponse, AppState, ListQuery, PaginatedResponse,
};

pub async fn create_customer(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .create_customer(&caller, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(customer))))
}

pub async fn list_customers(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query.limit();
    let (customers, total) = state
        .services
        .customers
        .list_customers(&caller, query.page_index(), limit)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        customers, total, query.page, limit,
    ))))
}

pub async fn get_customer(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .get_customer(&caller, customer_id)
        .await?;
    Ok(Json(ApiResponse::success(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state
        .services
        .customers
        .update_customer(&caller, customer_id, request)
        .await?;
    Ok(Json(ApiResponse::success(customer)))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .customers
        .delete_customer(&caller, customer_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
