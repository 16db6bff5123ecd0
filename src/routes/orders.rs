use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrdersRequest, CreatedOrders, OrderDto, OrderStatusHistory},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderTransaction,
    response::{ApiResponse, Page},
    routes::params::OrderListQuery,
    services::{
        order_service::{self, OrderScope},
        order_status_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/history", get(order_history))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders of the current user", body = ApiResponse<Page<OrderDto>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<Page<OrderDto>>>> {
    let page = order_service::list_orders(
        &state,
        OrderScope::Buyer(user.user_id),
        query.status,
        query.window(),
    )
    .await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success("Ok", page, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrdersRequest,
    responses(
        (status = 201, description = "Orders placed and paid", body = ApiResponse<CreatedOrders>),
        (status = 400, description = "invalid_product_list, product not in cart or bad input"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrdersRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedOrders>>)> {
    let created = order_service::create_orders(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Orders created", created, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<OrderDto>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    let order = order_service::get_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", order, None)))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Cancelled, or already shipped or cancelled", body = ApiResponse<Option<OrderTransaction>>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<OrderTransaction>>>> {
    let transition = order_status_service::cancel_order(&state, &user, id).await?;
    let message = if transition.is_some() {
        "Order cancelled"
    } else {
        "Order unchanged"
    };
    Ok(Json(ApiResponse::success(message, transition, None)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/history",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Status transitions, oldest first", body = ApiResponse<OrderStatusHistory>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderStatusHistory>>> {
    let history = order_status_service::status_history(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("OK", history, None)))
}
