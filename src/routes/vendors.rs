use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::OrderDto,
        products::{CreateProductRequest, SetPriceRequest, StockMovementRequest, UpdateProductRequest},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_vendor},
    models::{OrderTransaction, Product, ProductPrice, ProductWithStock, StockTransaction, TransactionType},
    response::{ApiResponse, Page},
    routes::params::{OrderListQuery, Pagination},
    services::{
        order_service::{self, OrderScope},
        order_status_service, price_service, product_service, stock_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_own_products).post(create_product))
        .route("/products/{id}", patch(update_product))
        .route(
            "/products/{id}/stocks",
            get(stock_history).post(record_stock_movement),
        )
        .route("/products/{id}/prices", post(set_price))
        .route("/orders", get(list_vendor_orders))
        .route("/orders/{id}/next-status", post(advance_order))
}

#[utoipa::path(
    get,
    path = "/api/vendors/products",
    params(Pagination),
    responses(
        (status = 200, description = "Products of the current vendor", body = ApiResponse<Page<ProductWithStock>>),
        (status = 403, description = "Caller is not a vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn list_own_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Page<ProductWithStock>>>> {
    ensure_vendor(&user)?;
    let page =
        product_service::list_vendor_products(&state, user.user_id, pagination.normalize()).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success("Products", page, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/vendors/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductWithStock>),
        (status = 403, description = "Caller is not a vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductWithStock>>)> {
    let product = product_service::create_product(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Product created", product, None)),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/vendors/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 403, description = "Product belongs to another vendor"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(ApiResponse::success("Updated", product, None)))
}

#[utoipa::path(
    post,
    path = "/api/vendors/products/{id}/stocks",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = StockMovementRequest,
    responses(
        (status = 201, description = "Movement appended to the stock ledger", body = ApiResponse<StockTransaction>),
        (status = 400, description = "insufficient_stock_quantity"),
        (status = 403, description = "Product belongs to another vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn record_stock_movement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockMovementRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<StockTransaction>>)> {
    let movement = match payload.kind {
        TransactionType::In => {
            let description = payload.description.unwrap_or_else(|| "import".to_string());
            stock_service::import_stock(&state, &user, id, payload.quantity, &description).await?
        }
        TransactionType::Out => {
            let description = payload.description.unwrap_or_else(|| "export".to_string());
            stock_service::export_stock(&state, &user, id, payload.quantity, &description).await?
        }
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Stock updated", movement, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/vendors/products/{id}/stocks",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock ledger of the product, oldest first", body = ApiResponse<Vec<StockTransaction>>),
        (status = 403, description = "Product belongs to another vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn stock_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<StockTransaction>>>> {
    product_service::load_owned_product(&state.orm, &user, id).await?;
    let movements = stock_service::stock_history(&state, id).await?;
    Ok(Json(ApiResponse::success("Stock", movements, None)))
}

#[utoipa::path(
    post,
    path = "/api/vendors/products/{id}/prices",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = SetPriceRequest,
    responses(
        (status = 201, description = "Price appended", body = ApiResponse<ProductPrice>),
        (status = 403, description = "Product belongs to another vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn set_price(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPriceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductPrice>>)> {
    let price = price_service::set_price(&state, &user, id, payload.price).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Price set", price, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/vendors/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders the current vendor fulfils", body = ApiResponse<Page<OrderDto>>),
        (status = 403, description = "Caller is not a vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn list_vendor_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<Page<OrderDto>>>> {
    ensure_vendor(&user)?;
    let page = order_service::list_orders(
        &state,
        OrderScope::Vendor(user.user_id),
        query.status,
        query.window(),
    )
    .await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success("Ok", page, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/vendors/orders/{id}/next-status",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order advanced one step", body = ApiResponse<OrderTransaction>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "order_final_status_reached"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendors"
)]
pub async fn advance_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTransaction>>> {
    ensure_vendor(&user)?;
    let transition = order_status_service::advance_order(&state, &user, id).await?;
    Ok(Json(ApiResponse::success("Order advanced", transition, None)))
}
