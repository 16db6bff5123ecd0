use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::products::StockLevel,
    error::AppResult,
    middleware::auth::AuthUser,
    models::{ProductPrice, ProductWithStock},
    response::{ApiResponse, Page},
    routes::params::Pagination,
    services::{price_service, product_service, stock_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
        .route("/{id}/stock", get(current_stock))
        .route("/{id}/prices", get(price_history))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(Pagination),
    responses(
        (status = 200, description = "Priced, in-stock products of other vendors", body = ApiResponse<Page<ProductWithStock>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Page<ProductWithStock>>>> {
    let viewer = user.map(|u| u.user_id);
    let page =
        product_service::list_available_products(&state, viewer, pagination.normalize()).await?;
    let meta = page.meta();
    Ok(Json(ApiResponse::success("Products", page, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with stock and current price", body = ApiResponse<ProductWithStock>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductWithStock>>> {
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(ApiResponse::success("Product", product, None)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/prices",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Every price the product has had, oldest first", body = ApiResponse<Vec<ProductPrice>>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn price_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<ProductPrice>>>> {
    let prices = price_service::price_history(&state, id).await?;
    Ok(Json(ApiResponse::success("Prices", prices, None)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Signed sum of the product's stock ledger", body = ApiResponse<StockLevel>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn current_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StockLevel>>> {
    let level = stock_service::current_stock(&state, id).await?;
    Ok(Json(ApiResponse::success("Stock", level, None)))
}
