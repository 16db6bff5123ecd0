use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddCartItemRequest, CartDto, SetCartItemQuantityRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_cart_item))
        .route(
            "/{product_id}",
            put(set_cart_item_quantity).delete(remove_cart_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines of the current user", body = ApiResponse<CartDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let cart = cart_service::get_cart(&state, &user).await?;
    Ok(Json(ApiResponse::success("OK", cart, None)))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Quantity added to the cart line", body = ApiResponse<CartItem>),
        (status = 400, description = "insufficient_stock_quantity"),
        (status = 404, description = "Product not found or not priced"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddCartItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartItem>>)> {
    let item = cart_service::add_cart_item(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Added to cart", item, None)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/cart/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    request_body = SetCartItemQuantityRequest,
    responses(
        (status = 200, description = "Cart line quantity replaced", body = ApiResponse<CartItem>),
        (status = 400, description = "insufficient_stock_quantity"),
        (status = 404, description = "Product is not in the cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn set_cart_item_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetCartItemQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let item = cart_service::set_cart_item_quantity(&state, &user, product_id, payload).await?;
    Ok(Json(ApiResponse::success("Updated", item, None)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Cart line removed"),
        (status = 404, description = "Product is not in the cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    cart_service::remove_cart_item(&state, &user, product_id).await?;
    Ok(Json(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
