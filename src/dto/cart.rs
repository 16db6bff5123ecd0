use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCartItemQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartDto {
    pub cart_id: Uuid,
    pub items: Vec<CartItemDto>,
    pub total_price: Decimal,
}

/// A cart line priced with the price row pinned when it was added.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price_id: Uuid,
    pub product_price: Decimal,
    pub quantity: i32,
    pub vendor_id: Uuid,
    pub vendor_name: String,
}
