use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus, OrderTransaction};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// One proposed order. Every product must belong to the same vendor.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderCreateDto {
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrdersRequest {
    pub orders: Vec<OrderCreateDto>,
    pub payment_method_id: String,
    pub recipient_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedOrders {
    pub orders: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemDto {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Order read model: header plus ledger-derived status and total.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub payment_method_id: String,
    pub payment_method_name: Option<String>,
    pub shipping_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub status: OrderStatus,
    pub status_change_time: DateTime<Utc>,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusHistory {
    pub order_id: Uuid,
    pub transitions: Vec<OrderTransaction>,
}
