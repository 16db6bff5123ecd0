use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

pub const ROLE_USER: &str = "user";
pub const ROLE_VENDOR: &str = "vendor";

/// Lifecycle of an order as recorded in `order_transactions`.
///
/// `Zero` only ever appears as the previous status of the first transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    #[serde(rename = "-")]
    Zero,
    #[serde(rename = "PLACED")]
    Placed,
    #[serde(rename = "PAID")]
    Paid,
    #[serde(rename = "SHIPPING")]
    Shipping,
    #[serde(rename = "SHIPPED")]
    Shipped,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Zero => "-",
            OrderStatus::Placed => "PLACED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// The status an "advance" moves to.
    pub fn next(self) -> Result<OrderStatus, AppError> {
        match self {
            OrderStatus::Placed => Ok(OrderStatus::Paid),
            OrderStatus::Paid => Ok(OrderStatus::Shipping),
            OrderStatus::Shipping => Ok(OrderStatus::Shipped),
            OrderStatus::Zero | OrderStatus::Shipped | OrderStatus::Cancelled => {
                Err(AppError::OrderFinalStateReached)
            }
        }
    }

    /// Whether cancelling from this status is a no-op.
    pub fn ignores_cancellation(self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "-" => Ok(OrderStatus::Zero),
            "PLACED" => Ok(OrderStatus::Placed),
            "PAID" => Ok(OrderStatus::Paid),
            "SHIPPING" => Ok(OrderStatus::Shipping),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::BadRequest(format!("unknown order status '{other}'"))),
        }
    }
}

/// Direction tag of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
        }
    }

    /// Ledger sign convention: imports are positive, exports negative.
    pub fn signed(&self, quantity: i32) -> i32 {
        match self {
            TransactionType::In => quantity,
            TransactionType::Out => -quantity,
        }
    }
}

impl FromStr for TransactionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in" => Ok(TransactionType::In),
            "out" => Ok(TransactionType::Out),
            other => Err(AppError::BadRequest(format!(
                "unknown stock transaction type '{other}'"
            ))),
        }
    }
}

/// Admission rule for cart reservations: a cart may hold at most the stock on hand.
pub fn admits(available: i64, requested: i64) -> bool {
    requested <= available
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its ledger-derived stock and current price.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProductWithStock {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub stock_quantity: i64,
    pub product_price_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPrice {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_price_id: Uuid,
    pub quantity: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Uuid,
    pub payment_method_id: String,
    pub shipping_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_price_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub previous_status: OrderStatus,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
}
