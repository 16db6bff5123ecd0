use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::TransactionType;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Optional opening price, appended to the price ledger.
    pub price: Option<Decimal>,
}

/// Only descriptive attributes can change. Vendor and unit are fixed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPriceRequest {
    pub price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockMovementRequest {
    pub quantity: i32,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock_quantity: i64,
}
