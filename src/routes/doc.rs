use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddCartItemRequest, CartDto, CartItemDto, SetCartItemQuantityRequest},
        orders::{
            CreateOrdersRequest, CreatedOrders, OrderCreateDto, OrderDto, OrderItemDto,
            OrderItemRequest, OrderStatusHistory, OrderWithItems,
        },
        products::{
            CreateProductRequest, SetPriceRequest, StockLevel, StockMovementRequest,
            UpdateProductRequest,
        },
    },
    models::{
        CartItem, Order, OrderItem, OrderStatus, OrderTransaction, PaymentMethod, Product,
        ProductPrice, ProductWithStock, StockTransaction, TransactionType,
    },
    response::{ApiResponse, Meta, Page},
    routes::{cart, health, orders, params, payment_methods, products, vendors},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_cart,
        cart::add_cart_item,
        cart::set_cart_item_quantity,
        cart::remove_cart_item,
        products::list_products,
        products::get_product,
        products::current_stock,
        products::price_history,
        payment_methods::list_payment_methods,
        orders::list_orders,
        orders::create_orders,
        orders::get_order,
        orders::cancel_order,
        orders::order_history,
        vendors::list_own_products,
        vendors::create_product,
        vendors::update_product,
        vendors::record_stock_movement,
        vendors::stock_history,
        vendors::set_price,
        vendors::list_vendor_orders,
        vendors::advance_order
    ),
    components(
        schemas(
            Product,
            ProductWithStock,
            ProductPrice,
            StockTransaction,
            TransactionType,
            StockLevel,
            CartItem,
            CartDto,
            CartItemDto,
            Order,
            OrderItem,
            OrderStatus,
            OrderTransaction,
            OrderDto,
            OrderItemDto,
            OrderWithItems,
            OrderStatusHistory,
            CreatedOrders,
            PaymentMethod,
            AddCartItemRequest,
            SetCartItemQuantityRequest,
            CreateOrdersRequest,
            OrderCreateDto,
            OrderItemRequest,
            CreateProductRequest,
            UpdateProductRequest,
            SetPriceRequest,
            StockMovementRequest,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<CartDto>,
            ApiResponse<OrderDto>,
            ApiResponse<Page<OrderDto>>,
            ApiResponse<Page<ProductWithStock>>,
            ApiResponse<CreatedOrders>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog and price history"),
        (name = "Cart", description = "Cart lines under stock admission control"),
        (name = "Orders", description = "Order creation, cancellation and history"),
        (name = "Vendors", description = "Vendor catalog, stock ledger and fulfilment"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_routes_are_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/cart/{product_id}",
            "/api/orders/{id}/cancel",
            "/api/vendors/products/{id}/stocks",
            "/api/vendors/orders/{id}/next-status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
