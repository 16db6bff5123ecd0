#![allow(dead_code)]

use marketplace_engine::{
    config::CartLockScope,
    db::{create_pool, run_migrations},
    dto::{
        cart::AddCartItemRequest,
        orders::{CreateOrdersRequest, OrderCreateDto, OrderItemRequest},
        products::CreateProductRequest,
    },
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::{ROLE_USER, ROLE_VENDOR},
    services::{cart_service, product_service, stock_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, SqlxPostgresConnector};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub const PAYMENT_METHOD: &str = "payment_cod";

/// Integration tests run only when a database is configured.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            None
        }
    }
}

/// Fresh pool per test. Tests never truncate: every fixture uses its own users and products.
pub async fn setup_state(database_url: &str, cart_lock: CartLockScope) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url, 20).await?;
    let orm = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm).await })
        .await?;
    Ok(AppState {
        pool,
        orm,
        cart_lock,
    })
}

pub async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        name: Set(format!("{role}-{id}")),
        email: Set(format!("{id}@example.test")),
        role: Set(role.to_string()),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role: role.to_string(),
    })
}

pub async fn buyer(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, ROLE_USER).await
}

pub async fn vendor(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, ROLE_VENDOR).await
}

/// A priced product with `stock` units imported.
pub async fn stocked_product(
    state: &AppState,
    vendor: &AuthUser,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = product_service::create_product(
        state,
        vendor,
        CreateProductRequest {
            name: format!("product-{}", Uuid::new_v4()),
            description: None,
            unit: None,
            price: Some(price),
        },
    )
    .await?;
    if stock > 0 {
        stock_service::import_stock(state, vendor, product.id, stock, "initial stock").await?;
    }
    Ok(product.id)
}

pub async fn add_to_cart(
    state: &AppState,
    buyer: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> marketplace_engine::error::AppResult<()> {
    cart_service::add_cart_item(
        state,
        buyer,
        AddCartItemRequest {
            product_id,
            quantity,
        },
    )
    .await
    .map(|_| ())
}

/// One proposed order per inner list.
pub fn orders_request(orders: &[&[(Uuid, i32)]]) -> CreateOrdersRequest {
    CreateOrdersRequest {
        orders: orders
            .iter()
            .map(|items| OrderCreateDto {
                items: items
                    .iter()
                    .map(|&(product_id, quantity)| OrderItemRequest {
                        product_id,
                        quantity,
                    })
                    .collect(),
            })
            .collect(),
        payment_method_id: PAYMENT_METHOD.to_string(),
        recipient_address: "1 Ferris Lane".to_string(),
        recipient_name: "Test Buyer".to_string(),
        recipient_phone: "555-0100".to_string(),
    }
}

pub async fn stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i64> {
    Ok(stock_service::current_stock(state, product_id)
        .await?
        .stock_quantity)
}

pub async fn order_count(state: &AppState, user_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}
