use marketplace_engine::{
    config::AppConfig,
    db::create_state,
    dto::products::CreateProductRequest,
    middleware::auth::AuthUser,
    models::{ROLE_USER, ROLE_VENDOR},
    services::{product_service, stock_service},
    state::AppState,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let state = create_state(&config).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&state.pool).await?;

    let buyer_id = ensure_user(&state, "Buyer", "buyer@example.com", ROLE_USER).await?;
    let ferris = ensure_user(&state, "Ferris Goods", "ferris@example.com", ROLE_VENDOR).await?;
    let crab = ensure_user(&state, "Crab Supply", "crab@example.com", ROLE_VENDOR).await?;

    seed_catalog(
        &state,
        ferris,
        &[
            ("Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2), 100),
            ("Rust Sticker Pack", "Decorate your laptop", Decimal::new(500, 2), 200),
        ],
    )
    .await?;
    seed_catalog(
        &state,
        crab,
        &[
            ("Axum Hoodie", "Warm hoodie for Rustaceans", Decimal::new(5500, 2), 50),
            ("E-book: Async Rust", "Learn async Rust patterns", Decimal::new(2500, 2), 75),
        ],
    )
    .await?;

    tracing::info!(%buyer_id, %ferris, %crab, "seed completed");
    Ok(())
}

async fn ensure_user(state: &AppState, name: &str, email: &str, role: &str) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(email, role, "ensured user");
    Ok(user_id)
}

/// Products are only created for a vendor that has none yet, so reruns are no-ops.
async fn seed_catalog(
    state: &AppState,
    vendor_id: Uuid,
    products: &[(&str, &str, Decimal, i32)],
) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE vendor_id = $1")
        .bind(vendor_id)
        .fetch_one(&state.pool)
        .await?;
    if existing > 0 {
        tracing::info!(%vendor_id, existing, "catalog already seeded");
        return Ok(());
    }

    let vendor = AuthUser::vendor(vendor_id);
    for (name, description, price, stock) in products {
        let product = product_service::create_product(
            state,
            &vendor,
            CreateProductRequest {
                name: name.to_string(),
                description: Some(description.to_string()),
                unit: None,
                price: Some(*price),
            },
        )
        .await?;
        stock_service::import_stock(state, &vendor, product.id, *stock, "initial stock").await?;
    }

    tracing::info!(%vendor_id, count = products.len(), "seeded products");
    Ok(())
}
