use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    config::CartLockScope,
    db::DbPool,
    dto::cart::{AddCartItemRequest, CartDto, CartItemDto, SetCartItemQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, admits},
    services::price_service,
    state::AppState,
};

/// Stock on hand next to what one cart already holds, read in a single statement.
#[derive(Debug, FromRow)]
struct Holding {
    available: i64,
    held: i64,
}

/// How a mutation changes a cart line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Add(i32),
    Set(i32),
}

impl Reservation {
    fn quantity(self) -> i32 {
        match self {
            Reservation::Add(q) | Reservation::Set(q) => q,
        }
    }

    /// Quantity the line would hold afterwards.
    pub fn requested(self, held: i64) -> i64 {
        match self {
            Reservation::Add(delta) => held + i64::from(delta),
            Reservation::Set(quantity) => i64::from(quantity),
        }
    }

    /// Resulting line quantity, refused when it no longer fits the `INTEGER` column.
    pub fn line_quantity(self, held: i64) -> AppResult<i32> {
        i32::try_from(self.requested(held)).map_err(|_| {
            AppError::BadRequest(format!("cart line quantity cannot exceed {}", i32::MAX))
        })
    }
}

/// Return the caller's cart, creating it on first use.
pub async fn find_or_create_cart(pool: &DbPool, user_id: Uuid) -> AppResult<Uuid> {
    let (cart_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO carts (id, user_id) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(cart_id)
}

async fn lock_for_admission(
    conn: &mut PgConnection,
    scope: CartLockScope,
    product_id: Uuid,
) -> AppResult<()> {
    match scope {
        CartLockScope::Table => {
            sqlx::query("LOCK TABLE cart_items IN EXCLUSIVE MODE")
                .execute(conn)
                .await?;
        }
        CartLockScope::Product => {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
                .bind(product_id)
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

async fn holding(conn: &mut PgConnection, cart_id: Uuid, product_id: Uuid) -> AppResult<Holding> {
    let row = sqlx::query_as::<_, Holding>(
        r#"
        SELECT
            (SELECT COALESCE(SUM(quantity), 0) FROM product_transactions
             WHERE product_id = $1)::BIGINT AS available,
            (SELECT COALESCE(SUM(quantity), 0) FROM cart_items
             WHERE cart_id = $2 AND product_id = $1)::BIGINT AS held
        "#,
    )
    .bind(product_id)
    .bind(cart_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Add `quantity` of a product to a cart line, pinning `product_price_id` on first add.
///
/// Refused with `InsufficientStock` when the resulting line would exceed stock on hand.
pub async fn add_item(
    state: &AppState,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    product_price_id: Uuid,
) -> AppResult<CartItem> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    lock_for_admission(&mut tx, state.cart_lock, product_id).await?;
    check_admission(&mut tx, cart_id, product_id, Reservation::Add(quantity)).await?;

    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, cart_id, product_id, product_price_id, quantity, active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        ON CONFLICT (cart_id, product_id) DO UPDATE
        SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(product_id)
    .bind(product_price_id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%cart_id, %product_id, added = quantity, quantity = item.quantity, "cart line added");
    Ok(item)
}

/// Replace the quantity of an existing cart line under the same admission rule.
pub async fn set_quantity(
    state: &AppState,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<CartItem> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    lock_for_admission(&mut tx, state.cart_lock, product_id).await?;
    check_admission(&mut tx, cart_id, product_id, Reservation::Set(quantity)).await?;

    let item = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE cart_items SET quantity = $3, updated_at = NOW()
        WHERE cart_id = $1 AND product_id = $2
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound)?;
    tx.commit().await?;

    tracing::info!(%cart_id, %product_id, quantity, "cart line set");
    Ok(item)
}

/// Drop a cart line. No admission check: removal only lowers the reservation.
pub async fn remove_item(pool: &DbPool, cart_id: Uuid, product_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(%cart_id, %product_id, "cart line removed");
    Ok(())
}

async fn check_admission(
    conn: &mut PgConnection,
    cart_id: Uuid,
    product_id: Uuid,
    reservation: Reservation,
) -> AppResult<()> {
    let Holding { available, held } = holding(conn, cart_id, product_id).await?;
    if matches!(reservation, Reservation::Set(_)) && held == 0 {
        return Err(AppError::NotFound);
    }

    let requested = i64::from(reservation.line_quantity(held)?);
    if !admits(available, requested) {
        tracing::warn!(
            %cart_id,
            %product_id,
            available,
            requested,
            change = reservation.quantity(),
            "cart admission refused"
        );
        return Err(AppError::InsufficientStock);
    }
    tracing::debug!(%cart_id, %product_id, available, requested, "cart admission granted");
    Ok(())
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<CartDto> {
    let cart_id = find_or_create_cart(&state.pool, user.user_id).await?;
    let items = sqlx::query_as::<_, CartItemDto>(
        r#"
        SELECT ci.id, ci.product_id, p.name AS product_name,
               ci.product_price_id, pp.price AS product_price, ci.quantity,
               p.vendor_id, u.name AS vendor_name
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        JOIN users u ON u.id = p.vendor_id
        JOIN product_prices pp ON pp.id = ci.product_price_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at, ci.id
        "#,
    )
    .bind(cart_id)
    .fetch_all(&state.pool)
    .await?;

    let total_price = items
        .iter()
        .map(|item| item.product_price * Decimal::from(item.quantity))
        .sum();

    Ok(CartDto {
        cart_id,
        items,
        total_price,
    })
}

/// Add to the caller's cart at the product's current price.
pub async fn add_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<CartItem> {
    let price = price_service::current_price(state, payload.product_id).await?;
    let cart_id = find_or_create_cart(&state.pool, user.user_id).await?;
    let item = add_item(state, cart_id, payload.product_id, payload.quantity, price.id).await?;

    audit_best_effort(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(item)
}

pub async fn set_cart_item_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SetCartItemQuantityRequest,
) -> AppResult<CartItem> {
    let cart_id = find_or_create_cart(&state.pool, user.user_id).await?;
    let item = set_quantity(state, cart_id, product_id, payload.quantity).await?;

    audit_best_effort(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(item)
}

pub async fn remove_cart_item(state: &AppState, user: &AuthUser, product_id: Uuid) -> AppResult<()> {
    let cart_id = find_or_create_cart(&state.pool, user.user_id).await?;
    remove_item(&state.pool, cart_id, product_id).await?;

    audit_best_effort(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(())
}
