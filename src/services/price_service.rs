use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    entity::{
        product_prices::{
            ActiveModel as PriceActive, Column as PriceCol, Entity as ProductPrices,
            Model as PriceModel,
        },
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    ledger::CURRENT_PRICE,
    middleware::auth::AuthUser,
    models::ProductPrice,
    services::product_service::load_owned_product,
    state::AppState,
};

/// Append a price row inside the caller's transaction. Earlier rows are never touched.
pub async fn append_price<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    price: Decimal,
) -> AppResult<ProductPrice> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let row = PriceActive {
        id: Set(Uuid::now_v7()),
        product_id: Set(product_id),
        price: Set(price),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    tracing::debug!(%product_id, %price, price_id = %row.id, "price appended");
    Ok(price_from_entity(row))
}

/// Latest price row of a product, if it was ever priced.
pub async fn latest_price<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<Option<ProductPrice>> {
    let sql = format!(
        "SELECT {cur}.id, {cur}.product_id, {cur}.price, {cur}.created_at \
         FROM product_prices {cur} {join} \
         WHERE {latest} AND {cur}.product_id = $1",
        cur = CURRENT_PRICE.current,
        join = CURRENT_PRICE.join(),
        latest = CURRENT_PRICE.is_latest(),
    );
    let row = ProductPrices::find()
        .from_raw_sql(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [product_id.into()],
        ))
        .one(conn)
        .await?;
    Ok(row.map(price_from_entity))
}

pub async fn set_price(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    price: Decimal,
) -> AppResult<ProductPrice> {
    let txn = state.orm.begin().await?;
    load_owned_product(&txn, user, product_id).await?;
    let row = append_price(&txn, product_id, price).await?;
    txn.commit().await?;

    tracing::info!(%product_id, %price, "price set");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "price_set",
        "product_prices",
        serde_json::json!({ "product_id": product_id, "price_id": row.id }),
    )
    .await;

    Ok(row)
}

/// Current price. A product that was never priced cannot be sold and reads as not found.
pub async fn current_price(state: &AppState, product_id: Uuid) -> AppResult<ProductPrice> {
    latest_price(&state.orm, product_id)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn price_history(state: &AppState, product_id: Uuid) -> AppResult<Vec<ProductPrice>> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let rows = ProductPrices::find()
        .filter(PriceCol::ProductId.eq(product_id))
        .order_by_asc(PriceCol::CreatedAt)
        .order_by_asc(PriceCol::Id)
        .all(&state.orm)
        .await?;
    Ok(rows.into_iter().map(price_from_entity).collect())
}

fn price_from_entity(model: PriceModel) -> ProductPrice {
    ProductPrice {
        id: model.id,
        product_id: model.product_id,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
