use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
    QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    dto::products::StockLevel,
    entity::{
        product_transactions::{
            ActiveModel as StockActive, Column as StockCol, Entity as ProductTransactions,
            Model as StockModel,
        },
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{StockTransaction, TransactionType},
    services::product_service::load_owned_product,
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct StockRow {
    quantity: i64,
}

/// Append one signed movement to the stock ledger inside the caller's transaction.
///
/// The sign must agree with the type tag: `in` rows are positive, `out` rows negative.
pub async fn record_stock_movement<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
    kind: TransactionType,
    description: &str,
) -> AppResult<StockTransaction> {
    if quantity == 0 || kind.signed(quantity.abs()) != quantity {
        return Err(AppError::BadRequest(format!(
            "stock movement of {quantity} does not match type '{}'",
            kind.as_str()
        )));
    }

    let row = StockActive {
        id: Set(Uuid::now_v7()),
        product_id: Set(product_id),
        quantity: Set(quantity),
        kind: Set(kind.as_str().to_string()),
        description: Set(description.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    tracing::debug!(%product_id, quantity, kind = kind.as_str(), "stock movement recorded");
    stock_transaction_from_entity(row)
}

/// Signed sum of every movement of a product. No rows means zero.
pub async fn stock_of<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<i64> {
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT AS quantity \
         FROM product_transactions WHERE product_id = $1",
        [product_id.into()],
    );
    let row = StockRow::find_by_statement(stmt).one(conn).await?;
    Ok(row.map(|r| r.quantity).unwrap_or(0))
}

pub async fn current_stock(state: &AppState, product_id: Uuid) -> AppResult<StockLevel> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let stock_quantity = stock_of(&state.orm, product_id).await?;
    Ok(StockLevel {
        product_id,
        stock_quantity,
    })
}

pub async fn import_stock(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
    description: &str,
) -> AppResult<StockTransaction> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    load_owned_product(&txn, user, product_id).await?;
    let movement =
        record_stock_movement(&txn, product_id, quantity, TransactionType::In, description)
            .await?;
    txn.commit().await?;

    tracing::info!(%product_id, quantity, "stock imported");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "stock_import",
        "product_transactions",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    Ok(movement)
}

/// Remove stock. Fails with `InsufficientStock` when less than `quantity` is on hand.
pub async fn export_stock(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    quantity: i32,
    description: &str,
) -> AppResult<StockTransaction> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    load_owned_product(&txn, user, product_id).await?;

    // Serializes the check below with every other ledger writer.
    txn.execute(Statement::from_string(
        DbBackend::Postgres,
        "LOCK TABLE product_transactions IN EXCLUSIVE MODE",
    ))
    .await?;

    let available = stock_of(&txn, product_id).await?;
    if available < i64::from(quantity) {
        tracing::warn!(%product_id, available, requested = quantity, "export refused");
        return Err(AppError::InsufficientStock);
    }

    let movement = record_stock_movement(
        &txn,
        product_id,
        -quantity,
        TransactionType::Out,
        description,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(%product_id, quantity, "stock exported");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "stock_export",
        "product_transactions",
        serde_json::json!({ "product_id": product_id, "quantity": quantity }),
    )
    .await;

    Ok(movement)
}

/// Every movement of a product in ledger order.
pub async fn stock_history(state: &AppState, product_id: Uuid) -> AppResult<Vec<StockTransaction>> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    ProductTransactions::find()
        .filter(StockCol::ProductId.eq(product_id))
        .order_by_asc(StockCol::CreatedAt)
        .order_by_asc(StockCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(stock_transaction_from_entity)
        .collect()
}

fn stock_transaction_from_entity(model: StockModel) -> AppResult<StockTransaction> {
    Ok(StockTransaction {
        id: model.id,
        product_id: model.product_id,
        quantity: model.quantity,
        kind: model.kind.parse()?,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
