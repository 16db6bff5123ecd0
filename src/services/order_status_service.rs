use anyhow::anyhow;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
    sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    dto::orders::OrderStatusHistory,
    entity::{
        order_items::{Column as ItemCol, Entity as OrderItems},
        order_transactions::{
            ActiveModel as TransitionActive, Column as TransitionCol,
            Entity as OrderTransactions, Model as TransitionModel,
        },
        orders::{Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    ledger::{CURRENT_STATUS, latest},
    middleware::auth::AuthUser,
    models::{OrderStatus, OrderTransaction, TransactionType},
    services::stock_service::record_stock_movement,
    state::AppState,
};

/// Append a status transition inside the caller's transaction.
pub async fn append_transition<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    previous: OrderStatus,
    next: OrderStatus,
) -> AppResult<OrderTransaction> {
    let row = TransitionActive {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        previous_status: Set(previous.as_str().to_string()),
        status: Set(next.as_str().to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    tracing::debug!(%order_id, from = %previous, to = %next, "order transition appended");
    transition_from_entity(row)
}

/// Status carried by the latest transition of an order.
pub async fn current_status<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<OrderStatus> {
    let sql = format!(
        "SELECT {cur}.id, {cur}.order_id, {cur}.previous_status, {cur}.status, {cur}.created_at \
         FROM order_transactions {cur} {join} \
         WHERE {latest} AND {cur}.order_id = $1",
        cur = CURRENT_STATUS.current,
        join = CURRENT_STATUS.join(),
        latest = CURRENT_STATUS.is_latest(),
    );
    let row = OrderTransactions::find()
        .from_raw_sql(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [order_id.into()],
        ))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow!("order {order_id} has no status history")))?;
    row.status.parse()
}

/// Lock the order row so concurrent advance and cancel calls take turns.
async fn lock_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

/// Move an order one step along PLACED, PAID, SHIPPING, SHIPPED.
///
/// Only the fulfilling vendor may advance. Terminal orders fail with
/// `OrderFinalStateReached` and nothing is written.
pub async fn advance_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderTransaction> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.vendor_id != user.user_id {
        return Err(AppError::NotFound);
    }

    let current = current_status(&txn, order_id).await?;
    let next = match current.next() {
        Ok(next) => next,
        Err(err) => {
            tracing::warn!(%order_id, status = %current, "advance refused");
            return Err(err);
        }
    };
    let transition = append_transition(&txn, order_id, current, next).await?;
    txn.commit().await?;

    tracing::info!(%order_id, from = %current, to = %next, "order advanced");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "order_advance",
        "order_transactions",
        serde_json::json!({ "order_id": order_id, "status": next.as_str() }),
    )
    .await;

    Ok(transition)
}

/// Cancel an order and return its stock to the ledger.
///
/// Cancelling a SHIPPED or CANCELLED order is a no-op and yields `None`.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<Option<OrderTransaction>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.user_id != user.user_id {
        return Err(AppError::NotFound);
    }

    let current = current_status(&txn, order_id).await?;
    if current.ignores_cancellation() {
        tracing::info!(%order_id, status = %current, "cancel ignored");
        return Ok(None);
    }

    let items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(order_id))
        .order_by_asc(ItemCol::CreatedAt)
        .order_by_asc(ItemCol::Id)
        .all(&txn)
        .await?;
    let description = format!("cancel order {order_id}");
    for item in &items {
        record_stock_movement(
            &txn,
            item.product_id,
            item.quantity,
            TransactionType::In,
            &description,
        )
        .await?;
    }

    let transition = append_transition(&txn, order_id, current, OrderStatus::Cancelled).await?;
    txn.commit().await?;

    tracing::info!(%order_id, from = %current, items = items.len(), "order cancelled");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "order_cancel",
        "order_transactions",
        serde_json::json!({ "order_id": order_id, "previous_status": current.as_str() }),
    )
    .await;

    Ok(Some(transition))
}

/// Every transition of an order visible to the caller, oldest first.
pub async fn status_history(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<OrderStatusHistory> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != user.user_id && order.vendor_id != user.user_id {
        return Err(AppError::NotFound);
    }

    let transitions = OrderTransactions::find()
        .filter(TransitionCol::OrderId.eq(order_id))
        .order_by_asc(TransitionCol::CreatedAt)
        .order_by_asc(TransitionCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(transition_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    if let Some(last) = latest(&transitions) {
        tracing::debug!(%order_id, status = %last.status, count = transitions.len(), "status history");
    }

    Ok(OrderStatusHistory {
        order_id,
        transitions,
    })
}

fn transition_from_entity(model: TransitionModel) -> AppResult<OrderTransaction> {
    Ok(OrderTransaction {
        id: model.id,
        order_id: model.order_id,
        previous_status: model.previous_status.parse()?,
        status: model.status.parse()?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}
