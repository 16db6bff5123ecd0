use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    dto::orders::{
        CreateOrdersRequest, CreatedOrders, OrderDto, OrderItemDto, OrderWithItems,
    },
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{ActiveModel as OrderItemActive, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        payment_methods::Entity as PaymentMethods,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    ledger::CURRENT_STATUS,
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, TransactionType},
    response::Page,
    routes::params::PageWindow,
    services::{order_status_service::append_transition, stock_service::record_stock_movement},
    state::AppState,
};

/// Whose orders a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Buyer(Uuid),
    Vendor(Uuid),
}

/// Shape checks that need no storage: non-empty orders, positive quantities,
/// and no product proposed twice in one batch.
fn validate_batch(payload: &CreateOrdersRequest) -> AppResult<()> {
    if payload.orders.is_empty() {
        return Err(AppError::BadRequest("at least one order is required".into()));
    }
    for (field, value) in [
        ("payment_method_id", &payload.payment_method_id),
        ("recipient_address", &payload.recipient_address),
        ("recipient_name", &payload.recipient_name),
        ("recipient_phone", &payload.recipient_phone),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} must not be empty")));
        }
    }

    let mut seen = HashSet::new();
    for order in &payload.orders {
        if order.items.is_empty() {
            return Err(AppError::InvalidProductSet);
        }
        for item in &order.items {
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(
                    "quantity must be greater than 0".to_string(),
                ));
            }
            if !seen.insert(item.product_id) {
                return Err(AppError::InvalidProductSet);
            }
        }
    }
    Ok(())
}

/// Turn cart lines into one order per vendor, atomically.
///
/// Each proposed order must name products of exactly one vendor, and every
/// product must sit in the caller's cart with the same quantity. On success the
/// consumed cart lines are gone, each order has moved `-` to PLACED to PAID, and
/// one `out` row per item has left the stock ledger. Any failure leaves no trace.
pub async fn create_orders(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrdersRequest,
) -> AppResult<CreatedOrders> {
    validate_batch(&payload)?;

    let txn = state.orm.begin().await?;

    if PaymentMethods::find_by_id(payload.payment_method_id.clone())
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest(format!(
            "unknown payment method '{}'",
            payload.payment_method_id
        )));
    }

    let mut vendors = Vec::with_capacity(payload.orders.len());
    for proposed in &payload.orders {
        let product_ids: Vec<Uuid> = proposed.items.iter().map(|i| i.product_id).collect();
        let vendor_ids: Vec<Uuid> = Products::find()
            .select_only()
            .column(ProdCol::VendorId)
            .filter(ProdCol::Id.is_in(product_ids))
            .distinct()
            .into_tuple()
            .all(&txn)
            .await?;
        match vendor_ids.as_slice() {
            [vendor_id] => {
                tracing::debug!(%vendor_id, items = proposed.items.len(), "vendor resolved");
                vendors.push(*vendor_id);
            }
            _ => {
                tracing::warn!(vendors = vendor_ids.len(), "proposed order spans vendors");
                return Err(AppError::InvalidProductSet);
            }
        }
    }

    let all_products: Vec<Uuid> = payload
        .orders
        .iter()
        .flat_map(|o| o.items.iter().map(|i| i.product_id))
        .collect();

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?;
    let cart_id = match cart {
        Some(cart) => cart.id,
        None => return Err(AppError::ProductNotInCart(all_products[0])),
    };

    let lines: HashMap<Uuid, _> = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.is_in(all_products.clone()))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|line| (line.product_id, line))
        .collect();

    let now = Utc::now();
    let mut created = Vec::with_capacity(payload.orders.len());
    for (proposed, vendor_id) in payload.orders.iter().zip(vendors) {
        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            vendor_id: Set(vendor_id),
            payment_method_id: Set(payload.payment_method_id.clone()),
            shipping_address: Set(payload.recipient_address.clone()),
            recipient_name: Set(payload.recipient_name.clone()),
            recipient_phone: Set(payload.recipient_phone.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(proposed.items.len());
        for requested in &proposed.items {
            let line = lines
                .get(&requested.product_id)
                .ok_or(AppError::ProductNotInCart(requested.product_id))?;
            if line.quantity != requested.quantity {
                return Err(AppError::BadRequest(format!(
                    "quantity for product {} does not match the cart ({} in cart)",
                    requested.product_id, line.quantity
                )));
            }
            let item = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                product_price_id: Set(line.product_price_id),
                quantity: Set(line.quantity),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }
        created.push((order, items));
    }

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.is_in(all_products))
        .exec(&txn)
        .await?;

    for (order, _) in &created {
        append_transition(&txn, order.id, OrderStatus::Zero, OrderStatus::Placed).await?;
        append_transition(&txn, order.id, OrderStatus::Placed, OrderStatus::Paid).await?;
    }

    for (order, items) in &created {
        let description = format!("order {} placed", order.id);
        for item in items {
            record_stock_movement(
                &txn,
                item.product_id,
                -item.quantity,
                TransactionType::Out,
                &description,
            )
            .await?;
        }
    }

    txn.commit().await?;

    let order_ids: Vec<Uuid> = created.iter().map(|(o, _)| o.id).collect();
    tracing::info!(user_id = %user.user_id, orders = order_ids.len(), "orders created");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_ids": order_ids }),
    )
    .await;

    Ok(CreatedOrders {
        orders: created
            .into_iter()
            .map(|(order, items)| OrderWithItems {
                order: order_from_entity(order),
                status: OrderStatus::Paid,
                items: items.into_iter().map(order_item_from_entity).collect(),
            })
            .collect(),
    })
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    vendor_id: Uuid,
    vendor_name: String,
    payment_method_id: String,
    payment_method_name: Option<String>,
    shipping_address: String,
    recipient_name: String,
    recipient_phone: String,
    status: String,
    status_change_time: DateTime<Utc>,
    total_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_dto(self, items: Vec<OrderItemDto>) -> AppResult<OrderDto> {
        Ok(OrderDto {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            vendor_id: self.vendor_id,
            vendor_name: self.vendor_name,
            payment_method_id: self.payment_method_id,
            payment_method_name: self.payment_method_name,
            shipping_address: self.shipping_address,
            recipient_name: self.recipient_name,
            recipient_phone: self.recipient_phone,
            status: self.status.parse()?,
            status_change_time: self.status_change_time,
            total_price: self.total_price,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    product_id: Uuid,
    product_name: String,
    product_price_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

fn order_from() -> String {
    format!(
        "FROM orders o \
         JOIN order_transactions {cur} ON {cur}.order_id = o.id \
         {join} \
         WHERE {latest}",
        cur = CURRENT_STATUS.current,
        join = CURRENT_STATUS.join(),
        latest = CURRENT_STATUS.is_latest(),
    )
}

/// Orders with their current status and pinned-price total.
fn order_select() -> String {
    format!(
        "SELECT o.id, o.user_id, buyer.name AS user_name, o.vendor_id, vendor.name AS vendor_name, \
         o.payment_method_id, pm.name AS payment_method_name, \
         o.shipping_address, o.recipient_name, o.recipient_phone, \
         {cur}.status, {cur}.created_at AS status_change_time, \
         COALESCE((SELECT SUM(pp.price * oi.quantity) FROM order_items oi \
         JOIN product_prices pp ON pp.id = oi.product_price_id \
         WHERE oi.order_id = o.id), 0) AS total_price, \
         o.created_at, o.updated_at \
         FROM orders o \
         JOIN users buyer ON buyer.id = o.user_id \
         JOIN users vendor ON vendor.id = o.vendor_id \
         LEFT JOIN payment_methods pm ON pm.id = o.payment_method_id \
         JOIN order_transactions {cur} ON {cur}.order_id = o.id \
         {join} \
         WHERE {latest}",
        cur = CURRENT_STATUS.current,
        join = CURRENT_STATUS.join(),
        latest = CURRENT_STATUS.is_latest(),
    )
}

/// Listing predicate, pushed identically onto the page query and the count query.
fn push_order_filter(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: OrderScope,
    status: Option<OrderStatus>,
) {
    match scope {
        OrderScope::Buyer(user_id) => {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }
        OrderScope::Vendor(vendor_id) => {
            qb.push(" AND o.vendor_id = ").push_bind(vendor_id);
        }
    }
    if let Some(status) = status {
        qb.push(format!(" AND {}.status = ", CURRENT_STATUS.current))
            .push_bind(status.as_str());
    }
}

/// One order with its items, visible to its buyer and its vendor only.
pub async fn get_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<OrderDto> {
    let mut qb = QueryBuilder::<Postgres>::new(order_select());
    qb.push(" AND o.id = ")
        .push_bind(order_id)
        .push(" AND (o.user_id = ")
        .push_bind(user.user_id)
        .push(" OR o.vendor_id = ")
        .push_bind(user.user_id)
        .push(")");
    let row = qb
        .build_query_as::<OrderRow>()
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT oi.product_id, p.name AS product_name, oi.product_price_id,
               oi.quantity, pp.price AS unit_price
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        JOIN product_prices pp ON pp.id = oi.product_price_id
        WHERE oi.order_id = $1
        ORDER BY oi.created_at, oi.id
        "#,
    )
    .bind(order_id)
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|r| OrderItemDto {
        product_id: r.product_id,
        product_name: r.product_name,
        product_price_id: r.product_price_id,
        quantity: r.quantity,
        unit_price: r.unit_price,
    })
    .collect();

    row.into_dto(items)
}

/// Page of orders for a buyer or vendor, newest status change first.
///
/// `total` counts the same filtered set the page is cut from.
pub async fn list_orders(
    state: &AppState,
    scope: OrderScope,
    status: Option<OrderStatus>,
    window: PageWindow,
) -> AppResult<Page<OrderDto>> {
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(o.id) {}", order_from()));
    push_order_filter(&mut count, scope, status);
    let total = count.build_query_scalar::<i64>().fetch_one(&state.pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(order_select());
    push_order_filter(&mut qb, scope, status);
    qb.push(format!(
        " ORDER BY {cur}.created_at DESC, o.id",
        cur = CURRENT_STATUS.current
    ));
    if let Some(limit) = window.limit() {
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(window.offset());
    }
    let rows = qb
        .build_query_as::<OrderRow>()
        .fetch_all(&state.pool)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| row.into_dto(Vec::new()))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        page_index: window.page_index,
        items_per_page: window.items_per_page,
    })
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        vendor_id: model.vendor_id,
        payment_method_id: model.payment_method_id,
        shipping_address: model.shipping_address,
        recipient_name: model.recipient_name,
        recipient_phone: model.recipient_phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_price_id: model.product_price_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::{OrderCreateDto, OrderItemRequest};

    fn request(orders: Vec<Vec<(Uuid, i32)>>) -> CreateOrdersRequest {
        CreateOrdersRequest {
            orders: orders
                .into_iter()
                .map(|items| OrderCreateDto {
                    items: items
                        .into_iter()
                        .map(|(product_id, quantity)| OrderItemRequest {
                            product_id,
                            quantity,
                        })
                        .collect(),
                })
                .collect(),
            payment_method_id: "cod".into(),
            recipient_address: "1 Main St".into(),
            recipient_name: "Sam".into(),
            recipient_phone: "555-0100".into(),
        }
    }

    #[test]
    fn batch_with_distinct_products_is_accepted() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_batch(&request(vec![vec![(a, 1)], vec![(b, 2)]])).is_ok());
    }

    #[test]
    fn product_repeated_across_orders_is_rejected() {
        let a = Uuid::new_v4();
        let err = validate_batch(&request(vec![vec![(a, 1)], vec![(a, 1)]])).unwrap_err();
        assert!(matches!(err, AppError::InvalidProductSet));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert!(matches!(
            validate_batch(&request(vec![])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_batch(&request(vec![vec![]])),
            Err(AppError::InvalidProductSet)
        ));
        assert!(matches!(
            validate_batch(&request(vec![vec![(Uuid::new_v4(), 0)]])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn blank_recipient_is_rejected() {
        let mut payload = request(vec![vec![(Uuid::new_v4(), 1)]]);
        payload.recipient_phone = "  ".into();
        assert!(matches!(validate_batch(&payload), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn count_and_page_share_the_status_predicate() {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(o.id) {}", order_from()));
        let mut page = QueryBuilder::<Postgres>::new(order_select());
        push_order_filter(&mut count, OrderScope::Buyer(Uuid::nil()), Some(OrderStatus::Paid));
        push_order_filter(&mut page, OrderScope::Buyer(Uuid::nil()), Some(OrderStatus::Paid));
        assert!(count.sql().ends_with("AND o.user_id = $1 AND ot1.status = $2"));
        assert!(page.sql().ends_with("AND o.user_id = $1 AND ot1.status = $2"));
    }
}
