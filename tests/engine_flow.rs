mod common;

use common::{
    add_to_cart, buyer, database_url, order_count, orders_request, setup_state, stock,
    stocked_product, vendor,
};
use marketplace_engine::{
    config::CartLockScope,
    dto::cart::SetCartItemQuantityRequest,
    error::AppError,
    models::{OrderStatus, TransactionType},
    routes::params::PageWindow,
    services::{
        cart_service, order_service::{self, OrderScope}, order_status_service, price_service,
        product_service, stock_service,
    },
};
use marketplace_engine::entity::{AuditLogs, audit_logs::Column as AuditCol};
use rust_decimal_macros::dec;
use marketplace_engine::{
    entity::{order_transactions, product_prices},
    ledger::latest,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

// Stock 5: a cart may hold 3, then not 6, then exactly 5; ordering drains stock and
// cancelling returns it once.
#[tokio::test]
async fn five_units_through_cart_order_and_cancel() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let product = stocked_product(&state, &seller, dec!(10.00), 5).await?;

    add_to_cart(&state, &shopper, product, 3).await?;
    let refused = add_to_cart(&state, &shopper, product, 3).await;
    assert!(matches!(refused, Err(AppError::InsufficientStock)));

    let line = cart_service::set_cart_item_quantity(
        &state,
        &shopper,
        product,
        SetCartItemQuantityRequest { quantity: 5 },
    )
    .await?;
    assert_eq!(line.quantity, 5);

    let created =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(product, 5)]])).await?;
    assert_eq!(created.orders.len(), 1);
    let order_id = created.orders[0].order.id;
    assert_eq!(created.orders[0].status, OrderStatus::Paid);
    assert_eq!(created.orders[0].order.vendor_id, seller.user_id);
    assert_eq!(stock(&state, product).await?, 0);
    assert!(cart_service::get_cart(&state, &shopper).await?.items.is_empty());

    let history = order_status_service::status_history(&state, &shopper, order_id).await?;
    let steps: Vec<_> = history
        .transitions
        .iter()
        .map(|t| (t.previous_status, t.status))
        .collect();
    assert_eq!(
        steps,
        vec![
            (OrderStatus::Zero, OrderStatus::Placed),
            (OrderStatus::Placed, OrderStatus::Paid),
        ]
    );

    let movements = stock_service::stock_history(&state, product).await?;
    let last = movements.last().expect("order debit");
    assert_eq!(last.quantity, -5);
    assert_eq!(last.kind, TransactionType::Out);
    assert_eq!(last.description, format!("order {order_id} placed"));

    let cancelled = order_status_service::cancel_order(&state, &shopper, order_id)
        .await?
        .expect("first cancel appends a transition");
    assert_eq!(cancelled.previous_status, OrderStatus::Paid);
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock(&state, product).await?, 5);

    let again = order_status_service::cancel_order(&state, &shopper, order_id).await?;
    assert!(again.is_none());
    assert_eq!(stock(&state, product).await?, 5);

    let audited = AuditLogs::find()
        .filter(AuditCol::UserId.eq(shopper.user_id))
        .filter(AuditCol::Action.eq("order_cancel"))
        .count(&state.orm)
        .await?;
    assert_eq!(audited, 1);

    let returns = stock_service::stock_history(&state, product)
        .await?
        .into_iter()
        .filter(|m| m.description == format!("cancel order {order_id}"))
        .count();
    assert_eq!(returns, 1);

    Ok(())
}

#[tokio::test]
async fn order_spanning_vendors_leaves_no_trace() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let first = vendor(&state).await?;
    let second = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let a = stocked_product(&state, &first, dec!(3.50), 4).await?;
    let b = stocked_product(&state, &second, dec!(7.25), 4).await?;

    add_to_cart(&state, &shopper, a, 1).await?;
    add_to_cart(&state, &shopper, b, 2).await?;

    let result =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(a, 1), (b, 2)]])).await;
    assert!(matches!(result, Err(AppError::InvalidProductSet)));

    assert_eq!(order_count(&state, shopper.user_id).await?, 0);
    assert_eq!(cart_service::get_cart(&state, &shopper).await?.items.len(), 2);
    assert_eq!(stock(&state, a).await?, 4);
    assert_eq!(stock(&state, b).await?, 4);

    // Split per vendor, both orders land in one call.
    let created = order_service::create_orders(
        &state,
        &shopper,
        orders_request(&[&[(a, 1)], &[(b, 2)]]),
    )
    .await?;
    assert_eq!(created.orders.len(), 2);
    assert_eq!(order_count(&state, shopper.user_id).await?, 2);
    assert_eq!(stock(&state, a).await?, 3);
    assert_eq!(stock(&state, b).await?, 2);

    Ok(())
}

#[tokio::test]
async fn checkout_requires_matching_cart_lines() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let in_cart = stocked_product(&state, &seller, dec!(1.00), 10).await?;
    let not_in_cart = stocked_product(&state, &seller, dec!(1.00), 10).await?;

    add_to_cart(&state, &shopper, in_cart, 2).await?;

    let missing = order_service::create_orders(
        &state,
        &shopper,
        orders_request(&[&[(in_cart, 2), (not_in_cart, 1)]]),
    )
    .await;
    assert!(matches!(missing, Err(AppError::ProductNotInCart(id)) if id == not_in_cart));

    let mismatch =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(in_cart, 1)]])).await;
    assert!(matches!(mismatch, Err(AppError::BadRequest(_))));

    let mut unknown_payment = orders_request(&[&[(in_cart, 2)]]);
    unknown_payment.payment_method_id = "payment_barter".to_string();
    let refused = order_service::create_orders(&state, &shopper, unknown_payment).await;
    assert!(matches!(refused, Err(AppError::BadRequest(_))));

    assert_eq!(order_count(&state, shopper.user_id).await?, 0);
    assert_eq!(stock(&state, in_cart).await?, 10);
    Ok(())
}

#[tokio::test]
async fn advance_stops_at_shipped_and_cancel_is_ignored() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let product = stocked_product(&state, &seller, dec!(2.00), 3).await?;
    add_to_cart(&state, &shopper, product, 2).await?;
    let created =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(product, 2)]])).await?;
    let order_id = created.orders[0].order.id;

    // Buyers cannot move their own orders forward.
    let by_buyer = order_status_service::advance_order(&state, &shopper, order_id).await;
    assert!(matches!(by_buyer, Err(AppError::NotFound)));

    for expected in [OrderStatus::Shipping, OrderStatus::Shipped] {
        let step = order_status_service::advance_order(&state, &seller, order_id).await?;
        assert_eq!(step.status, expected);
    }

    let refused = order_status_service::advance_order(&state, &seller, order_id).await;
    assert!(matches!(refused, Err(AppError::OrderFinalStateReached)));

    let ignored = order_status_service::cancel_order(&state, &shopper, order_id).await?;
    assert!(ignored.is_none());
    assert_eq!(stock(&state, product).await?, 1);

    let history = order_status_service::status_history(&state, &seller, order_id).await?;
    assert_eq!(history.transitions.len(), 4);
    assert_eq!(
        history.transitions.last().map(|t| t.status),
        Some(OrderStatus::Shipped)
    );
    Ok(())
}

#[tokio::test]
async fn cart_and_order_keep_the_price_pinned_at_first_add() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let product = stocked_product(&state, &seller, dec!(10.00), 10).await?;
    let pinned = price_service::current_price(&state, product).await?;

    add_to_cart(&state, &shopper, product, 1).await?;
    let raised = price_service::set_price(&state, &seller, product, dec!(12.00)).await?;
    assert_eq!(price_service::current_price(&state, product).await?.id, raised.id);
    add_to_cart(&state, &shopper, product, 2).await?;

    let cart = cart_service::get_cart(&state, &shopper).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product_price_id, pinned.id);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total_price, dec!(30.00));

    let created =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(product, 3)]])).await?;
    let order_id = created.orders[0].order.id;
    assert_eq!(created.orders[0].items[0].product_price_id, pinned.id);

    let detail = order_service::get_order(&state, &shopper, order_id).await?;
    assert_eq!(detail.total_price, dec!(30.00));
    assert_eq!(detail.status, OrderStatus::Paid);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price, dec!(10.00));

    let history = price_service::price_history(&state, product).await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, pinned.id);

    // Strangers cannot see the order.
    let stranger = buyer(&state).await?;
    let hidden = order_service::get_order(&state, &stranger, order_id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn stock_is_the_signed_sum_and_exports_are_guarded() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let product = stocked_product(&state, &seller, dec!(1.00), 3).await?;

    stock_service::import_stock(&state, &seller, product, 4, "restock").await?;
    assert_eq!(stock(&state, product).await?, 7);

    let too_many = stock_service::export_stock(&state, &seller, product, 8, "damaged").await;
    assert!(matches!(too_many, Err(AppError::InsufficientStock)));

    let out = stock_service::export_stock(&state, &seller, product, 7, "damaged").await?;
    assert_eq!(out.quantity, -7);
    assert_eq!(stock(&state, product).await?, 0);

    let total: i64 = stock_service::stock_history(&state, product)
        .await?
        .iter()
        .map(|m| i64::from(m.quantity))
        .sum();
    assert_eq!(total, 0);

    let other = vendor(&state).await?;
    let foreign = stock_service::import_stock(&state, &other, product, 1, "not mine").await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let shopper = buyer(&state).await?;
    let not_vendor = stock_service::import_stock(&state, &shopper, product, 1, "nope").await;
    assert!(matches!(not_vendor, Err(AppError::Forbidden)));
    Ok(())
}

#[tokio::test]
async fn concurrent_adds_never_exceed_stock() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    for scope in [CartLockScope::Table, CartLockScope::Product] {
        let state = setup_state(&url, scope).await?;
        let seller = vendor(&state).await?;
        let shopper = buyer(&state).await?;
        let product = stocked_product(&state, &seller, dec!(1.00), 5).await?;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let state = state.clone();
            let shopper = shopper.clone();
            handles.push(tokio::spawn(async move {
                add_to_cart(&state, &shopper, product, 1).await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            match handle.await? {
                Ok(()) => admitted += 1,
                Err(AppError::InsufficientStock) => {}
                Err(err) => return Err(err.into()),
            }
        }
        assert_eq!(admitted, 5, "scope {scope:?}");

        let cart = cart_service::get_cart(&state, &shopper).await?;
        assert_eq!(cart.items[0].quantity, 5, "scope {scope:?}");
    }
    Ok(())
}

#[tokio::test]
async fn set_quantity_and_remove_follow_cart_rules() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Product).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let product = stocked_product(&state, &seller, dec!(4.00), 2).await?;

    let missing = cart_service::set_cart_item_quantity(
        &state,
        &shopper,
        product,
        SetCartItemQuantityRequest { quantity: 1 },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    add_to_cart(&state, &shopper, product, 1).await?;
    let over = cart_service::set_cart_item_quantity(
        &state,
        &shopper,
        product,
        SetCartItemQuantityRequest { quantity: 3 },
    )
    .await;
    assert!(matches!(over, Err(AppError::InsufficientStock)));

    let zero = cart_service::set_cart_item_quantity(
        &state,
        &shopper,
        product,
        SetCartItemQuantityRequest { quantity: 0 },
    )
    .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    cart_service::remove_cart_item(&state, &shopper, product).await?;
    let gone = cart_service::remove_cart_item(&state, &shopper, product).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn listings_share_their_filters_with_totals() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;

    let mut products = Vec::new();
    for _ in 0..3 {
        let product = stocked_product(&state, &seller, dec!(5.00), 1).await?;
        add_to_cart(&state, &shopper, product, 1).await?;
        products.push(product);
    }
    let created = order_service::create_orders(
        &state,
        &shopper,
        orders_request(&[&[(products[0], 1)], &[(products[1], 1)], &[(products[2], 1)]]),
    )
    .await?;
    let advanced = created.orders[0].order.id;
    order_status_service::advance_order(&state, &seller, advanced).await?;

    let buyer_scope = OrderScope::Buyer(shopper.user_id);
    let page =
        order_service::list_orders(&state, buyer_scope, None, PageWindow::new(0, 2)).await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, advanced);

    let paid = order_service::list_orders(
        &state,
        buyer_scope,
        Some(OrderStatus::Paid),
        PageWindow::new(0, 1),
    )
    .await?;
    assert_eq!(paid.total, 2);
    assert_eq!(paid.items.len(), 1);
    assert!(paid.items.iter().all(|o| o.status == OrderStatus::Paid));

    let shipping = order_service::list_orders(
        &state,
        OrderScope::Vendor(seller.user_id),
        Some(OrderStatus::Shipping),
        PageWindow::all(),
    )
    .await?;
    assert_eq!(shipping.total, 1);
    assert_eq!(shipping.items[0].id, advanced);
    assert_eq!(shipping.items[0].total_price, dec!(5.00));

    // Every unit is now ordered: none of the three is available any more.
    let unpriced = product_service::create_product(
        &state,
        &seller,
        marketplace_engine::dto::products::CreateProductRequest {
            name: "draft".to_string(),
            description: None,
            unit: None,
            price: None,
        },
    )
    .await?;
    stock_service::import_stock(&state, &seller, unpriced.id, 5, "initial stock").await?;
    let restocked = stocked_product(&state, &seller, dec!(5.00), 2).await?;

    let available =
        product_service::list_available_products(&state, Some(shopper.user_id), PageWindow::all())
            .await?;
    let ids: Vec<_> = available.items.iter().map(|p| p.id).collect();
    assert!(ids.contains(&restocked));
    assert!(!ids.contains(&unpriced.id));
    assert!(products.iter().all(|p| !ids.contains(p)));

    let own_view =
        product_service::list_available_products(&state, Some(seller.user_id), PageWindow::all())
            .await?;
    assert!(!own_view.items.iter().any(|p| p.id == restocked));

    let mine =
        product_service::list_vendor_products(&state, seller.user_id, PageWindow::all()).await?;
    assert_eq!(mine.total, 5);
    assert_eq!(mine.items.len(), 5);
    let detail = product_service::get_product(&state, restocked).await?;
    assert_eq!(detail.stock_quantity, 2);
    assert_eq!(detail.price, Some(dec!(5.00)));
    Ok(())
}

/// Two fresh ids, lower first.
fn ordered_ids() -> (Uuid, Uuid) {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    if a < b { (a, b) } else { (b, a) }
}

// Rows sharing a timestamp are ordered by id, in SQL and in memory alike.
#[tokio::test]
async fn equal_timestamps_resolve_to_the_higher_id() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url, CartLockScope::Table).await?;
    let seller = vendor(&state).await?;
    let shopper = buyer(&state).await?;
    let product = stocked_product(&state, &seller, dec!(1.00), 4).await?;

    let tied_at = chrono::Utc::now() + chrono::Duration::hours(1);
    let (low, high) = ordered_ids();
    for (id, price) in [(high, dec!(3.00)), (low, dec!(2.00))] {
        product_prices::ActiveModel {
            id: Set(id),
            product_id: Set(product),
            price: Set(price),
            created_at: Set(tied_at.into()),
        }
        .insert(&state.orm)
        .await?;
    }
    let current = price_service::current_price(&state, product).await?;
    assert_eq!(current.id, high);
    assert_eq!(current.price, dec!(3.00));
    let history = price_service::price_history(&state, product).await?;
    assert_eq!(latest(&history).map(|p| p.id), Some(high));
    assert_eq!(history.last().map(|p| p.id), Some(high));

    add_to_cart(&state, &shopper, product, 1).await?;
    let created =
        order_service::create_orders(&state, &shopper, orders_request(&[&[(product, 1)]])).await?;
    let order_id = created.orders[0].order.id;

    let (low, high) = ordered_ids();
    for (id, status) in [(high, OrderStatus::Shipping), (low, OrderStatus::Cancelled)] {
        order_transactions::ActiveModel {
            id: Set(id),
            order_id: Set(order_id),
            previous_status: Set(OrderStatus::Paid.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(tied_at.into()),
        }
        .insert(&state.orm)
        .await?;
    }
    let status = order_status_service::current_status(&state.orm, order_id).await?;
    assert_eq!(status, OrderStatus::Shipping);
    let detail = order_service::get_order(&state, &shopper, order_id).await?;
    assert_eq!(detail.status, OrderStatus::Shipping);
    let history = order_status_service::status_history(&state, &shopper, order_id).await?;
    let resolved = latest(&history.transitions).map(|t| (t.id, t.status));
    assert_eq!(resolved, Some((high, OrderStatus::Shipping)));
    Ok(())
}
