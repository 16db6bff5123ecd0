use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, TransactionTrait};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::products::{ActiveModel, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    ledger::CURRENT_PRICE,
    middleware::auth::{AuthUser, ensure_vendor},
    models::{Product, ProductWithStock},
    response::Page,
    routes::params::PageWindow,
    services::price_service::append_price,
    state::AppState,
};

const DEFAULT_UNIT: &str = "pcs";

/// Products joined with their ledger-derived stock and current price.
fn product_rows() -> String {
    format!(
        "SELECT p.id, p.vendor_id, p.name, p.description, p.unit, p.created_at, \
         COALESCE((SELECT SUM(pt.quantity) FROM product_transactions pt \
         WHERE pt.product_id = p.id), 0)::BIGINT AS stock_quantity, \
         {cur}.id AS product_price_id, {cur}.price \
         FROM products p \
         LEFT JOIN product_prices {cur} ON {cur}.product_id = p.id \
         {join} \
         WHERE {latest}",
        cur = CURRENT_PRICE.current,
        join = CURRENT_PRICE.join(),
        latest = CURRENT_PRICE.is_latest(),
    )
}

/// Which products a listing shows. List and count share this.
#[derive(Debug, Clone, Copy)]
enum ProductFilter {
    Vendor(Uuid),
    Available { viewer: Option<Uuid> },
}

impl ProductFilter {
    fn push(self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            ProductFilter::Vendor(vendor_id) => {
                qb.push(" AND d.vendor_id = ").push_bind(vendor_id);
            }
            ProductFilter::Available { viewer } => {
                qb.push(" AND d.stock_quantity > 0 AND d.product_price_id IS NOT NULL");
                if let Some(viewer) = viewer {
                    qb.push(" AND d.vendor_id <> ").push_bind(viewer);
                }
            }
        }
    }
}

/// Load a product for a mutation by its vendor. Anyone else is refused.
pub async fn load_owned_product<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ProductModel> {
    ensure_vendor(user)?;
    let product = Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if product.vendor_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(product)
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ProductWithStock> {
    ensure_vendor(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }

    let now = Utc::now();
    let txn = state.orm.begin().await?;
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(user.user_id),
        name: Set(name),
        description: Set(payload.description.unwrap_or_default()),
        unit: Set(payload.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let price = match payload.price {
        Some(price) => Some(append_price(&txn, product.id, price).await?),
        None => None,
    };
    txn.commit().await?;

    tracing::info!(product_id = %product.id, vendor_id = %user.user_id, "product created");
    audit_best_effort(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ProductWithStock {
        id: product.id,
        vendor_id: product.vendor_id,
        name: product.name,
        description: product.description,
        unit: product.unit,
        stock_quantity: 0,
        product_price_id: price.as_ref().map(|p| p.id),
        price: price.map(|p| p.price),
        created_at: product.created_at.with_timezone(&Utc),
    })
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    let existing = load_owned_product(&state.orm, user, product_id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("name must not be empty".to_string()));
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit_best_effort(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(product_from_entity(product))
}

pub async fn get_product(state: &AppState, product_id: Uuid) -> AppResult<ProductWithStock> {
    let mut qb = QueryBuilder::<Postgres>::new(product_rows());
    qb.push(" AND p.id = ").push_bind(product_id);
    qb.build_query_as::<ProductWithStock>()
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Every product of one vendor, priced or not, newest first.
pub async fn list_vendor_products(
    state: &AppState,
    vendor_id: Uuid,
    window: PageWindow,
) -> AppResult<Page<ProductWithStock>> {
    list_products(state, ProductFilter::Vendor(vendor_id), window).await
}

/// Products a buyer can put in a cart: priced, in stock and not sold by the viewer.
pub async fn list_available_products(
    state: &AppState,
    viewer: Option<Uuid>,
    window: PageWindow,
) -> AppResult<Page<ProductWithStock>> {
    list_products(state, ProductFilter::Available { viewer }, window).await
}

async fn list_products(
    state: &AppState,
    filter: ProductFilter,
    window: PageWindow,
) -> AppResult<Page<ProductWithStock>> {
    let base = product_rows();

    let mut count = QueryBuilder::<Postgres>::new(format!(
        "SELECT COUNT(*) FROM ({base}) d WHERE TRUE"
    ));
    filter.push(&mut count);
    let total = count.build_query_scalar::<i64>().fetch_one(&state.pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT d.* FROM ({base}) d WHERE TRUE"));
    filter.push(&mut qb);
    qb.push(" ORDER BY d.created_at DESC, d.id");
    if let Some(limit) = window.limit() {
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(window.offset());
    }
    let items = qb
        .build_query_as::<ProductWithStock>()
        .fetch_all(&state.pool)
        .await?;

    Ok(Page {
        items,
        total,
        page_index: window.page_index,
        items_per_page: window.items_per_page,
    })
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        vendor_id: model.vendor_id,
        name: model.name,
        description: model.description,
        unit: model.unit,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
