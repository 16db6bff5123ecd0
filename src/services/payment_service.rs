use crate::{db::DbPool, error::AppResult, models::PaymentMethod};

pub async fn list_payment_methods(pool: &DbPool) -> AppResult<Vec<PaymentMethod>> {
    let methods = sqlx::query_as::<_, PaymentMethod>(
        "SELECT id, name FROM payment_methods ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(methods)
}
