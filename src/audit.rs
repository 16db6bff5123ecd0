use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Record who changed what after a committed mutation.
///
/// Runs outside the mutation's transaction; a failed insert is logged and
/// never surfaces to the caller.
pub async fn audit_best_effort(
    pool: &DbPool,
    actor: Uuid,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let inserted = sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, resource, metadata) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::now_v7())
    .bind(actor)
    .bind(action)
    .bind(resource)
    .bind(&metadata)
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => tracing::debug!(%actor, action, resource, "audited"),
        Err(err) => tracing::warn!(error = %err, %actor, action, "audit log failed"),
    }
}
