use uuid::Uuid;

use crate::db::{self, DbError};

/// Best-effort in-app notification, same contract as audit writes: a failed
/// insert is logged and swallowed, never surfaced to the triggering request.
pub async fn notify(firm_id: Uuid, user_id: Uuid, title: &str, body: &str, kind: &str) {
    if let Err(e) = try_notify(firm_id, user_id, title, body, kind).await {
        tracing::warn!("notification write failed ({}): {}", kind, e);
    }
}

async fn try_notify(
    firm_id: Uuid,
    user_id: Uuid,
    title: &str,
    body: &str,
    kind: &str,
) -> Result<(), DbError> {
    let pool = db::pool().await?;
    sqlx::query(
        "INSERT INTO notifications (firm_id, user_id, title, body, kind)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(firm_id)
    .bind(user_id)
    .bind(title)
    .bind(body)
    .bind(kind)
    .execute(pool)
    .await?;
    Ok(())
}
