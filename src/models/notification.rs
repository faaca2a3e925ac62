use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    /// Free-form category, e.g. "task_assigned", "compliance_due".
    pub kind: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
