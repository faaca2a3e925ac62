use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sync_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One Tally import job. Imports run synchronously within the request;
/// the row records counters and per-row failures for later inspection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TallySync {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub client_id: Uuid,
    pub file_name: String,
    pub status: SyncStatus,
    pub total_rows: i32,
    pub imported_rows: i32,
    pub failed_rows: i32,
    /// First N row-level parse/import errors, for operator diagnosis.
    pub errors: Json<Vec<String>>,
    pub started_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
