use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Manual,
    Tally,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub client_id: Uuid,
    pub entry_date: NaiveDate,
    /// Tally voucher type, e.g. "Payment", "Receipt", "Journal".
    pub voucher_type: String,
    pub narration: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Running balance for the client after this entry.
    pub balance: Decimal,
    pub source: EntrySource,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
