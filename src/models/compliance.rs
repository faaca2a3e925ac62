use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use super::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "compliance_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplianceType {
    Gst,
    Tds,
    Itr,
    Roc,
    Audit,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "compliance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    InProgress,
    Filed,
    Approved,
    Overdue,
}

/// A regulatory filing obligation (GST/TDS/ITR/...) with a due date and a
/// status lifecycle that tracks the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ComplianceItem {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub client_id: Uuid,
    pub compliance_type: ComplianceType,
    /// Filing period label, e.g. "FY2025-26 Q1" or "Jul 2026".
    pub period: String,
    pub due_date: NaiveDate,
    pub status: ComplianceStatus,
    pub priority: Priority,
    /// Completion percentage, 0..=100.
    pub progress: i32,
    pub filed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status actually stored on save. A past-due item that has not been filed or
/// approved becomes `overdue`; an overdue item whose due date moved into the
/// future reverts to `pending`.
pub fn effective_status(requested: ComplianceStatus, due_date: NaiveDate, today: NaiveDate) -> ComplianceStatus {
    match requested {
        ComplianceStatus::Filed | ComplianceStatus::Approved => requested,
        ComplianceStatus::Overdue if due_date >= today => ComplianceStatus::Pending,
        _ if due_date < today => ComplianceStatus::Overdue,
        _ => requested,
    }
}

pub fn days_overdue(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - due_date).num_days().max(0)
}

impl ComplianceItem {
    /// JSON shape returned by the API, with the computed `days_overdue`.
    pub fn to_api_json(&self, today: NaiveDate) -> Value {
        let overdue_days = match self.status {
            ComplianceStatus::Filed | ComplianceStatus::Approved => 0,
            _ => days_overdue(self.due_date, today),
        };
        let mut value = json!(self);
        value["days_overdue"] = json!(overdue_days);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn past_due_pending_becomes_overdue() {
        let today = date("2026-08-29");
        let due = date("2026-08-01");
        assert_eq!(effective_status(ComplianceStatus::Pending, due, today), ComplianceStatus::Overdue);
        assert_eq!(effective_status(ComplianceStatus::InProgress, due, today), ComplianceStatus::Overdue);
    }

    #[test]
    fn filed_and_approved_are_exempt() {
        let today = date("2026-08-29");
        let due = date("2026-08-01");
        assert_eq!(effective_status(ComplianceStatus::Filed, due, today), ComplianceStatus::Filed);
        assert_eq!(effective_status(ComplianceStatus::Approved, due, today), ComplianceStatus::Approved);
    }

    #[test]
    fn overdue_reverts_to_pending_when_due_date_moves_forward() {
        let today = date("2026-08-29");
        assert_eq!(
            effective_status(ComplianceStatus::Overdue, date("2026-09-15"), today),
            ComplianceStatus::Pending
        );
        // Still in the past: stays overdue.
        assert_eq!(
            effective_status(ComplianceStatus::Overdue, date("2026-08-01"), today),
            ComplianceStatus::Overdue
        );
        // Due today is not overdue.
        assert_eq!(
            effective_status(ComplianceStatus::Pending, today, today),
            ComplianceStatus::Pending
        );
    }

    #[test]
    fn days_overdue_is_never_negative() {
        let today = date("2026-08-29");
        assert_eq!(days_overdue(date("2026-08-27"), today), 2);
        assert_eq!(days_overdue(date("2026-09-27"), today), 0);
    }
}
