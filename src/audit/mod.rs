use serde_json::Value;
use uuid::Uuid;

use crate::db::{self, DbError};
use crate::models::AuditLog;

/// Best-effort audit write. A failed audit insert must never fail the
/// operation it describes, so errors are logged and swallowed here.
pub async fn record(
    firm_id: Uuid,
    user_id: Uuid,
    action: &str,
    entity_type: &str,
    entity_id: Option<Uuid>,
    details: Value,
) {
    if let Err(e) = try_record(firm_id, user_id, action, entity_type, entity_id, details).await {
        tracing::warn!("audit write failed for action '{}': {}", action, e);
    }
}

async fn try_record(
    firm_id: Uuid,
    user_id: Uuid,
    action: &str,
    entity_type: &str,
    entity_id: Option<Uuid>,
    details: Value,
) -> Result<(), DbError> {
    let pool = db::pool().await?;
    sqlx::query(
        "INSERT INTO audit_logs (firm_id, user_id, action, entity_type, entity_id, details)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(firm_id)
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(details)
    .execute(pool)
    .await?;
    Ok(())
}

pub const CSV_HEADER: &[&str] =
    &["id", "created_at", "user_id", "action", "entity_type", "entity_id", "details"];

/// Render audit rows as CSV: header line plus one line per row, every field
/// wrapped in double quotes with embedded quotes doubled.
pub fn to_csv(rows: &[AuditLog]) -> String {
    let mut out = String::new();
    push_line(&mut out, CSV_HEADER.iter().map(|s| s.to_string()));
    for row in rows {
        push_line(
            &mut out,
            [
                row.id.to_string(),
                row.created_at.to_rfc3339(),
                row.user_id.to_string(),
                row.action.clone(),
                row.entity_type.clone(),
                row.entity_id.map(|id| id.to_string()).unwrap_or_default(),
                row.details.to_string(),
            ]
            .into_iter(),
        );
    }
    out
}

fn push_line(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn log(action: &str, details: Value) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            firm_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            action: action.to_string(),
            entity_type: "client".to_string(),
            entity_id: Some(Uuid::new_v4()),
            details,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn csv_has_header_plus_one_line_per_row() {
        let rows = vec![log("clients:create", json!({})), log("clients:update", json!({}))];
        let csv = to_csv(&rows);
        assert_eq!(csv.lines().count(), rows.len() + 1);
        assert!(csv.starts_with("\"id\",\"created_at\""));
    }

    #[test]
    fn every_field_is_quoted_and_quotes_are_doubled() {
        let rows = vec![log("clients:update", json!({"name": "Shah \"and\" Co, LLP"}))];
        let csv = to_csv(&rows);
        let data_line = csv.lines().nth(1).unwrap();
        // Seven fields, each starting and ending with a quote.
        let fields: Vec<&str> = data_line.split("\",\"").collect();
        assert_eq!(fields.len(), CSV_HEADER.len());
        assert!(data_line.starts_with('"') && data_line.ends_with('"'));
        // The embedded quotes around `and` survive, doubled.
        assert!(data_line.contains("\"\"and\"\""));
    }

    #[test]
    fn empty_export_is_header_only() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}
