use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A firm-scoped role with a flat set of `resource:action` permission strings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub firm_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Permission strings are `resource:action`, e.g. `clients:read`.
pub fn is_valid_permission(s: &str) -> bool {
    match s.split_once(':') {
        Some((resource, action)) => {
            !resource.is_empty()
                && !action.is_empty()
                && s.chars().all(|c| c.is_ascii_lowercase() || c == ':' || c == '_' || c == '-')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_string_format() {
        assert!(is_valid_permission("clients:read"));
        assert!(is_valid_permission("audit:export"));
        assert!(is_valid_permission("tally:import"));
        assert!(!is_valid_permission("clients"));
        assert!(!is_valid_permission(":read"));
        assert!(!is_valid_permission("clients:"));
        assert!(!is_valid_permission("Clients:Read"));
        assert!(!is_valid_permission("clients:read; DROP"));
    }
}
