use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form column/value payload for an insert or a partial update.
/// The core does not validate entity-specific attributes.
pub type Row = Map<String, Value>;

/// The authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One row of a domain entity table.
///
/// `owner_id` is set exactly once at creation time from the active
/// [`Principal`] and never changes afterwards. A parent reference, when
/// the entity type declares one, lives in `fields` under its column
/// name (`portfolio_id`, `programme_id`, or `project_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Row,
}

impl Record {
    /// Looks up an entity-specific attribute by column name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the parent reference stored under `parent_field`, if any.
    pub fn parent(&self, parent_field: &str) -> Option<&str> {
        self.fields.get(parent_field).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change notification delivered on a table channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: String,
    /// Row state after the change. Absent for deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Record>,
    /// Row state before the change. Absent for inserts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Record>,
}

/// Discriminated outcome of a session operation. Session operations
/// never surface a raw error to the caller; failures are folded into
/// the `Failure` variant.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Success { principal: Option<Principal> },
    Failure { message: String },
}

// Serialized as `{"ok": true, "principal": ...}` / `{"ok": false,
// "message": ...}`, the shape UI code branches on.
impl Serialize for SessionOutcome {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::Success { principal } => {
                map.serialize_entry("ok", &true)?;
                if let Some(principal) = principal {
                    map.serialize_entry("principal", principal)?;
                }
            }
            Self::Failure { message } => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("message", message)?;
            }
        }
        map.end()
    }
}

impl SessionOutcome {
    pub fn success(principal: Option<Principal>) -> Self {
        Self::Success { principal }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The principal payload carried by a successful sign-up or sign-in.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Success { principal } => principal.as_ref(),
            Self::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(fields: Row) -> Record {
        Record {
            id: "r1".to_string(),
            owner_id: "u1".to_string(),
            created_at: Utc::now(),
            fields,
        }
    }

    #[test]
    fn record_parent_reads_string_field() {
        let mut fields = Row::new();
        fields.insert("project_id".to_string(), json!("p9"));
        let record = record_with(fields);

        assert_eq!(record.parent("project_id"), Some("p9"));
        assert_eq!(record.parent("portfolio_id"), None);
    }

    #[test]
    fn record_serializes_fields_inline() {
        let mut fields = Row::new();
        fields.insert("name".to_string(), json!("Q1 Plan"));
        let value = serde_json::to_value(record_with(fields)).unwrap();

        assert_eq!(value["name"], "Q1 Plan");
        assert_eq!(value["owner_id"], "u1");
        assert!(value.get("fields").is_none());
    }

    #[test]
    fn outcome_failure_carries_message() {
        let outcome = SessionOutcome::failure("invalid credentials");
        assert!(!outcome.is_success());
        assert!(outcome.principal().is_none());
    }

    #[test]
    fn outcome_serializes_with_boolean_tag() {
        let success = serde_json::to_value(SessionOutcome::success(None)).unwrap();
        assert_eq!(success["ok"], json!(true));
        assert!(success.get("principal").is_none());

        let failure = serde_json::to_value(SessionOutcome::failure("bad")).unwrap();
        assert_eq!(failure["ok"], json!(false));
        assert_eq!(failure["message"], "bad");
    }
}
