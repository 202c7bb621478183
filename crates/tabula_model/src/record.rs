use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the primary key every record and row view carries.
pub const PRIMARY_KEY: &str = "uid";

/// A row as bound to the tabular control: grid field -> cell value.
///
/// Dotted column paths are stored nested under their first segment, so the
/// column `customer.name` lands at `row["customer"]["name"]`.
pub type RowView = Map<String, Value>;

/// Returns the primary key of a row view, if present.
pub fn row_key(row: &RowView) -> Option<&str> {
    row.get(PRIMARY_KEY).and_then(Value::as_str)
}

/// One persisted record of a modeled type.
///
/// Related records are embedded as JSON objects carrying their own `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub uid: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key: String = key.into();
        let value: Value = value.into();
        if key == PRIMARY_KEY {
            if let Some(uid) = value.as_str() {
                self.uid = uid.to_string();
            }
            return;
        }
        self.fields.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Reads a possibly dotted path, walking into embedded related records.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let head = segments.next()?;
        if head == PRIMARY_KEY {
            return Some(Value::String(self.uid.clone()));
        }
        let mut current = self.fields.get(head)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Builds the grid row for the given column paths, always including the key.
    pub fn row_view<S: AsRef<str>>(&self, paths: &[S]) -> RowView {
        let mut row = RowView::new();
        row.insert(PRIMARY_KEY.to_string(), Value::String(self.uid.clone()));
        for path in paths {
            let path = path.as_ref();
            let value = self.value_at(path).unwrap_or(Value::Null);
            let segments: Vec<&str> = path.split('.').collect();
            insert_path(&mut row, &segments, value);
        }
        row
    }

    /// Row view holding every field as-is.
    pub fn full_row(&self) -> RowView {
        let mut row = self.fields.clone();
        row.insert(PRIMARY_KEY.to_string(), Value::String(self.uid.clone()));
        row
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.full_row())
    }

    pub fn from_row(row: &RowView) -> Option<Self> {
        let uid = row_key(row)?.to_string();
        let mut fields = row.clone();
        fields.remove(PRIMARY_KEY);
        Some(Self { uid, fields })
    }
}

fn insert_path(target: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                insert_path(nested, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_view_nests_dotted_paths() {
        let record = Record::new("o1")
            .with("number", "SO-1")
            .with("customer", json!({"uid": "c1", "name": "Acme", "city": "Oslo"}));

        let row = record.row_view(&["number", "customer.name"]);
        assert_eq!(row.get("uid"), Some(&json!("o1")));
        assert_eq!(row.get("number"), Some(&json!("SO-1")));
        assert_eq!(row.get("customer"), Some(&json!({"name": "Acme"})));
    }

    #[test]
    fn test_missing_path_is_null() {
        let record = Record::new("o1");
        let row = record.row_view(&["customer.name"]);
        assert_eq!(row.get("customer"), Some(&json!({"name": null})));
    }

    #[test]
    fn test_set_uid_through_key() {
        let mut record = Record::new("");
        record.set("uid", "x1");
        assert_eq!(record.uid, "x1");
        assert!(record.get("uid").is_none());
    }
}
