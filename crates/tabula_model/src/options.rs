use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{PRIMARY_KEY, Record, RowView};

/// One selectable entry of a dropdown or lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupOption {
    /// Display text.
    pub name: String,
    /// Identifier stored by the widget.
    pub uid: String,
}

impl LookupOption {
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
        }
    }

    /// Plain string option: the text doubles as the identifier.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            name: text.clone(),
            uid: text,
        }
    }

    /// Builds an option from a row view, reading the display text from `text_field`.
    ///
    /// A dotted text field reads the first segment only, matching how row views
    /// nest related columns.
    pub fn from_row(row: &RowView, text_field: &str) -> Option<Self> {
        let uid = row.get(PRIMARY_KEY)?.as_str()?.to_string();
        let key = text_field.split('.').next().unwrap_or(text_field);
        let name = row.get(key).map(display_text).unwrap_or_default();
        Some(Self { name, uid })
    }

    pub fn from_record(record: &Record, text_field: &str) -> Self {
        let name = record.value_at(text_field).map(|v| display_text(&v)).unwrap_or_default();
        Self {
            name,
            uid: record.uid.clone(),
        }
    }
}

/// Renders a cell value as option text.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => map.values().map(display_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}
