//! Domain values held by controls and the raw values widgets speak.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabula_model::{LookupOption, PRIMARY_KEY};

/// Where an uploaded file was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub bucket: String,
    pub key: String,
}

/// Descriptor of a file that reached object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub storage: StorageRef,
}

/// A file picked in the uploader, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub raw: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, raw: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: raw.len() as u64,
            mime_type: mime_type.into(),
            raw,
        }
    }
}

/// Value of a field as the application sees it.
///
/// `Timestamp` is the widget-native epoch-millisecond shape; date and time
/// controls accept it on input and normalize it away.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(i64),
    Option(LookupOption),
    Options(Vec<LookupOption>),
    Files(Vec<UploadedFile>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_option(&self) -> Option<&LookupOption> {
        match self {
            FieldValue::Option(option) => Some(option),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[LookupOption]> {
        match self {
            FieldValue::Options(options) => Some(options),
            _ => None,
        }
    }

    pub fn as_files(&self) -> Option<&[UploadedFile]> {
        match self {
            FieldValue::Files(files) => Some(files),
            _ => None,
        }
    }

    /// Record representation; dates and times become ISO strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            FieldValue::Timestamp(ms) => Value::from(*ms),
            FieldValue::Option(option) => serde_json::to_value(option).unwrap_or(Value::Null),
            FieldValue::Options(options) => serde_json::to_value(options).unwrap_or(Value::Null),
            FieldValue::Files(files) => serde_json::to_value(files).unwrap_or(Value::Null),
        }
    }

    /// Best-effort reading of a record value; controls normalize the result further.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Object(map) => option_from_map(map)
                .map(FieldValue::Option)
                .unwrap_or_default(),
            Value::Array(items) => {
                if let Ok(files) = serde_json::from_value::<Vec<UploadedFile>>(value.clone()) {
                    if !files.is_empty() {
                        return FieldValue::Files(files);
                    }
                }
                let options: Vec<LookupOption> = items
                    .iter()
                    .filter_map(|item| item.as_object().and_then(option_from_map))
                    .collect();
                FieldValue::Options(options)
            }
        }
    }
}

fn option_from_map(map: &Map<String, Value>) -> Option<LookupOption> {
    let uid = map.get(PRIMARY_KEY)?.as_str()?;
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(LookupOption::new(name, uid))
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl From<LookupOption> for FieldValue {
    fn from(option: LookupOption) -> Self {
        FieldValue::Option(option)
    }
}

impl From<Vec<LookupOption>> for FieldValue {
    fn from(options: Vec<LookupOption>) -> Self {
        FieldValue::Options(options)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Raw value stored inside a toolkit widget.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WidgetValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Checked(bool),
    /// Epoch milliseconds.
    Timestamp(i64),
    Id(String),
    Ids(Vec<String>),
}

impl WidgetValue {
    /// Whether a change event carrying this value reports an actual value.
    pub fn is_present(&self) -> bool {
        match self {
            WidgetValue::Empty => false,
            WidgetValue::Text(s) | WidgetValue::Id(s) => !s.is_empty(),
            WidgetValue::Ids(ids) => !ids.is_empty(),
            _ => true,
        }
    }

    /// Text form of the value, used in conversion error messages.
    pub fn describe(&self) -> String {
        match self {
            WidgetValue::Empty => String::new(),
            WidgetValue::Text(s) | WidgetValue::Id(s) => s.clone(),
            WidgetValue::Number(n) => n.to_string(),
            WidgetValue::Checked(b) => b.to_string(),
            WidgetValue::Timestamp(ms) => ms.to_string(),
            WidgetValue::Ids(ids) => ids.join(","),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_reads_related_record() {
        let value = FieldValue::from_json(&json!({"uid": "c1", "name": "Acme", "city": "Oslo"}));
        assert_eq!(value, FieldValue::Option(LookupOption::new("Acme", "c1")));
    }

    #[test]
    fn test_from_json_reads_file_list() {
        let value = FieldValue::from_json(&json!([{
            "name": "a.pdf", "size": 3, "type": "application/pdf",
            "storage": {"type": "aws_s3", "bucket": "b", "key": "t/p/1/a.pdf"}
        }]));
        assert_eq!(value.as_files().map(|f| f.len()), Some(1));
    }

    #[test]
    fn test_date_to_json_is_iso() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(FieldValue::Date(date).to_json(), json!("2024-03-15"));
    }

    #[test]
    fn test_presence() {
        assert!(!WidgetValue::Empty.is_present());
        assert!(!WidgetValue::Text(String::new()).is_present());
        assert!(WidgetValue::Checked(false).is_present());
        assert!(WidgetValue::Number(0.0).is_present());
    }
}
