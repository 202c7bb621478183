//! Construction options handed to the toolkit with each widget.

use std::collections::BTreeMap;

use serde::Serialize;
use tabula_model::LookupOption;

/// One widget option. Serializes to the plain JSON the toolkit expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Switch(bool),
    /// List widget data source.
    Options(Vec<LookupOption>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[LookupOption]> {
        match self {
            PropertyValue::Options(options) => Some(options),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        PropertyValue::Text(text.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(on: bool) -> Self {
        PropertyValue::Switch(on)
    }
}

impl From<Vec<LookupOption>> for PropertyValue {
    fn from(options: Vec<LookupOption>) -> Self {
        PropertyValue::Options(options)
    }
}

/// Named options for one widget, kept in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, PropertyValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn options(&self, key: &str) -> Option<&[LookupOption]> {
        self.get(key).and_then(PropertyValue::as_options)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bag_serializes_as_plain_options() {
        let bag = PropertyBag::new()
            .with("placeholder", "Name")
            .with("showClearButton", true)
            .with("dataSource", vec![LookupOption::plain("M")]);
        assert_eq!(
            serde_json::to_value(&bag).unwrap(),
            json!({
                "dataSource": [{"name": "M", "uid": "M"}],
                "placeholder": "Name",
                "showClearButton": true
            })
        );
        assert_eq!(bag.options("dataSource").map(<[_]>::len), Some(1));
        assert_eq!(bag.options("placeholder"), None);
    }
}
