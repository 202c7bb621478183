use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Semantic type of a modeled field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Number,
    Integer,
    Boolean,
    Date,
    DateTime,
    Time,
    Uid,
    Object,
    Enumeration,
    Files,
    Signature,
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Uid => "uid",
            FieldType::Object => "object",
            FieldType::Enumeration => "enumeration",
            FieldType::Files => "files",
            FieldType::Signature => "signature",
        }
    }

    /// Column type understood by the tabular control.
    pub fn grid_type(&self) -> &'static str {
        match self {
            FieldType::Number | FieldType::Integer => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime | FieldType::Time => "dateTime",
            FieldType::Object | FieldType::Files => "object",
            _ => "string",
        }
    }

    /// Default display format for grid cells of this type.
    pub fn grid_format(&self) -> Option<&'static str> {
        match self {
            FieldType::Number => Some("N2"),
            FieldType::Integer => Some("N0"),
            FieldType::Date => Some("dd/MM/yyyy"),
            FieldType::DateTime => Some("dd/MM/yyyy hh:mm a"),
            FieldType::Time => Some("hh:mm a"),
            _ => None,
        }
    }
}

/// What a model member name refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDescriptor {
    Attribute { field_type: FieldType },
    Computed { field_type: FieldType },
    Relationship { target: String },
}

impl FieldDescriptor {
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldDescriptor::Attribute { field_type } | FieldDescriptor::Computed { field_type } => {
                Some(*field_type)
            }
            FieldDescriptor::Relationship { .. } => None,
        }
    }
}

/// Metadata of one modeled record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    /// Member used to label the record when it is referenced from elsewhere.
    pub title: String,
    #[serde(default)]
    pub fields: IndexMap<String, FieldDescriptor>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: "name".to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), FieldDescriptor::Attribute { field_type });
        self
    }

    pub fn computed(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), FieldDescriptor::Computed { field_type });
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.fields.insert(
            name.into(),
            FieldDescriptor::Relationship {
                target: target.into(),
            },
        );
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, FieldType)> {
        self.fields.iter().filter_map(|(name, field)| match field {
            FieldDescriptor::Attribute { field_type } => Some((name, *field_type)),
            _ => None,
        })
    }

    pub fn computed_fields(&self) -> impl Iterator<Item = (&String, FieldType)> {
        self.fields.iter().filter_map(|(name, field)| match field {
            FieldDescriptor::Computed { field_type } => Some((name, *field_type)),
            _ => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = (&String, &str)> {
        self.fields.iter().filter_map(|(name, field)| match field {
            FieldDescriptor::Relationship { target } => Some((name, target.as_str())),
            _ => None,
        })
    }
}

/// Read access to the metadata of every known model.
pub trait SchemaCatalog {
    fn schema(&self, model: &str) -> Option<&ModelSchema>;
}

impl SchemaCatalog for IndexMap<String, ModelSchema> {
    fn schema(&self, model: &str) -> Option<&ModelSchema> {
        self.get(model)
    }
}
