//! Column resolution against model metadata.
//!
//! A column path is resolved segment by segment: the first segment against
//! the base model, every following segment against the model named by the
//! relationship before it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ModelError, ModelResult};
use crate::schema::{FieldDescriptor, FieldType, SchemaCatalog};
use crate::text::capwords;
use crate::view::ColumnSpec;

/// Alias resolving to a model's designated title member.
pub const TITLE_ALIAS: &str = "_title";
pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

/// A fully resolved grid or form column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub field_path: String,
    pub label: String,
    pub semantic_type: FieldType,
    pub display_format: Option<String>,
    pub width: u32,
}

impl ColumnSchema {
    /// Row view key holding this column's value.
    pub fn grid_field(&self) -> &str {
        self.field_path.split('.').next().unwrap_or(&self.field_path)
    }

    pub fn is_nested(&self) -> bool {
        self.field_path.contains('.')
    }
}

/// Where a path ended up after walking relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Model owning the final member.
    pub model: String,
    /// Final member name.
    pub name: String,
    /// The path with title aliases expanded.
    pub path: String,
    pub field_type: FieldType,
}

pub fn resolve_field<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    model: &str,
    path: &str,
) -> ModelResult<ResolvedField> {
    resolve_in(catalog, model, path, &mut Vec::new())
}

/// `titled` holds the models whose title was already expanded on this path;
/// meeting one again means the titles point at each other.
fn resolve_in<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    model: &str,
    path: &str,
    titled: &mut Vec<String>,
) -> ModelResult<ResolvedField> {
    let schema = catalog
        .schema(model)
        .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;
    let path = if path == TITLE_ALIAS {
        if titled.iter().any(|seen| seen == model) {
            debug!(model, "title cycle");
            return Err(ModelError::unresolved(model, TITLE_ALIAS));
        }
        titled.push(model.to_string());
        schema.title.as_str()
    } else {
        path
    };
    if path == TITLE_ALIAS {
        return Err(ModelError::unresolved(model, path));
    }

    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    match (schema.field(head), rest) {
        // Attributes may hold structured values; a deeper path stays on the attribute.
        (Some(FieldDescriptor::Attribute { field_type }), _) => Ok(ResolvedField {
            model: model.to_string(),
            name: head.to_string(),
            path: path.to_string(),
            field_type: *field_type,
        }),
        (Some(FieldDescriptor::Computed { field_type }), None) => Ok(ResolvedField {
            model: model.to_string(),
            name: head.to_string(),
            path: path.to_string(),
            field_type: *field_type,
        }),
        (Some(FieldDescriptor::Relationship { target }), rest) => {
            let inner = resolve_in(catalog, target, rest.unwrap_or(TITLE_ALIAS), titled)?;
            Ok(ResolvedField {
                path: format!("{}.{}", head, inner.path),
                ..inner
            })
        }
        _ => Err(ModelError::unresolved(model, path)),
    }
}

/// One column per attribute, per computed member and per relationship.
pub fn derive_columns<C: SchemaCatalog + ?Sized>(catalog: &C, model: &str) -> ModelResult<Vec<ColumnSpec>> {
    let schema = catalog
        .schema(model)
        .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;

    let mut columns: Vec<ColumnSpec> = schema
        .attributes()
        .chain(schema.computed_fields())
        .map(|(name, _)| ColumnSpec::new(name.clone()).label(capwords(name)))
        .collect();

    for (name, target) in schema.relationships() {
        let title = resolve_field(catalog, target, TITLE_ALIAS)?;
        columns.push(ColumnSpec::new(format!("{}.{}", name, title.path)).label(capwords(name)));
    }
    debug!(model, columns = columns.len(), "columns derived from metadata");
    Ok(columns)
}

/// Resolves explicit columns, or derives them from metadata when none are given.
///
/// Row-action columns carry no data and are skipped.
pub fn resolve_columns<C: SchemaCatalog + ?Sized>(
    catalog: &C,
    model: &str,
    explicit: Option<&[ColumnSpec]>,
) -> ModelResult<Vec<ColumnSchema>> {
    let specs = match explicit {
        Some(columns) => columns.to_vec(),
        None => derive_columns(catalog, model)?,
    };

    specs
        .iter()
        .filter(|spec| spec.row_action.is_none())
        .map(|spec| -> ModelResult<ColumnSchema> {
            let resolved = resolve_field(catalog, model, &spec.name)?;
            let semantic_type = spec.field_type.unwrap_or(resolved.field_type);
            let head = spec.name.split('.').next().unwrap_or(&spec.name);
            Ok(ColumnSchema {
                field_path: spec.name.clone(),
                label: spec.label.clone().unwrap_or_else(|| capwords(head)),
                semantic_type,
                display_format: spec
                    .format
                    .clone()
                    .or_else(|| semantic_type.grid_format().map(str::to_string)),
                width: spec.width.unwrap_or(DEFAULT_COLUMN_WIDTH),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;
    use indexmap::IndexMap;

    fn catalog() -> IndexMap<String, ModelSchema> {
        let mut catalog = IndexMap::new();
        catalog.insert(
            "Region".to_string(),
            ModelSchema::new("Region").attribute("name", FieldType::String),
        );
        catalog.insert(
            "Customer".to_string(),
            ModelSchema::new("Customer")
                .title("region.name")
                .attribute("name", FieldType::String)
                .relationship("region", "Region"),
        );
        catalog
    }

    #[test]
    fn test_title_recurses_through_dotted_title() {
        let catalog = catalog();
        let resolved = resolve_field(&catalog, "Customer", TITLE_ALIAS).unwrap();
        assert_eq!(resolved.path, "region.name");
        assert_eq!(resolved.model, "Region");
    }

    #[test]
    fn test_bare_relationship_resolves_to_title() {
        let catalog = catalog();
        let resolved = resolve_field(&catalog, "Customer", "region").unwrap();
        assert_eq!(resolved.path, "region.name");
    }

    #[test]
    fn test_computed_member_has_no_children() {
        let mut catalog = catalog();
        catalog.insert(
            "Order".to_string(),
            ModelSchema::new("Order").computed("total", FieldType::Number),
        );
        let err = resolve_field(&catalog, "Order", "total.amount").unwrap_err();
        assert!(matches!(err, ModelError::UnresolvedField { .. }));
    }

    #[test]
    fn test_titles_pointing_at_each_other_fail() {
        let mut catalog = IndexMap::new();
        catalog.insert("A".to_string(), ModelSchema::new("A").title("b").relationship("b", "B"));
        catalog.insert("B".to_string(), ModelSchema::new("B").title("a").relationship("a", "A"));

        let err = resolve_columns(&catalog, "A", None).unwrap_err();
        assert!(matches!(err, ModelError::UnresolvedField { .. }));
        assert!(resolve_field(&catalog, "B", TITLE_ALIAS).is_err());
    }

    #[test]
    fn test_self_titled_relationship_fails() {
        let mut catalog = IndexMap::new();
        catalog.insert(
            "Employee".to_string(),
            ModelSchema::new("Employee").title("manager").relationship("manager", "Employee"),
        );
        let err = resolve_field(&catalog, "Employee", "manager").unwrap_err();
        assert!(matches!(err, ModelError::UnresolvedField { .. }));
    }
}
