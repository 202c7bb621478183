use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelResult;
use crate::schema::FieldType;

/// Capabilities a grid view may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridMode {
    Sort,
    Filter,
    Group,
    Page,
    InfiniteScroll,
    ExcelExport,
    PdfExport,
    Reorder,
    Resize,
    RowDD,
    Selection,
    Toolbar,
    Edit,
    ForeignKey,
}

impl GridMode {
    pub const DEFAULTS: [GridMode; 7] = [
        GridMode::Sort,
        GridMode::Filter,
        GridMode::InfiniteScroll,
        GridMode::Toolbar,
        GridMode::Edit,
        GridMode::ForeignKey,
        GridMode::Selection,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            GridMode::Sort => "Sort",
            GridMode::Filter => "Filter",
            GridMode::Group => "Group",
            GridMode::Page => "Page",
            GridMode::InfiniteScroll => "InfiniteScroll",
            GridMode::ExcelExport => "ExcelExport",
            GridMode::PdfExport => "PdfExport",
            GridMode::Reorder => "Reorder",
            GridMode::Resize => "Resize",
            GridMode::RowDD => "RowDD",
            GridMode::Selection => "Selection",
            GridMode::Toolbar => "Toolbar",
            GridMode::Edit => "Edit",
            GridMode::ForeignKey => "ForeignKey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolbarAlign {
    #[default]
    Left,
    Right,
}

/// One toolbar action descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip_text: Option<String>,
    #[serde(default)]
    pub align: ToolbarAlign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl ToolbarItem {
    pub const TITLE: &'static str = "title";
    pub const SEARCH: &'static str = "search-on";
    pub const ADD: &'static str = "add";

    pub fn action(id: impl Into<String>, icon: &str, tooltip: &str) -> Self {
        Self {
            id: id.into(),
            prefix_icon: Some(icon.to_string()),
            tooltip_text: Some(tooltip.to_string()),
            align: ToolbarAlign::Right,
            ..Default::default()
        }
    }

    /// Non-interactive title item rendered at the left of the toolbar.
    pub fn title(text: &str) -> Self {
        Self {
            id: Self::TITLE.to_string(),
            template: Some(format!("<div class=\"h4 a-grid-view-title\">{}</div>", text)),
            align: ToolbarAlign::Left,
            ..Default::default()
        }
    }

    pub fn defaults() -> Vec<ToolbarItem> {
        vec![
            ToolbarItem::action(Self::SEARCH, "e-search", "Search"),
            ToolbarItem::action(Self::ADD, "e-add", "Add"),
        ]
    }

    /// Identifier used to find the rendered button of this item.
    pub fn button_key(&self) -> &str {
        self.tooltip_text.as_deref().unwrap_or(self.text.as_str())
    }
}

/// Inline edit behavior of the tabular control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSettings {
    pub allow_adding: bool,
    pub allow_editing: bool,
    pub allow_deleting: bool,
    pub mode: String,
    pub allow_edit_on_dbl_click: bool,
    pub show_confirm_dialog: bool,
    pub show_delete_confirm_dialog: bool,
    pub allow_scrolling: bool,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            allow_adding: true,
            allow_editing: true,
            allow_deleting: true,
            mode: "Dialog".to_string(),
            allow_edit_on_dbl_click: true,
            show_confirm_dialog: true,
            show_delete_confirm_dialog: true,
            allow_scrolling: true,
        }
    }
}

/// Per-row action button declared in place of a data column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowActionSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

/// A column as declared in a view configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_action: Option<RowActionSpec>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }
}

/// Declarative description of one grid view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    pub model: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modes: Option<Vec<GridMode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_settings: Option<EditSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolbar: Option<Vec<ToolbarItem>>,
}

impl ViewConfig {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Parses a stored view; stored configs may use single-quoted JSON.
    pub fn from_stored(raw: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(&raw.replace('\'', "\""))?)
    }

    /// Data column paths, excluding row-action columns.
    pub fn column_paths(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.row_action.is_none())
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Free-text search handed to the backing model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub text: String,
}

impl SearchQuery {
    pub fn any(text: impl Into<String>) -> Self {
        Self {
            field: None,
            text: text.into(),
        }
    }

    pub fn on(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            text: text.into(),
        }
    }
}

/// Equality filters keyed by field path.
pub type Filters = Map<String, Value>;

/// Application-wide grid defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridSettings {
    #[serde(default)]
    pub modes: Option<Vec<GridMode>>,
    #[serde(default)]
    pub toolbar_items: Option<Vec<ToolbarItem>>,
    #[serde(default, rename = "pageSize")]
    pub page_size: Option<usize>,
}

impl GridSettings {
    pub fn from_json(raw: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
