use std::collections::BTreeMap;

use serde::Serialize;
use tabula_forms::GridColumn;
use tabula_model::{EditSettings, GridMode, RowView, ToolbarItem};

/// Subtracted from the measured container height to leave room for the
/// grid's own header and footer.
pub const GRID_HEIGHT_OFFSET: i32 = 25;

/// Page size used when paging is off, large enough to show every row.
pub const UNPAGED_PAGE_SIZE: usize = 1_000_000;

/// Page size used when paging is on but the view does not name one.
pub const DEFAULT_PAGE_SIZE: usize = 12;

pub const CHECKBOX_COLUMN_WIDTH: u32 = 30;

/// Name of the capability switch a mode turns on, if it has one.
///
/// `Toolbar`, `Edit` and `ForeignKey` shape other options instead.
pub fn mode_switch(mode: GridMode) -> Option<&'static str> {
    match mode {
        GridMode::Sort => Some("allowSorting"),
        GridMode::Filter => Some("allowFiltering"),
        GridMode::Group => Some("allowGrouping"),
        GridMode::Page => Some("allowPaging"),
        GridMode::InfiniteScroll => Some("enableInfiniteScrolling"),
        GridMode::ExcelExport => Some("allowExcelExport"),
        GridMode::PdfExport => Some("allowPdfExport"),
        GridMode::Reorder => Some("allowReordering"),
        GridMode::Resize => Some("allowResizing"),
        GridMode::RowDD => Some("allowRowDragAndDrop"),
        GridMode::Selection => Some("allowSelection"),
        GridMode::Toolbar | GridMode::Edit | GridMode::ForeignKey => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSettings {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            kind: "Menu".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub mode: String,
    pub checkbox_only: bool,
    pub persist_selection: bool,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            kind: "Multiple".to_string(),
            mode: "Row".to_string(),
            checkbox_only: true,
            persist_selection: true,
        }
    }
}

/// Everything the tabular control is constructed with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
    pub columns: Vec<GridColumn>,
    pub data_source: Vec<RowView>,
    #[serde(flatten)]
    pub switches: BTreeMap<String, bool>,
    pub page_settings: PageSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_settings: Option<EditSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_settings: Option<FilterSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_settings: Option<SelectionSettings>,
    pub toolbar: Vec<ToolbarItem>,
    pub show_column_menu: bool,
    pub allow_text_wrap: bool,
    pub width: String,
    pub height: String,
}

impl GridOptions {
    /// Options with every mode in `modes` applied and no columns yet.
    pub fn for_modes(modes: &[GridMode], page_size: Option<usize>, edit: Option<EditSettings>) -> Self {
        let has = |mode: GridMode| modes.contains(&mode);
        let switches = modes
            .iter()
            .filter_map(|mode| mode_switch(*mode))
            .map(|name| (name.to_string(), true))
            .collect();
        let page_size = if has(GridMode::Page) {
            page_size.unwrap_or(DEFAULT_PAGE_SIZE)
        } else {
            UNPAGED_PAGE_SIZE
        };

        Self {
            columns: Vec::new(),
            data_source: Vec::new(),
            switches,
            page_settings: PageSettings { page_size },
            edit_settings: has(GridMode::Edit).then(|| edit.unwrap_or_default()),
            filter_settings: has(GridMode::Filter).then(FilterSettings::default),
            selection_settings: has(GridMode::Selection).then(SelectionSettings::default),
            toolbar: Vec::new(),
            show_column_menu: true,
            allow_text_wrap: true,
            width: "100%".to_string(),
            height: "100%".to_string(),
        }
    }

    pub fn switch(&self, name: &str) -> bool {
        self.switches.get(name).copied().unwrap_or(false)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_off_uses_unpaged_size() {
        let options = GridOptions::for_modes(&GridMode::DEFAULTS, Some(50), None);
        assert_eq!(options.page_settings.page_size, UNPAGED_PAGE_SIZE);
        assert!(options.switch("allowSorting"));
        assert!(options.switch("enableInfiniteScrolling"));
        assert!(!options.switch("allowPaging"));
        assert!(options.edit_settings.is_some());
        assert!(options.selection_settings.is_some());
    }

    #[test]
    fn test_paging_on_uses_view_size() {
        let options = GridOptions::for_modes(&[GridMode::Page], Some(50), None);
        assert_eq!(options.page_settings.page_size, 50);
        assert!(options.edit_settings.is_none());
        assert!(options.filter_settings.is_none());
    }

    #[test]
    fn test_switches_flatten_into_json() {
        let options = GridOptions::for_modes(&[GridMode::Filter], None, None);
        let json = options.to_json();
        assert_eq!(json["allowFiltering"], serde_json::json!(true));
        assert_eq!(json["filterSettings"]["type"], "Menu");
        assert_eq!(json["pageSettings"]["pageSize"], 1_000_000);
    }
}
