//! The grid view: a tabular control bound to one backing model.
//!
//! Lifecycle is `Uninitialized -> Built -> Shown -> Destroyed`. `show` may
//! be called again to reload rows. Once destroyed every operation fails
//! with [`GridError::Destroyed`].
//!
//! Row mutations only happen after the backing store accepted the change,
//! so a failed action leaves the rows as they were.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tabula_forms::{ElementId, GridColumn, TextAlign};
use tabula_model::text::camel_to_title;
use tabula_model::{
    derive_columns, resolve_columns, row_key, AppContext, ColumnSchema, EditFormLauncher, FieldType,
    Filters, FormAction, FormRequest, GridMode, Record, RowView, SearchQuery, ToolbarItem,
    ViewConfig, PRIMARY_KEY,
};
use tracing::{debug, info, warn};

use crate::control::{GridToolkit, TabularControl};
use crate::errors::{GridError, GridResult};
use crate::options::{GridOptions, CHECKBOX_COLUMN_WIDTH, GRID_HEIGHT_OFFSET};
use crate::schema_form::SchemaForm;

const GRID_CONTAINER_ID: &str = "pm-grid-container";

/// Where a grid view gets its configuration from.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSource {
    /// Columns derived from the model metadata.
    Model(String),
    /// A view stored by name in the stored views model.
    Named { model: String, view: String },
    Config(ViewConfig),
}

/// Construction parameters of a [`GridView`].
#[derive(Debug, Clone)]
pub struct GridViewSpec {
    pub container: ElementId,
    pub source: ViewSource,
    pub title: Option<String>,
    pub search: Vec<SearchQuery>,
    pub filters: Filters,
    pub modes: Option<Vec<GridMode>>,
    pub toolbar: Option<Vec<ToolbarItem>>,
}

impl GridViewSpec {
    fn with_source(container: impl Into<ElementId>, source: ViewSource) -> Self {
        Self {
            container: container.into(),
            source,
            title: None,
            search: Vec::new(),
            filters: Filters::new(),
            modes: None,
            toolbar: None,
        }
    }

    pub fn for_model(container: impl Into<ElementId>, model: impl Into<String>) -> Self {
        Self::with_source(container, ViewSource::Model(model.into()))
    }

    pub fn named(container: impl Into<ElementId>, model: impl Into<String>, view: impl Into<String>) -> Self {
        Self::with_source(
            container,
            ViewSource::Named {
                model: model.into(),
                view: view.into(),
            },
        )
    }

    pub fn with_config(container: impl Into<ElementId>, config: ViewConfig) -> Self {
        Self::with_source(container, ViewSource::Config(config))
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn search(mut self, query: SearchQuery) -> Self {
        self.search.push(query);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Used when the view configuration names no modes.
    pub fn modes(mut self, modes: Vec<GridMode>) -> Self {
        self.modes = Some(modes);
        self
    }

    /// Takes precedence over the view configuration's toolbar.
    pub fn toolbar(mut self, items: Vec<ToolbarItem>) -> Self {
        self.toolbar = Some(items);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Uninitialized,
    Built,
    Shown,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    BeginEdit,
    Add,
    Delete,
    Other,
}

impl RequestType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "beginEdit" => RequestType::BeginEdit,
            "add" => RequestType::Add,
            "delete" => RequestType::Delete,
            _ => RequestType::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Begin,
    Complete,
}

/// A row action reported by the tabular control.
#[derive(Debug, Clone, PartialEq)]
pub struct GridActionEvent {
    pub request_type: RequestType,
    pub phase: ActionPhase,
    /// Affected rows; the edited row for `BeginEdit`, the selection for `Delete`.
    pub rows: Vec<RowView>,
}

impl GridActionEvent {
    pub fn complete(request_type: RequestType, rows: Vec<RowView>) -> Self {
        Self {
            request_type,
            phase: ActionPhase::Complete,
            rows,
        }
    }

    pub fn begin(request_type: RequestType, rows: Vec<RowView>) -> Self {
        Self {
            request_type,
            phase: ActionPhase::Begin,
            rows,
        }
    }
}

/// A toolbar or row action passed to a caller-supplied handler.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAction {
    pub id: String,
    pub row: Option<RowView>,
}

pub type ActionHandler = Rc<dyn Fn(&GridView, &GridAction)>;

pub fn row_action_id(column: &str) -> String {
    format!("row_action_{}", column)
}

struct GridInner {
    spec: GridViewSpec,
    state: ViewState,
    view: Option<ViewConfig>,
    title: String,
    columns: Vec<ColumnSchema>,
    options: Option<GridOptions>,
    control: Option<Box<dyn TabularControl>>,
    rows: Vec<RowView>,
    handlers: HashMap<String, ActionHandler>,
    row_actions: Vec<String>,
    search_visible: bool,
    grid_el_id: Option<ElementId>,
    height: Option<i32>,
}

struct GridCore {
    context: AppContext,
    toolkit: Rc<dyn GridToolkit>,
    fallback_form: Rc<SchemaForm>,
    inner: RefCell<GridInner>,
}

/// Handle to one grid view. Clones share the same state.
#[derive(Clone)]
pub struct GridView {
    core: Rc<GridCore>,
}

impl GridView {
    pub fn new(spec: GridViewSpec, context: AppContext, toolkit: Rc<dyn GridToolkit>) -> Self {
        let fallback_form = Rc::new(SchemaForm::new(context.clone(), toolkit.widgets()));
        let inner = GridInner {
            spec,
            state: ViewState::Uninitialized,
            view: None,
            title: String::new(),
            columns: Vec::new(),
            options: None,
            control: None,
            rows: Vec::new(),
            handlers: HashMap::new(),
            row_actions: Vec::new(),
            search_visible: true,
            grid_el_id: None,
            height: None,
        };
        Self {
            core: Rc::new(GridCore {
                context,
                toolkit,
                fallback_form,
                inner: RefCell::new(inner),
            }),
        }
    }

    fn upgrade(weak: &Weak<GridCore>) -> Option<GridView> {
        weak.upgrade().map(|core| GridView { core })
    }

    pub fn state(&self) -> ViewState {
        self.core.inner.borrow().state
    }

    pub fn container(&self) -> ElementId {
        self.core.inner.borrow().spec.container.clone()
    }

    pub fn title(&self) -> String {
        self.core.inner.borrow().title.clone()
    }

    /// The resolved view configuration, once built.
    pub fn view_config(&self) -> Option<ViewConfig> {
        self.core.inner.borrow().view.clone()
    }

    pub fn columns(&self) -> Vec<ColumnSchema> {
        self.core.inner.borrow().columns.clone()
    }

    pub fn options(&self) -> Option<GridOptions> {
        self.core.inner.borrow().options.clone()
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.core.inner.borrow().rows.clone()
    }

    /// Grid height applied by the last `show`.
    pub fn height(&self) -> Option<i32> {
        self.core.inner.borrow().height
    }

    /// Element the control was mounted into by the last `show`.
    pub fn grid_element(&self) -> Option<ElementId> {
        self.core.inner.borrow().grid_el_id.clone()
    }

    pub fn search_visible(&self) -> bool {
        self.core.inner.borrow().search_visible
    }

    /// Form opened when the model has no registered edit form.
    pub fn fallback_form(&self) -> Rc<SchemaForm> {
        Rc::clone(&self.core.fallback_form)
    }

    /// Maps a toolbar item or row action id to a handler. Mapped ids win
    /// over the built-in `add` and `search-on` behavior.
    pub fn on_action(&self, id: impl Into<String>, handler: impl Fn(&GridView, &GridAction) + 'static) {
        self.core
            .inner
            .borrow_mut()
            .handlers
            .insert(id.into(), Rc::new(handler));
    }

    fn ensure_live(&self) -> GridResult<()> {
        match self.state() {
            ViewState::Destroyed => Err(GridError::Destroyed),
            _ => Ok(()),
        }
    }

    fn model(&self) -> GridResult<String> {
        self.core
            .inner
            .borrow()
            .view
            .as_ref()
            .map(|view| view.model.clone())
            .ok_or_else(|| GridError::InvalidState("grid view is not built".to_string()))
    }

    fn resolve_view(&self, source: &ViewSource) -> GridResult<ViewConfig> {
        let context = &self.core.context;
        let mut view = match source {
            ViewSource::Model(model) => ViewConfig::for_model(model.as_str()),
            ViewSource::Named { model, view } => {
                let mut stored = context.stored_view(view)?;
                if stored.model.is_empty() {
                    stored.model = model.clone();
                }
                stored
            }
            ViewSource::Config(config) => config.clone(),
        };
        if view.columns.is_empty() {
            view.columns = derive_columns(&context.data_models, &view.model)?;
        }
        Ok(view)
    }

    /// Resolves columns, modes and toolbar and constructs the tabular
    /// control with an empty data source. Does not mount anything.
    pub fn build(&self) -> GridResult<()> {
        match self.state() {
            ViewState::Destroyed => return Err(GridError::Destroyed),
            ViewState::Uninitialized => {}
            ViewState::Built | ViewState::Shown => return Ok(()),
        }
        let spec = self.core.inner.borrow().spec.clone();
        let context = &self.core.context;

        let view = self.resolve_view(&spec.source)?;
        let columns = resolve_columns(&context.data_models, &view.model, Some(view.columns.as_slice()))?;

        let modes = view
            .modes
            .clone()
            .or(spec.modes)
            .or_else(|| context.grid_settings.modes.clone())
            .unwrap_or_else(|| GridMode::DEFAULTS.to_vec());
        let page_size = view.page_size.or(context.grid_settings.page_size);
        let mut options = GridOptions::for_modes(&modes, page_size, view.edit_settings.clone());
        options.columns = grid_columns(&view, &columns, modes.contains(&GridMode::Selection));

        let title = spec.title.unwrap_or_else(|| camel_to_title(&view.model));
        let mut toolbar = if modes.contains(&GridMode::Toolbar) {
            spec.toolbar
                .or_else(|| view.toolbar.clone())
                .or_else(|| context.grid_settings.toolbar_items.clone())
                .unwrap_or_else(ToolbarItem::defaults)
        } else {
            Vec::new()
        };
        toolbar.insert(0, ToolbarItem::title(&title));
        options.toolbar = toolbar;

        let control = self.core.toolkit.create_grid(options.clone())?;
        let row_actions = view
            .columns
            .iter()
            .filter(|c| c.row_action.is_some())
            .map(|c| row_action_id(&c.name))
            .collect();

        info!(model = %view.model, columns = columns.len(), modes = modes.len(), "grid view built");
        let mut inner = self.core.inner.borrow_mut();
        inner.view = Some(view);
        inner.title = title;
        inner.columns = columns;
        inner.options = Some(options);
        inner.control = Some(control);
        inner.row_actions = row_actions;
        inner.state = ViewState::Built;
        Ok(())
    }

    /// Fetches the rows, mounts the control and sizes it to the container.
    /// Calling it again reloads the rows.
    pub fn show(&self) -> GridResult<()> {
        self.ensure_live()?;
        if self.state() == ViewState::Uninitialized {
            self.build()?;
        }
        let (view, container, search, filters) = {
            let inner = self.core.inner.borrow();
            let view = inner
                .view
                .clone()
                .ok_or_else(|| GridError::InvalidState("grid view is not built".to_string()))?;
            (view, inner.spec.container.clone(), inner.spec.search.clone(), inner.spec.filters.clone())
        };

        let backing = self.core.context.data_models.get(&view.model)?;
        let rows = backing.get_grid_view(&view, &search, &filters, false)?;

        let widgets = self.core.toolkit.widgets();
        let height = widgets.measure_height(&container).unwrap_or(0) - GRID_HEIGHT_OFFSET;
        let grid_el_id = ElementId::generate();
        widgets.render(
            &container,
            &format!(
                r#"<div id="{}" style="height:{}px;"><div id="{}"></div></div>"#,
                GRID_CONTAINER_ID, height, grid_el_id
            ),
        )?;

        let mut inner = self.core.inner.borrow_mut();
        let toolbar = inner
            .options
            .as_ref()
            .map(|options| options.toolbar.clone())
            .unwrap_or_default();
        let control = inner
            .control
            .as_mut()
            .ok_or_else(|| GridError::InvalidState("grid control is missing".to_string()))?;
        control.set_data_source(rows.clone());
        control.append_to(&grid_el_id)?;
        for item in toolbar.iter().filter(|i| i.css_class.is_some() || i.style.is_some()) {
            control.style_toolbar_item(item.button_key(), item.css_class.as_deref(), item.style.as_deref());
        }
        info!(model = %view.model, rows = rows.len(), height, "grid view shown");
        inner.rows = rows;
        inner.grid_el_id = Some(grid_el_id);
        inner.height = Some(height);
        inner.state = ViewState::Shown;
        Ok(())
    }

    /// Releases the control and clears the container. Terminal.
    pub fn destroy(&self) -> GridResult<()> {
        self.ensure_live()?;
        let (container, was_shown) = {
            let mut inner = self.core.inner.borrow_mut();
            if let Some(mut control) = inner.control.take() {
                control.destroy();
            }
            let was_shown = inner.state == ViewState::Shown;
            inner.state = ViewState::Destroyed;
            inner.rows.clear();
            (inner.spec.container.clone(), was_shown)
        };
        if was_shown {
            self.core.toolkit.widgets().render(&container, "")?;
        }
        info!(container = %container, "grid view destroyed");
        Ok(())
    }

    fn handler(&self, id: &str) -> Option<ActionHandler> {
        self.core.inner.borrow().handlers.get(id).cloned()
    }

    /// Dispatches a toolbar click. Mapped ids go to their handler, then
    /// `add` and `search-on` fall back to the built-ins; anything else is
    /// ignored.
    pub fn toolbar_click(&self, id: &str) -> GridResult<()> {
        self.ensure_live()?;
        if let Some(handler) = self.handler(id) {
            handler(
                self,
                &GridAction {
                    id: id.to_string(),
                    row: None,
                },
            );
            return Ok(());
        }
        match id {
            ToolbarItem::ADD => self.open_edit_form(FormAction::Add, None),
            ToolbarItem::SEARCH => {
                self.toggle_search();
                Ok(())
            }
            _ => {
                debug!(id, "toolbar item has no handler");
                Ok(())
            }
        }
    }

    fn toggle_search(&self) {
        let mut inner = self.core.inner.borrow_mut();
        let visible = !inner.search_visible;
        inner.search_visible = visible;
        if let Some(control) = inner.control.as_mut() {
            control.set_toolbar_item_visible(ToolbarItem::SEARCH, visible);
        }
    }

    /// Dispatches a click inside a row. Only row-action cells do anything.
    pub fn record_click(&self, target_id: &str, row: &RowView) -> GridResult<()> {
        self.ensure_live()?;
        let is_action = self
            .core
            .inner
            .borrow()
            .row_actions
            .iter()
            .any(|id| id == target_id);
        if !is_action {
            return Ok(());
        }
        match self.handler(target_id) {
            Some(handler) => handler(
                self,
                &GridAction {
                    id: target_id.to_string(),
                    row: Some(row.clone()),
                },
            ),
            None => debug!(id = target_id, uid = ?row_key(row), "row action has no handler"),
        }
        Ok(())
    }

    /// Handles begin-edit, add and delete completions from the control.
    pub fn grid_action(&self, event: &GridActionEvent) -> GridResult<()> {
        self.ensure_live()?;
        if event.phase != ActionPhase::Complete {
            return Ok(());
        }
        match event.request_type {
            RequestType::BeginEdit | RequestType::Add => {
                if let Some(control) = self.core.inner.borrow_mut().control.as_mut() {
                    control.close_dialog();
                }
                if event.request_type == RequestType::Add {
                    return self.open_edit_form(FormAction::Add, None);
                }
                let uid = event.rows.first().and_then(row_key).map(str::to_string);
                let Some(uid) = uid else {
                    warn!("begin edit without a row key");
                    return Ok(());
                };
                let model = self.model()?;
                match self.core.context.data_models.get(&model)?.get(&uid)? {
                    Some(record) => self.open_edit_form(FormAction::Edit, Some(record)),
                    None => {
                        warn!(model = %model, uid = %uid, "edited row no longer exists");
                        Ok(())
                    }
                }
            }
            RequestType::Delete => self.delete_rows(&event.rows),
            RequestType::Other => {
                debug!("ignoring grid action");
                Ok(())
            }
        }
    }

    fn delete_rows(&self, rows: &[RowView]) -> GridResult<()> {
        let model = self.model()?;
        let backing = self.core.context.data_models.get(&model)?;
        // Vanished rows leave the grid too; only store failures keep rows.
        let mut removed = Vec::new();
        let mut deleted = 0;
        for uid in rows.iter().filter_map(row_key) {
            match backing.get(uid)? {
                Some(record) => {
                    backing.delete(&record)?;
                    deleted += 1;
                }
                None => debug!(model = %model, uid, "row already gone"),
            }
            removed.push(uid.to_string());
        }
        info!(model = %model, deleted, "grid rows deleted");
        let mut inner = self.core.inner.borrow_mut();
        inner
            .rows
            .retain(|row| !row_key(row).is_some_and(|k| removed.iter().any(|d| d == k)));
        if let Some(control) = inner.control.as_mut() {
            control.remove_records(&removed);
        }
        Ok(())
    }

    fn edit_form(&self, model: &str) -> Rc<dyn EditFormLauncher> {
        match self.core.context.forms.edit_form_for(model) {
            Some(form) => {
                debug!(model, "using registered edit form");
                form
            }
            None => {
                debug!(model, "using schema form");
                let form: Rc<dyn EditFormLauncher> = self.core.fallback_form.clone();
                form
            }
        }
    }

    /// Opens the model's edit form; its completion patches the grid rows.
    pub fn open_edit_form(&self, action: FormAction, record: Option<Record>) -> GridResult<()> {
        self.ensure_live()?;
        let model = self.model()?;
        let form = self.edit_form(&model);
        let weak = Rc::downgrade(&self.core);
        let request = FormRequest {
            model,
            action,
            record,
            modal: true,
            target: Some(self.container().as_str().to_string()),
            on_complete: Rc::new(move |record: &Record, action: FormAction| {
                if let Some(grid) = GridView::upgrade(&weak) {
                    if let Err(err) = grid.update_grid(record, action == FormAction::Add) {
                        warn!(uid = %record.uid, error = %err, "grid not updated after edit");
                    }
                }
            }),
        };
        form.open(request)?;
        Ok(())
    }

    /// Patches one saved record into the rows: inserted at the top when new,
    /// otherwise replacing the row with the same primary key.
    pub fn update_grid(&self, record: &Record, is_new: bool) -> GridResult<()> {
        self.ensure_live()?;
        let mut inner = self.core.inner.borrow_mut();
        let row = {
            let view = inner
                .view
                .as_ref()
                .ok_or_else(|| GridError::InvalidState("grid view is not built".to_string()))?;
            let paths = view.column_paths();
            if paths.is_empty() {
                record.full_row()
            } else {
                record.row_view(&paths)
            }
        };
        if is_new {
            inner.rows.insert(0, row.clone());
            if let Some(control) = inner.control.as_mut() {
                control.add_record(row, 0);
            }
        } else {
            let uid = record.uid.as_str();
            match inner.rows.iter().position(|r| row_key(r) == Some(uid)) {
                Some(index) => {
                    inner.rows[index] = row.clone();
                    if let Some(control) = inner.control.as_mut() {
                        control.set_row_data(uid, row);
                    }
                }
                None => warn!(uid, "updated row is not in the grid"),
            }
        }
        debug!(uid = %record.uid, is_new, "grid row updated");
        Ok(())
    }
}

fn data_column(column: &ColumnSchema) -> GridColumn {
    let mut grid_column = GridColumn::new(column.grid_field(), column.label.as_str())
        .kind(column.semantic_type.grid_type())
        .align(TextAlign::Left)
        .width(column.width);
    if let Some(format) = &column.display_format {
        grid_column = grid_column.format(format.as_str());
    }
    if column.semantic_type == FieldType::Boolean {
        grid_column = grid_column.checkbox();
    }
    grid_column
}

/// Hidden key column, then the view's columns in order, with a checkbox
/// column in front when selection is on.
fn grid_columns(view: &ViewConfig, resolved: &[ColumnSchema], selection: bool) -> Vec<GridColumn> {
    let mut resolved = resolved.iter();
    let mut columns = vec![GridColumn::new(PRIMARY_KEY, "UID").hidden().primary_key().width(0)];
    for spec in &view.columns {
        match &spec.row_action {
            Some(action) => {
                let id = row_action_id(&spec.name);
                let mut column = GridColumn::new(id.as_str(), "")
                    .align(TextAlign::Left)
                    .template(format!(r#"<div id="{}">{}</div>"#, id, action.content));
                if let Some(width) = spec.width {
                    column = column.width(width);
                }
                columns.push(column);
            }
            None => {
                if let Some(column) = resolved.next() {
                    columns.push(data_column(column));
                }
            }
        }
    }
    if selection {
        columns.insert(0, GridColumn::new("", "").kind("checkbox").width(CHECKBOX_COLUMN_WIDTH));
    }
    columns
}
