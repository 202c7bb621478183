//! In-memory tabular control backed by a [`HeadlessToolkit`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tabula_forms::{ElementId, FormError, FormResult, HeadlessToolkit, Toolkit};
use tabula_model::{row_key, RowView};

use crate::control::{GridToolkit, TabularControl};
use crate::options::GridOptions;

pub struct TableState {
    pub options: GridOptions,
    pub rows: Vec<RowView>,
    pub attached_to: Option<ElementId>,
    pub dialogs_closed: usize,
    /// Keys passed to `set_row_data`, in call order.
    pub row_updates: Vec<String>,
    pub styles: HashMap<String, (Option<String>, Option<String>)>,
    pub hidden_items: HashSet<String>,
    pub destroyed: bool,
}

#[derive(Clone, Default)]
pub struct HeadlessGridToolkit {
    kit: HeadlessToolkit,
    tables: Rc<RefCell<Vec<Rc<RefCell<TableState>>>>>,
}

impl HeadlessGridToolkit {
    pub fn new(kit: HeadlessToolkit) -> Self {
        Self {
            kit,
            tables: Rc::default(),
        }
    }

    pub fn kit(&self) -> &HeadlessToolkit {
        &self.kit
    }

    /// The most recently created control.
    pub fn last_grid(&self) -> Option<GridInspector> {
        self.tables.borrow().last().map(|state| GridInspector {
            state: Rc::clone(state),
        })
    }

    pub fn grid_count(&self) -> usize {
        self.tables.borrow().len()
    }
}

impl GridToolkit for HeadlessGridToolkit {
    fn create_grid(&self, options: GridOptions) -> FormResult<Box<dyn TabularControl>> {
        let rows = options.data_source.clone();
        let state = Rc::new(RefCell::new(TableState {
            options,
            rows,
            attached_to: None,
            dialogs_closed: 0,
            row_updates: Vec::new(),
            styles: HashMap::new(),
            hidden_items: HashSet::new(),
            destroyed: false,
        }));
        self.tables.borrow_mut().push(Rc::clone(&state));
        Ok(Box::new(HeadlessTable {
            state,
            kit: self.kit.clone(),
        }))
    }

    fn widgets(&self) -> Rc<dyn Toolkit> {
        Rc::new(self.kit.clone())
    }
}

struct HeadlessTable {
    state: Rc<RefCell<TableState>>,
    kit: HeadlessToolkit,
}

impl TabularControl for HeadlessTable {
    fn append_to(&mut self, target: &ElementId) -> FormResult<()> {
        if !self.kit.element_exists(target) {
            return Err(FormError::ContainerNotFound(target.to_string()));
        }
        self.state.borrow_mut().attached_to = Some(target.clone());
        Ok(())
    }

    fn set_data_source(&mut self, rows: Vec<RowView>) {
        self.state.borrow_mut().rows = rows;
    }

    fn add_record(&mut self, row: RowView, index: usize) {
        let mut state = self.state.borrow_mut();
        let index = index.min(state.rows.len());
        state.rows.insert(index, row);
    }

    fn set_row_data(&mut self, key: &str, row: RowView) {
        let mut state = self.state.borrow_mut();
        state.row_updates.push(key.to_string());
        if let Some(slot) = state.rows.iter_mut().find(|r| row_key(r) == Some(key)) {
            *slot = row;
        }
    }

    fn remove_records(&mut self, keys: &[String]) {
        self.state
            .borrow_mut()
            .rows
            .retain(|row| !row_key(row).is_some_and(|k| keys.iter().any(|key| key == k)));
    }

    fn close_dialog(&mut self) {
        self.state.borrow_mut().dialogs_closed += 1;
    }

    fn style_toolbar_item(&mut self, key: &str, css_class: Option<&str>, style: Option<&str>) {
        self.state.borrow_mut().styles.insert(
            key.to_string(),
            (css_class.map(str::to_string), style.map(str::to_string)),
        );
    }

    fn set_toolbar_item_visible(&mut self, id: &str, visible: bool) {
        let mut state = self.state.borrow_mut();
        if visible {
            state.hidden_items.remove(id);
        } else {
            state.hidden_items.insert(id.to_string());
        }
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        state.destroyed = true;
        state.attached_to = None;
    }
}

/// Read access to a control created by [`HeadlessGridToolkit`].
#[derive(Clone)]
pub struct GridInspector {
    state: Rc<RefCell<TableState>>,
}

impl GridInspector {
    pub fn options(&self) -> GridOptions {
        self.state.borrow().options.clone()
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.state.borrow().rows.clone()
    }

    pub fn row_count(&self) -> usize {
        self.state.borrow().rows.len()
    }

    pub fn attached_to(&self) -> Option<ElementId> {
        self.state.borrow().attached_to.clone()
    }

    pub fn dialogs_closed(&self) -> usize {
        self.state.borrow().dialogs_closed
    }

    pub fn row_updates(&self) -> Vec<String> {
        self.state.borrow().row_updates.clone()
    }

    pub fn style(&self, key: &str) -> Option<(Option<String>, Option<String>)> {
        self.state.borrow().styles.get(key).cloned()
    }

    pub fn item_visible(&self, id: &str) -> bool {
        !self.state.borrow().hidden_items.contains(id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }
}
