//! Backing data-model interface.
//!
//! Persistence and query execution are owned by the host application; this
//! module only fixes the narrow surface the grid and form layers call into,
//! plus an in-memory implementation for headless use.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ModelError, ModelResult};
use crate::options::display_text;
use crate::record::{Record, RowView};
use crate::schema::{ModelSchema, SchemaCatalog};
use crate::view::{Filters, SearchQuery, ViewConfig};

/// Key under which `get_grid_view` embeds the full record when asked to.
pub const ROW_PAYLOAD: &str = "row";

/// Persistence surface of one modeled record type.
pub trait BackingModel {
    fn schema(&self) -> &ModelSchema;

    fn get(&self, uid: &str) -> ModelResult<Option<Record>>;

    fn get_by(&self, field: &str, value: &Value) -> ModelResult<Option<Record>>;

    /// Ordered row views for the view's columns, narrowed by search and filters.
    fn get_grid_view(
        &self,
        view: &ViewConfig,
        search: &[SearchQuery],
        filters: &Filters,
        include_rows: bool,
    ) -> ModelResult<Vec<RowView>>;

    fn delete(&self, record: &Record) -> ModelResult<()>;

    /// Inserts or updates; an empty `uid` receives a fresh identifier.
    fn save(&self, record: Record) -> ModelResult<Record>;
}

/// Namespace of every backing model known to the application.
#[derive(Clone, Default)]
pub struct DataModels {
    models: HashMap<String, Rc<dyn BackingModel>>,
}

impl DataModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: Rc<dyn BackingModel>) {
        let name = model.schema().name.clone();
        self.models.insert(name, model);
    }

    pub fn with(mut self, model: Rc<dyn BackingModel>) -> Self {
        self.register(model);
        self
    }

    pub fn get(&self, name: &str) -> ModelResult<Rc<dyn BackingModel>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }
}

impl SchemaCatalog for DataModels {
    fn schema(&self, model: &str) -> Option<&ModelSchema> {
        self.models.get(model).map(|m| m.schema())
    }
}

/// In-memory backing model keeping records in insertion order.
pub struct MemoryModel {
    schema: ModelSchema,
    records: RefCell<IndexMap<String, Record>>,
    available: Cell<bool>,
}

impl MemoryModel {
    pub fn new(schema: ModelSchema) -> Self {
        Self {
            schema,
            records: RefCell::new(IndexMap::new()),
            available: Cell::new(true),
        }
    }

    pub fn with_records(self, records: impl IntoIterator<Item = Record>) -> Self {
        {
            let mut stored = self.records.borrow_mut();
            for record in records {
                stored.insert(record.uid.clone(), record);
            }
        }
        self
    }

    /// Simulates an unreachable store: every call fails until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Removes a record behind the grid's back, as another session would.
    pub fn remove_silently(&self, uid: &str) -> Option<Record> {
        self.records.borrow_mut().shift_remove(uid)
    }

    fn check_available(&self) -> ModelResult<()> {
        if self.available.get() {
            Ok(())
        } else {
            Err(ModelError::BackingStore(format!("{} store is unavailable", self.schema.name)))
        }
    }

    fn matches(record: &Record, search: &[SearchQuery], filters: &Filters) -> bool {
        let filtered = filters
            .iter()
            .all(|(path, expected)| record.value_at(path).as_ref() == Some(expected));
        let searched = search.iter().all(|query| {
            let needle = query.text.to_lowercase();
            match &query.field {
                Some(path) => record
                    .value_at(path)
                    .map(|v| display_text(&v).to_lowercase().contains(&needle))
                    .unwrap_or(false),
                None => record
                    .fields
                    .values()
                    .any(|v| display_text(v).to_lowercase().contains(&needle)),
            }
        });
        filtered && searched
    }
}

impl BackingModel for MemoryModel {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn get(&self, uid: &str) -> ModelResult<Option<Record>> {
        self.check_available()?;
        Ok(self.records.borrow().get(uid).cloned())
    }

    fn get_by(&self, field: &str, value: &Value) -> ModelResult<Option<Record>> {
        self.check_available()?;
        Ok(self
            .records
            .borrow()
            .values()
            .find(|r| r.value_at(field).as_ref() == Some(value))
            .cloned())
    }

    fn get_grid_view(
        &self,
        view: &ViewConfig,
        search: &[SearchQuery],
        filters: &Filters,
        include_rows: bool,
    ) -> ModelResult<Vec<RowView>> {
        self.check_available()?;
        let paths = view.column_paths();
        let rows: Vec<RowView> = self
            .records
            .borrow()
            .values()
            .filter(|r| Self::matches(r, search, filters))
            .map(|r| {
                let mut row = if paths.is_empty() { r.full_row() } else { r.row_view(&paths) };
                if include_rows {
                    row.insert(ROW_PAYLOAD.to_string(), r.to_json());
                }
                row
            })
            .collect();
        Ok(rows)
    }

    fn delete(&self, record: &Record) -> ModelResult<()> {
        self.check_available()?;
        self.records.borrow_mut().shift_remove(&record.uid);
        debug!(model = %self.schema.name, uid = %record.uid, "record deleted");
        Ok(())
    }

    fn save(&self, mut record: Record) -> ModelResult<Record> {
        self.check_available()?;
        if record.uid.is_empty() {
            record.uid = uuid::Uuid::new_v4().to_string();
        }
        self.records.borrow_mut().insert(record.uid.clone(), record.clone());
        debug!(model = %self.schema.name, uid = %record.uid, "record saved");
        Ok(record)
    }
}
