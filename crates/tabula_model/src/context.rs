//! Application context handed to grids and inputs.
//!
//! Created once when the application starts and dropped when the session
//! ends. Holds the data-model namespace, predeclared enumerations, the edit
//! form registry, object storage and the logged-in user.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backing::DataModels;
use crate::errors::{ModelError, ModelResult};
use crate::options::LookupOption;
use crate::record::Record;
use crate::storage::ObjectStore;
use crate::view::{GridSettings, ViewConfig};

/// Model holding stored grid views, looked up by `name`.
pub const STORED_VIEWS_MODEL: &str = "appGridViews";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedUser {
    pub uid: String,
    pub tenant_uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormAction {
    Add,
    Edit,
}

impl FormAction {
    pub fn as_str(&self) -> &str {
        match self {
            FormAction::Add => "add",
            FormAction::Edit => "edit",
        }
    }
}

/// Invoked by an edit form after a successful submit.
pub type CompletionCallback = Rc<dyn Fn(&Record, FormAction)>;

/// Everything an edit form needs to open.
#[derive(Clone)]
pub struct FormRequest {
    pub model: String,
    pub action: FormAction,
    /// Existing record for edits, `None` when adding.
    pub record: Option<Record>,
    pub modal: bool,
    /// Container the form renders next to.
    pub target: Option<String>,
    pub on_complete: CompletionCallback,
}

/// An edit form implementation, registered per model or used as fallback.
pub trait EditFormLauncher {
    fn open(&self, request: FormRequest) -> ModelResult<()>;
}

/// Registered edit forms keyed by form name (`<Model>Form`).
#[derive(Clone, Default)]
pub struct FormRegistry {
    forms: HashMap<String, Rc<dyn EditFormLauncher>>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, form: Rc<dyn EditFormLauncher>) {
        self.forms.insert(name.into(), form);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn EditFormLauncher>> {
        self.forms.get(name).cloned()
    }

    pub fn form_name(model: &str) -> String {
        format!("{}Form", model)
    }

    /// The edit form registered for `model` by naming convention.
    pub fn edit_form_for(&self, model: &str) -> Option<Rc<dyn EditFormLauncher>> {
        self.get(&Self::form_name(model))
    }
}

#[derive(Clone, Default)]
pub struct AppContext {
    pub data_models: DataModels,
    pub enum_models: HashMap<String, Vec<LookupOption>>,
    pub forms: FormRegistry,
    pub object_store: Option<Rc<dyn ObjectStore>>,
    pub logged_user: Option<LoggedUser>,
    pub grid_settings: GridSettings,
}

impl AppContext {
    pub fn new(data_models: DataModels) -> Self {
        Self {
            data_models,
            ..Default::default()
        }
    }

    pub fn with_enumeration(mut self, model: impl Into<String>, options: Vec<LookupOption>) -> Self {
        self.enum_models.insert(model.into(), options);
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, form: Rc<dyn EditFormLauncher>) -> Self {
        self.forms.register(name, form);
        self
    }

    pub fn with_object_store(mut self, store: Rc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    pub fn with_user(mut self, user: LoggedUser) -> Self {
        self.logged_user = Some(user);
        self
    }

    pub fn with_grid_settings(mut self, settings: GridSettings) -> Self {
        self.grid_settings = settings;
        self
    }

    pub fn enumeration(&self, model: &str) -> Option<&[LookupOption]> {
        self.enum_models.get(model).map(Vec::as_slice)
    }

    /// Loads a named view from the stored views model.
    pub fn stored_view(&self, name: &str) -> ModelResult<ViewConfig> {
        let views = self.data_models.get(STORED_VIEWS_MODEL)?;
        let record = views
            .get_by("name", &Value::String(name.to_string()))?
            .ok_or_else(|| ModelError::ViewNotFound(name.to_string()))?;
        let raw = record
            .get("config")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::ViewNotFound(name.to_string()))?;
        ViewConfig::from_stored(raw)
    }
}
