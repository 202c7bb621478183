use std::cell::RefCell;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use tabula_model::{
    AppContext, ColumnSpec, EditFormLauncher, Filters, FormAction, FormRequest, LookupOption,
    Record, RowView, ViewConfig,
};
use tracing::{debug, info, warn};

use crate::codec::SelectMode;
use crate::control::{FieldControl, FieldSpec};
use crate::errors::{FormError, FormResult};
use crate::events::{EventType, WidgetEvent};
use crate::factory::DropdownFactory;
use crate::inputs::Dropdown;
use crate::toolkit::{ElementId, Toolkit};
use crate::value::FieldValue;

/// Custom option text computed from a related row.
pub type ComputeOption = Rc<dyn Fn(&RowView) -> String>;

/// Where a lookup's options come from and how new related records are added.
#[derive(Clone)]
pub struct LookupConfig {
    pub model: String,
    /// Row key for the option text; a dotted path reads its first segment.
    pub text_field: String,
    pub mode: SelectMode,
    pub compute_option: Option<ComputeOption>,
    /// Preloaded rows; skips the live query.
    pub data: Option<Vec<RowView>>,
    pub get_data: bool,
    pub add_item_label: String,
    /// Registered form opened by the footer action.
    pub add_item_form: Option<String>,
    /// Model passed to the add form; defaults to `model`.
    pub add_item_model: Option<String>,
}

impl LookupConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text_field: "name".to_string(),
            mode: SelectMode::Single,
            compute_option: None,
            data: None,
            get_data: true,
            add_item_label: "Add Item".to_string(),
            add_item_form: None,
            add_item_model: None,
        }
    }

    pub fn text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    pub fn multi(mut self) -> Self {
        self.mode = SelectMode::Multi;
        self
    }

    pub fn compute_option(mut self, compute: impl Fn(&RowView) -> String + 'static) -> Self {
        self.compute_option = Some(Rc::new(compute));
        self
    }

    pub fn data(mut self, rows: Vec<RowView>) -> Self {
        self.data = Some(rows);
        self
    }

    pub fn without_data(mut self) -> Self {
        self.get_data = false;
        self
    }

    pub fn add_item_form(mut self, form: impl Into<String>) -> Self {
        self.add_item_form = Some(form.into());
        self
    }

    pub fn add_item_model(mut self, model: impl Into<String>) -> Self {
        self.add_item_model = Some(model.into());
        self
    }

    pub fn add_item_label(mut self, label: impl Into<String>) -> Self {
        self.add_item_label = label.into();
        self
    }

    fn option_for(&self, row: &RowView) -> Option<LookupOption> {
        let option = LookupOption::from_row(row, &self.text_field)?;
        Some(match &self.compute_option {
            Some(compute) => LookupOption::new(compute(row), option.uid),
            None => option,
        })
    }

    fn options_for(&self, rows: &[RowView]) -> Vec<LookupOption> {
        rows.iter().filter_map(|row| self.option_for(row)).collect()
    }
}

struct LookupInner {
    dropdown: Dropdown,
    config: LookupConfig,
    add_form: Option<Rc<dyn EditFormLauncher>>,
    add_el_id: ElementId,
}

/// Dropdown over records of a related model, with an inline add action.
#[derive(Clone)]
pub struct Lookup {
    inner: Rc<LookupInner>,
}

impl Lookup {
    pub fn new(
        spec: FieldSpec,
        config: LookupConfig,
        context: &AppContext,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let options = Self::initial_options(&config, context)?;
        let add_model = config.add_item_model.clone().unwrap_or_else(|| config.model.clone());
        let add_form = match &config.add_item_form {
            Some(name) => context.forms.get(name),
            None => context.forms.edit_form_for(&add_model),
        };
        let add_el_id = ElementId::generate();

        let shared = Rc::new(RefCell::new(options));
        let mut factory = DropdownFactory::new(Rc::clone(&shared), config.mode);
        if add_form.is_some() {
            factory = factory.footer(format!(
                r#"<button class="e-control e-btn e-lib e-flat" type="button" id="{}">+ {}</button>"#,
                add_el_id, config.add_item_label
            ));
        }
        let dropdown = Dropdown::with_factory(spec, shared, config.mode, Rc::new(factory), toolkit)?;

        let lookup = Self {
            inner: Rc::new(LookupInner {
                dropdown,
                config,
                add_form,
                add_el_id,
            }),
        };
        let weak = Rc::downgrade(&lookup.inner);
        lookup.inner.dropdown.control().add_handler(
            EventType::FooterClick,
            Rc::new(move |event: &WidgetEvent| {
                let WidgetEvent::FooterClick { target } = event else {
                    return;
                };
                if let Some(lookup) = Lookup::upgrade(&weak) {
                    if target == lookup.inner.add_el_id.as_str() {
                        if let Err(err) = lookup.open_add_item() {
                            warn!(field = %lookup.name(), error = %err, "add item form failed to open");
                        }
                    }
                }
            }),
        );
        Ok(lookup)
    }

    fn upgrade(weak: &Weak<LookupInner>) -> Option<Lookup> {
        weak.upgrade().map(|inner| Lookup { inner })
    }

    fn initial_options(config: &LookupConfig, context: &AppContext) -> FormResult<Vec<LookupOption>> {
        if let Some(options) = context.enumeration(&config.model) {
            return Ok(options.to_vec());
        }
        let rows = match &config.data {
            Some(rows) => rows.clone(),
            None if config.get_data => {
                let model = context.data_models.get(&config.model)?;
                let mut view = ViewConfig::for_model(config.model.as_str());
                view.columns = vec![ColumnSpec::new(config.text_field.as_str())];
                model.get_grid_view(&view, &[], &Filters::new(), false)?
            }
            None => Vec::new(),
        };
        debug!(model = %config.model, rows = rows.len(), "lookup options loaded");
        Ok(config.options_for(&rows))
    }

    pub fn dropdown(&self) -> &Dropdown {
        &self.inner.dropdown
    }

    pub fn config(&self) -> &LookupConfig {
        &self.inner.config
    }

    pub fn options(&self) -> Vec<LookupOption> {
        self.inner.dropdown.options()
    }

    /// Rebuilds the options from fresh related rows.
    pub fn set_data(&self, rows: &[RowView]) {
        self.inner.dropdown.set_options(self.inner.config.options_for(rows));
    }

    /// Id of the footer add button, present when an add form is available.
    pub fn add_item_id(&self) -> Option<&ElementId> {
        self.inner.add_form.as_ref().map(|_| &self.inner.add_el_id)
    }

    /// Opens the add form; its completion feeds [`Lookup::new_item`].
    pub fn open_add_item(&self) -> FormResult<()> {
        let form = self
            .inner
            .add_form
            .clone()
            .ok_or_else(|| FormError::NotConfigured(self.name().to_string()))?;
        let weak = Rc::downgrade(&self.inner);
        let model = self
            .inner
            .config
            .add_item_model
            .clone()
            .unwrap_or_else(|| self.inner.config.model.clone());
        form.open(FormRequest {
            model,
            action: FormAction::Add,
            record: None,
            modal: true,
            target: None,
            on_complete: Rc::new(move |record: &Record, action: FormAction| {
                if let Some(lookup) = Lookup::upgrade(&weak) {
                    if let Err(err) = lookup.new_item(record, action) {
                        warn!(field = %lookup.name(), error = %err, "new item not selected");
                    }
                }
            }),
        })?;
        Ok(())
    }

    /// Puts a freshly created related record first in the list and selects it.
    pub fn new_item(&self, record: &Record, action: FormAction) -> FormResult<()> {
        info!(field = %self.name(), uid = %record.uid, action = action.as_str(), "new lookup item");
        let config = &self.inner.config;
        let option = match &config.compute_option {
            Some(compute) => LookupOption::new(compute(&record.full_row()), record.uid.clone()),
            None => LookupOption::from_record(record, &config.text_field),
        };
        let dropdown = &self.inner.dropdown;
        dropdown.insert_option(option.clone(), 0);
        match dropdown.mode() {
            SelectMode::Single => dropdown.set_value(option),
            SelectMode::Multi => {
                let mut selected = match dropdown.value()? {
                    FieldValue::Options(list) => list,
                    _ => Vec::new(),
                };
                selected.push(option);
                dropdown.set_value(selected)
            }
        }
    }
}

impl Deref for Lookup {
    type Target = FieldControl;

    fn deref(&self) -> &FieldControl {
        self.inner.dropdown.control()
    }
}
