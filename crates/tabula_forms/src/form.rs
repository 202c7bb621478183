use serde_json::{Map, Value};
use tabula_model::Record;

use crate::control::FieldControl;
use crate::errors::FormResult;
use crate::value::FieldValue;

/// Ordered controls of one edit form.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    pub name: String,
    controls: Vec<FieldControl>,
}

impl FieldSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controls: Vec::new(),
        }
    }

    pub fn add(&mut self, control: FieldControl) {
        self.controls.push(control);
    }

    pub fn with(mut self, control: FieldControl) -> Self {
        self.add(control);
        self
    }

    pub fn controls(&self) -> &[FieldControl] {
        &self.controls
    }

    pub fn get(&self, name: &str) -> Option<&FieldControl> {
        self.controls.iter().find(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn show_all(&self) -> FormResult<()> {
        self.controls.iter().try_for_each(FieldControl::show)
    }

    pub fn hide_all(&self) -> FormResult<()> {
        self.controls.iter().try_for_each(FieldControl::hide)
    }

    pub fn destroy_all(&self) {
        self.controls.iter().for_each(FieldControl::destroy);
    }

    /// Seeds every control from the matching record field.
    pub fn load(&self, record: &Record) -> FormResult<()> {
        for control in &self.controls {
            let value = record
                .value_at(control.name())
                .map(|raw| FieldValue::from_json(&raw))
                .unwrap_or_default();
            control.set_value(value)?;
        }
        Ok(())
    }

    /// Values of the controls that take part in persistence.
    pub fn values(&self) -> FormResult<Map<String, Value>> {
        self.controls
            .iter()
            .filter(|c| c.saves())
            .map(|c| c.serialized().map(|value| (c.name().to_string(), value)))
            .collect()
    }

    /// Writes the saved values into `record`.
    pub fn apply_to(&self, record: &mut Record) -> FormResult<()> {
        for (key, value) in self.values()? {
            record.set(key, value);
        }
        Ok(())
    }
}
