//! Generic edit form built from model metadata.
//!
//! Used by [`GridView`](crate::GridView) when no `<Model>Form` is registered.
//! Every attribute gets the input matching its type and every relationship
//! a single-select lookup on the target model. Computed and file fields are
//! not editable here.

use std::cell::RefCell;
use std::rc::Rc;

use tabula_forms::inputs::{
    checkbox_input, date_input, date_time_input, multiline_input, number_input, signature_input,
    text_input, time_input, LabelPosition, Lookup, LookupConfig,
};
use tabula_forms::{ElementId, FieldControl, FieldSet, FieldSpec, Toolkit};
use tabula_model::text::capwords;
use serde_json::Value;
use tabula_model::{
    resolve_field, AppContext, EditFormLauncher, FieldType, FormRequest, ModelError, ModelResult,
    Record, PRIMARY_KEY, TITLE_ALIAS,
};
use tracing::{debug, info, warn};

use crate::errors::{GridError, GridResult};

const TEXT_AREA_ROWS: u32 = 3;

/// A relationship edited through a lookup, with the model it points at.
struct Related {
    lookup: Lookup,
    target: String,
}

struct FormSession {
    request: FormRequest,
    fields: FieldSet,
    related: Vec<Related>,
    host: ElementId,
}

pub struct SchemaForm {
    context: AppContext,
    toolkit: Rc<dyn Toolkit>,
    session: RefCell<Option<FormSession>>,
}

impl SchemaForm {
    pub fn new(context: AppContext, toolkit: Rc<dyn Toolkit>) -> Self {
        Self {
            context,
            toolkit,
            session: RefCell::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// Controls of the open form.
    pub fn fields(&self) -> Option<FieldSet> {
        self.session.borrow().as_ref().map(|s| s.fields.clone())
    }

    /// Element the open form is rendered into.
    pub fn host(&self) -> Option<ElementId> {
        self.session.borrow().as_ref().map(|s| s.host.clone())
    }

    fn control_for(&self, name: &str, field_type: FieldType) -> GridResult<Option<FieldControl>> {
        let spec = FieldSpec::new(name).label(capwords(name));
        let toolkit = Rc::clone(&self.toolkit);
        let control = match field_type {
            FieldType::Number | FieldType::Integer => number_input(spec, toolkit)?,
            FieldType::Boolean => checkbox_input(spec, LabelPosition::After, toolkit)?,
            FieldType::Date => date_input(spec, toolkit)?,
            FieldType::DateTime => date_time_input(spec, toolkit)?,
            FieldType::Time => time_input(spec, toolkit)?,
            FieldType::Text | FieldType::Object => multiline_input(spec, TEXT_AREA_ROWS, toolkit)?,
            FieldType::Signature => signature_input(spec, None, None, toolkit)?,
            FieldType::String | FieldType::Enumeration => text_input(spec, toolkit)?,
            FieldType::Uid | FieldType::Files => return Ok(None),
        };
        Ok(Some(control))
    }

    fn build(&self, model: &str) -> GridResult<(FieldSet, Vec<Related>)> {
        let backing = self.context.data_models.get(model)?;
        let schema = backing.schema();
        let mut fields = FieldSet::new(model);
        for (name, field_type) in schema.attributes() {
            if let Some(control) = self.control_for(name, field_type)? {
                fields.add(control);
            }
        }
        let mut related = Vec::new();
        for (name, target) in schema.relationships() {
            let title = resolve_field(&self.context.data_models, target, TITLE_ALIAS)?;
            let spec = FieldSpec::new(name.as_str()).label(capwords(name));
            let lookup = Lookup::new(
                spec,
                LookupConfig::new(target).text_field(title.path),
                &self.context,
                Rc::clone(&self.toolkit),
            )?;
            fields.add(lookup.dropdown().control().clone());
            related.push(Related {
                lookup,
                target: target.to_string(),
            });
        }
        Ok((fields, related))
    }

    /// Selects the lookup option matching the embedded record's uid, so the
    /// option text follows the target's title rather than the raw record.
    fn load_related(related: &[Related], record: &Record) -> GridResult<()> {
        for entry in related {
            let uid = record
                .get(entry.lookup.name())
                .and_then(|value| value.get(PRIMARY_KEY))
                .and_then(Value::as_str);
            let Some(uid) = uid else {
                continue;
            };
            match entry.lookup.options().into_iter().find(|option| option.uid == uid) {
                Some(option) => entry.lookup.set_value(option)?,
                None => warn!(field = %entry.lookup.name(), uid, "related record is not an option"),
            }
        }
        Ok(())
    }

    /// Replaces each selected option with the related record it names.
    fn embed_related(&self, related: &[Related], record: &mut Record) -> GridResult<()> {
        for entry in related {
            let name = entry.lookup.name();
            let uid = record
                .get(name)
                .and_then(|value| value.get(PRIMARY_KEY))
                .and_then(Value::as_str)
                .map(str::to_string);
            let embedded = match uid {
                Some(uid) => match self.context.data_models.get(&entry.target)?.get(&uid)? {
                    Some(target) => target.to_json(),
                    None => {
                        warn!(field = name, uid = %uid, "related record not found");
                        Value::Null
                    }
                },
                None => Value::Null,
            };
            record.set(name, embedded);
        }
        Ok(())
    }

    fn open_session(&self, request: FormRequest) -> GridResult<()> {
        self.cancel();
        let (fields, related) = self.build(&request.model)?;
        if let Some(record) = &request.record {
            fields.load(record)?;
            Self::load_related(&related, record)?;
        }
        let host = self.toolkit.create_edit_host();
        let markup: String = fields
            .controls()
            .iter()
            .map(|c| format!(r#"<div class="form-group" id="{}"></div>"#, c.spec().container_id))
            .collect();
        self.toolkit
            .render(&host, &format!(r#"<div class="pm-schema-form">{}</div>"#, markup))?;
        fields.show_all()?;
        info!(model = %request.model, action = request.action.as_str(), fields = fields.len(), "schema form opened");
        *self.session.borrow_mut() = Some(FormSession {
            request,
            fields,
            related,
            host,
        });
        Ok(())
    }

    fn save(&self, session: &FormSession) -> GridResult<Record> {
        let backing = self.context.data_models.get(&session.request.model)?;
        let mut record = session
            .request
            .record
            .clone()
            .unwrap_or_else(|| Record::new(""));
        session.fields.apply_to(&mut record)?;
        self.embed_related(&session.related, &mut record)?;
        Ok(backing.save(record)?)
    }

    /// Saves the form through the backing model and reports the saved record
    /// to the completion callback. The form stays open when saving fails.
    pub fn submit(&self) -> GridResult<Record> {
        let session = self
            .session
            .borrow_mut()
            .take()
            .ok_or_else(|| GridError::InvalidState("no schema form is open".to_string()))?;
        match self.save(&session) {
            Ok(record) => {
                session.fields.destroy_all();
                self.toolkit.render(&session.host, "")?;
                info!(model = %session.request.model, uid = %record.uid, "schema form saved");
                (session.request.on_complete)(&record, session.request.action);
                Ok(record)
            }
            Err(err) => {
                *self.session.borrow_mut() = Some(session);
                Err(err)
            }
        }
    }

    /// Closes the open form without saving.
    pub fn cancel(&self) {
        let session = self.session.borrow_mut().take();
        if let Some(session) = session {
            debug!(model = %session.request.model, "schema form closed");
            session.fields.destroy_all();
        }
    }
}

impl EditFormLauncher for SchemaForm {
    fn open(&self, request: FormRequest) -> ModelResult<()> {
        self.open_session(request)
            .map_err(|err| ModelError::EditForm(err.to_string()))
    }
}
