//! In-memory widget toolkit.
//!
//! Keeps rendered markup per container and the state of every widget it
//! created, so controls can be driven without a browser. Test code reaches
//! the widgets through [`WidgetInspector`].

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use tabula_model::LookupOption;

use crate::errors::{FormError, FormResult};
use crate::events::{EventHandler, EventType, WidgetEvent};
use crate::properties::{PropertyBag, PropertyValue};
use crate::toolkit::{props, ElementId, Primitive, Toolkit, Widget};
use crate::value::WidgetValue;

pub struct WidgetState {
    pub primitive: Primitive,
    pub props: PropertyBag,
    pub value: WidgetValue,
    pub flags: HashMap<String, bool>,
    pub items: Vec<LookupOption>,
    pub removed: Vec<String>,
    pub attached_to: Option<ElementId>,
    pub destroyed: bool,
    handlers: Vec<(EventType, EventHandler)>,
}

#[derive(Default)]
struct Document {
    roots: BTreeSet<String>,
    markup: BTreeMap<String, String>,
    heights: HashMap<String, i32>,
    unavailable: HashSet<Primitive>,
    widgets: Vec<Rc<RefCell<WidgetState>>>,
}

impl Document {
    fn exists(&self, id: &str) -> bool {
        let needle = format!(r#"id="{}""#, id);
        self.roots.contains(id) || self.markup.values().any(|m| m.contains(&needle))
    }
}

#[derive(Clone, Default)]
pub struct HeadlessToolkit {
    doc: Rc<RefCell<Document>>,
}

impl HeadlessToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level container element.
    pub fn add_container(&self, id: impl Into<ElementId>) -> ElementId {
        let id = id.into();
        self.doc.borrow_mut().roots.insert(id.as_str().to_string());
        id
    }

    pub fn set_height(&self, container: &ElementId, height: i32) {
        self.doc
            .borrow_mut()
            .heights
            .insert(container.as_str().to_string(), height);
    }

    /// Makes `create_widget` fail for `primitive`.
    pub fn remove_primitive(&self, primitive: Primitive) {
        self.doc.borrow_mut().unavailable.insert(primitive);
    }

    pub fn markup(&self, container: &ElementId) -> Option<String> {
        self.doc.borrow().markup.get(container.as_str()).cloned()
    }

    pub fn element_exists(&self, id: &ElementId) -> bool {
        self.doc.borrow().exists(id.as_str())
    }

    /// The live widget attached to `element`, if any.
    pub fn widget(&self, element: &ElementId) -> Option<WidgetInspector> {
        self.doc
            .borrow()
            .widgets
            .iter()
            .rev()
            .find(|state| {
                let state = state.borrow();
                let live = !state.destroyed && state.attached_to.as_ref() == Some(element);
                live
            })
            .map(|state| WidgetInspector {
                state: Rc::clone(state),
            })
    }

    pub fn live_widgets(&self) -> usize {
        self.doc
            .borrow()
            .widgets
            .iter()
            .filter(|state| !state.borrow().destroyed)
            .count()
    }
}

impl Toolkit for HeadlessToolkit {
    fn create_widget(&self, primitive: Primitive, bag: PropertyBag) -> FormResult<Box<dyn Widget>> {
        if self.doc.borrow().unavailable.contains(&primitive) {
            return Err(FormError::WidgetConstruction {
                primitive: primitive.as_str().to_string(),
                reason: "primitive not available".to_string(),
            });
        }
        let items = bag.options(props::DATA_SOURCE).map(<[_]>::to_vec).unwrap_or_default();
        let value = match primitive {
            Primitive::CheckBox | Primitive::RadioButton => WidgetValue::Checked(false),
            _ => WidgetValue::Empty,
        };
        let state = Rc::new(RefCell::new(WidgetState {
            primitive,
            props: bag,
            value,
            flags: HashMap::new(),
            items,
            removed: Vec::new(),
            attached_to: None,
            destroyed: false,
            handlers: Vec::new(),
        }));
        self.doc.borrow_mut().widgets.push(Rc::clone(&state));
        Ok(Box::new(HeadlessWidget {
            state,
            doc: Rc::clone(&self.doc),
        }))
    }

    fn render(&self, container: &ElementId, markup: &str) -> FormResult<()> {
        let mut doc = self.doc.borrow_mut();
        if !doc.exists(container.as_str()) {
            return Err(FormError::ContainerNotFound(container.to_string()));
        }
        doc.markup
            .insert(container.as_str().to_string(), markup.to_string());
        Ok(())
    }

    fn create_edit_host(&self) -> ElementId {
        self.add_container(ElementId::generate())
    }

    fn measure_height(&self, container: &ElementId) -> Option<i32> {
        self.doc.borrow().heights.get(container.as_str()).copied()
    }
}

struct HeadlessWidget {
    state: Rc<RefCell<WidgetState>>,
    doc: Rc<RefCell<Document>>,
}

impl Widget for HeadlessWidget {
    fn primitive(&self) -> Primitive {
        self.state.borrow().primitive
    }

    fn append_to(&mut self, target: &ElementId) -> FormResult<()> {
        if !self.doc.borrow().exists(target.as_str()) {
            return Err(FormError::ContainerNotFound(target.to_string()));
        }
        self.state.borrow_mut().attached_to = Some(target.clone());
        Ok(())
    }

    fn value(&self) -> WidgetValue {
        self.state.borrow().value.clone()
    }

    fn set_value(&mut self, value: WidgetValue) {
        self.state.borrow_mut().value = value;
    }

    fn flag(&self, name: &str) -> bool {
        self.state.borrow().flags.get(name).copied().unwrap_or(false)
    }

    fn set_flag(&mut self, name: &str, on: bool) {
        self.state.borrow_mut().flags.insert(name.to_string(), on);
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) {
        let mut state = self.state.borrow_mut();
        if name == props::DATA_SOURCE {
            if let Some(options) = value.as_options() {
                state.items = options.to_vec();
            }
        }
        state.props.set(name, value);
    }

    fn on(&mut self, event: EventType, handler: EventHandler) {
        self.state.borrow_mut().handlers.push((event, handler));
    }

    fn add_item(&mut self, option: LookupOption, index: usize) {
        let mut state = self.state.borrow_mut();
        let at = index.min(state.items.len());
        state.items.insert(at, option);
    }

    fn remove_item(&mut self, key: &str) {
        let mut state = self.state.borrow_mut();
        state.items.retain(|item| item.uid != key);
        state.removed.push(key.to_string());
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        state.destroyed = true;
        state.attached_to = None;
        state.handlers.clear();
    }
}

/// Test-side view of a headless widget.
#[derive(Clone)]
pub struct WidgetInspector {
    state: Rc<RefCell<WidgetState>>,
}

impl WidgetInspector {
    pub fn primitive(&self) -> Primitive {
        self.state.borrow().primitive
    }

    pub fn value(&self) -> WidgetValue {
        self.state.borrow().value.clone()
    }

    pub fn flag(&self, name: &str) -> bool {
        self.state.borrow().flags.get(name).copied().unwrap_or(false)
    }

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.state.borrow().props.get(name).cloned()
    }

    pub fn items(&self) -> Vec<LookupOption> {
        self.state.borrow().items.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state.borrow().removed.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Simulates user input: stores the value and raises `change`.
    pub fn input(&self, value: WidgetValue) {
        self.state.borrow_mut().value = value.clone();
        self.fire(&WidgetEvent::change(value));
    }

    /// Raises `event` on every handler registered for its type.
    pub fn fire(&self, event: &WidgetEvent) {
        let kind = event.event_type();
        let handlers: Vec<EventHandler> = self
            .state
            .borrow()
            .handlers
            .iter()
            .filter(|(event_type, _)| *event_type == kind)
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}
