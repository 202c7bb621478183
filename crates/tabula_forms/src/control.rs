//! The value-binding core shared by every input variant.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tabula_model::RowView;
use tracing::{debug, warn};

use crate::codec::ValueCodec;
use crate::errors::FormResult;
use crate::events::{ChangeCallback, EventHandler, EventType, FieldChange, WidgetEvent};
use crate::factory::{MountedWidget, WidgetFactory};
use crate::grid_column::GridColumn;
use crate::toolkit::{ElementId, Toolkit, Widget};
use crate::value::FieldValue;

/// How the label is presented next to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// Placeholder that floats above the input once it has a value.
    #[default]
    Floating,
    /// Static label rendered below the input; no placeholder.
    Shadow,
    Plain,
}

/// Construction parameters common to all variants.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub label_mode: LabelMode,
    pub value: FieldValue,
    pub enabled: bool,
    /// Whether the control participates in record persistence.
    pub save: bool,
    pub on_change: Option<ChangeCallback>,
    pub el_id: ElementId,
    pub container_id: ElementId,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            label_mode: LabelMode::default(),
            value: FieldValue::Null,
            enabled: true,
            save: true,
            on_change: None,
            el_id: ElementId::generate(),
            container_id: ElementId::generate(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }

    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub fn on_change(mut self, callback: impl Fn(&FieldChange) + 'static) -> Self {
        self.on_change = Some(Rc::new(callback));
        self
    }

    pub fn el_id(mut self, id: impl Into<ElementId>) -> Self {
        self.el_id = id.into();
        self
    }

    pub fn container(mut self, id: impl Into<ElementId>) -> Self {
        self.container_id = id.into();
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("label_mode", &self.label_mode)
            .field("value", &self.value)
            .field("enabled", &self.enabled)
            .field("save", &self.save)
            .field("el_id", &self.el_id)
            .field("container_id", &self.container_id)
            .finish()
    }
}

/// Either only a cached value, or a cached value plus the live widgets.
enum Binding {
    Detached { cached: FieldValue },
    Attached { cached: FieldValue, widgets: Vec<MountedWidget> },
}

impl Binding {
    fn cached(&self) -> &FieldValue {
        match self {
            Binding::Detached { cached } | Binding::Attached { cached, .. } => cached,
        }
    }

    fn cached_mut(&mut self) -> &mut FieldValue {
        match self {
            Binding::Detached { cached } | Binding::Attached { cached, .. } => cached,
        }
    }
}

struct ControlInner {
    binding: Binding,
    /// Set while the widgets are moved out for a call into the toolkit.
    lent: bool,
    enabled: bool,
    visible: bool,
    container: Option<ElementId>,
    edit_host: Option<ElementId>,
    edit_row: Option<RowView>,
    handlers: Vec<(EventType, EventHandler)>,
}

/// Handle to one input control. Clones share the same state.
///
/// While detached, reads and writes only touch the cached value. Once a
/// widget exists it is the source of truth: every read pulls from it.
#[derive(Clone)]
pub struct FieldControl {
    inner: Rc<RefCell<ControlInner>>,
    spec: Rc<FieldSpec>,
    codec: Rc<dyn ValueCodec>,
    factory: Rc<dyn WidgetFactory>,
    toolkit: Rc<dyn Toolkit>,
}

impl FieldControl {
    pub fn new(
        spec: FieldSpec,
        codec: Rc<dyn ValueCodec>,
        factory: Rc<dyn WidgetFactory>,
        toolkit: Rc<dyn Toolkit>,
    ) -> FormResult<Self> {
        let cached = codec.normalize(&spec.name, spec.value.clone())?;
        let inner = ControlInner {
            binding: Binding::Detached { cached },
            lent: false,
            enabled: spec.enabled,
            visible: false,
            container: None,
            edit_host: None,
            edit_row: None,
            handlers: Vec::new(),
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
            spec: Rc::new(spec),
            codec,
            factory,
            toolkit,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn label(&self) -> &str {
        &self.spec.label
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn saves(&self) -> bool {
        self.spec.save
    }

    pub fn toolkit(&self) -> &Rc<dyn Toolkit> {
        &self.toolkit
    }

    pub fn is_visible(&self) -> bool {
        self.inner.borrow().visible
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.inner.borrow().binding, Binding::Attached { .. })
    }

    /// Shows the control in its own container.
    pub fn show(&self) -> FormResult<()> {
        let container = self.spec.container_id.clone();
        self.show_in(&container)
    }

    /// Renders the markup into `container` and attaches the widgets,
    /// creating them on first use. No-op while already visible.
    pub fn show_in(&self, container: &ElementId) -> FormResult<()> {
        if self.inner.borrow().visible {
            return Ok(());
        }
        self.mount(container)?;
        let mut inner = self.inner.borrow_mut();
        inner.visible = true;
        inner.container = Some(container.clone());
        debug!(field = %self.spec.name, container = %container, "control shown");
        Ok(())
    }

    /// Clears the container. The widgets are kept for the next `show`.
    pub fn hide(&self) -> FormResult<()> {
        let container = {
            let mut inner = self.inner.borrow_mut();
            if !inner.visible {
                return Ok(());
            }
            inner.visible = false;
            inner.container.take()
        };
        if let Some(container) = container {
            self.toolkit.render(&container, "")?;
        }
        Ok(())
    }

    fn mount(&self, target: &ElementId) -> FormResult<()> {
        self.toolkit.render(target, &self.factory.markup(&self.spec))?;
        let detached = {
            let inner = self.inner.borrow();
            match &inner.binding {
                Binding::Detached { cached } => Some((cached.clone(), inner.enabled, inner.handlers.clone())),
                Binding::Attached { .. } => None,
            }
        };
        if let Some((cached, enabled, handlers)) = detached {
            let widgets = self.create_widgets(&cached, enabled, &handlers)?;
            let mut inner = self.inner.borrow_mut();
            let cached = std::mem::take(inner.binding.cached_mut());
            inner.binding = Binding::Attached { cached, widgets };
        }
        self.with_widgets(|widgets| {
            widgets
                .iter_mut()
                .try_for_each(|mounted| mounted.widget.append_to(&mounted.target))
        })
        .transpose()?;
        Ok(())
    }

    /// Runs `f` on the live widgets with no borrow of the control held, so
    /// widget events may call back into the control. Returns `None` when
    /// detached, or when the widgets are already out for another call.
    fn with_widgets<R>(&self, f: impl FnOnce(&mut Vec<MountedWidget>) -> R) -> Option<R> {
        let mut widgets = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &mut inner.binding {
                Binding::Attached { widgets, .. } if !inner.lent => {
                    inner.lent = true;
                    std::mem::take(widgets)
                }
                _ => return None,
            }
        };
        let result = f(&mut widgets);
        let orphaned = {
            let mut inner = self.inner.borrow_mut();
            inner.lent = false;
            match &mut inner.binding {
                Binding::Attached { widgets: slot, .. } => {
                    widgets.append(slot);
                    *slot = widgets;
                    None
                }
                Binding::Detached { .. } => Some(widgets),
            }
        };
        // Destroyed while the widgets were out.
        if let Some(mut orphaned) = orphaned {
            orphaned.iter_mut().for_each(|mounted| mounted.widget.destroy());
        }
        Some(result)
    }

    fn create_widgets(
        &self,
        cached: &FieldValue,
        enabled: bool,
        handlers: &[(EventType, EventHandler)],
    ) -> FormResult<Vec<MountedWidget>> {
        let mut widgets = self.factory.create(self.toolkit.as_ref(), &self.spec)?;
        if self.factory.syncs_from_widget() {
            self.factory.write(&mut widgets, self.codec.to_widget(cached));
        }
        let flag = self.factory.enabled_flag();
        let change = self.change_handler();
        for mounted in widgets.iter_mut() {
            flag.write(mounted.widget.as_mut(), enabled);
            if let Some(change) = &change {
                mounted.widget.on(EventType::Change, Rc::clone(change));
            }
            for (event, handler) in handlers {
                mounted.widget.on(*event, Rc::clone(handler));
            }
        }
        debug!(field = %self.spec.name, count = widgets.len(), "widgets created");
        Ok(widgets)
    }

    fn change_handler(&self) -> Option<EventHandler> {
        self.spec.on_change.as_ref()?;
        let spec = Rc::clone(&self.spec);
        let codec = Rc::clone(&self.codec);
        Some(Rc::new(move |event: &WidgetEvent| {
            dispatch_change(&spec, codec.as_ref(), event);
        }))
    }

    /// Registers an extra widget event handler, on current and future widgets.
    pub fn add_handler(&self, event: EventType, handler: EventHandler) {
        self.inner.borrow_mut().handlers.push((event, Rc::clone(&handler)));
        self.with_widgets(|widgets| {
            for mounted in widgets.iter_mut() {
                mounted.widget.on(event, Rc::clone(&handler));
            }
        });
    }

    /// Runs `f` on each live widget; returns false when detached.
    pub fn update_widgets(&self, mut f: impl FnMut(&mut dyn Widget)) -> bool {
        self.with_widgets(|widgets| {
            for mounted in widgets.iter_mut() {
                f(mounted.widget.as_mut());
            }
        })
        .is_some()
    }

    fn cached(&self) -> FieldValue {
        self.inner.borrow().binding.cached().clone()
    }

    pub fn value(&self) -> FormResult<FieldValue> {
        if !self.factory.syncs_from_widget() {
            return Ok(self.cached());
        }
        let Some(raw) = self.with_widgets(|widgets| self.factory.read(widgets)) else {
            return Ok(self.cached());
        };
        let value = self.codec.from_widget(&self.spec.name, raw)?;
        *self.inner.borrow_mut().binding.cached_mut() = value.clone();
        Ok(value)
    }

    /// Stores the value, then pushes it to a live widget. Change events the
    /// widget raises on the write already read the new value.
    pub fn set_value(&self, value: impl Into<FieldValue>) -> FormResult<()> {
        let value = self.codec.normalize(&self.spec.name, value.into())?;
        *self.inner.borrow_mut().binding.cached_mut() = value.clone();
        if self.factory.syncs_from_widget() {
            self.with_widgets(|widgets| self.factory.write(widgets, self.codec.to_widget(&value)));
        }
        Ok(())
    }

    /// Record representation of the current value.
    pub fn serialized(&self) -> FormResult<Value> {
        Ok(self.value()?.to_json())
    }

    pub fn enabled(&self) -> bool {
        let flag = self.factory.enabled_flag();
        let live = self
            .with_widgets(|widgets| widgets.first().map(|mounted| flag.read(mounted.widget.as_ref())))
            .flatten();
        let mut inner = self.inner.borrow_mut();
        if let Some(enabled) = live {
            inner.enabled = enabled;
        }
        inner.enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let flag = self.factory.enabled_flag();
        self.inner.borrow_mut().enabled = enabled;
        self.with_widgets(|widgets| {
            for mounted in widgets.iter_mut() {
                flag.write(mounted.widget.as_mut(), enabled);
            }
        });
    }

    /// Releases the widgets, keeping their last value and enabled state in
    /// the cache. The control can be shown again afterwards.
    pub fn destroy(&self) {
        let enabled = self.enabled();
        if let Err(err) = self.value() {
            warn!(field = %self.spec.name, error = %err, "keeping cached value on destroy");
        }
        let widgets = {
            let mut inner = self.inner.borrow_mut();
            inner.enabled = enabled;
            inner.visible = false;
            inner.container = None;
            let cached = std::mem::take(inner.binding.cached_mut());
            match std::mem::replace(&mut inner.binding, Binding::Detached { cached }) {
                Binding::Attached { widgets, .. } => Some(widgets),
                Binding::Detached { .. } => None,
            }
        };
        if let Some(mut widgets) = widgets {
            widgets.iter_mut().for_each(|mounted| mounted.widget.destroy());
            debug!(field = %self.spec.name, "widgets destroyed");
        }
    }

    /// Reports a raw widget event to the change callback.
    pub fn on_change(&self, event: &WidgetEvent) {
        dispatch_change(&self.spec, self.codec.as_ref(), event);
    }

    /// Column descriptor for the tabular control, with this control as its editor.
    pub fn grid_column(&self) -> GridColumn {
        let mut column = self.factory.column(&self.spec);
        column.editor = Some(self.clone());
        column
    }

    /// Starts an in-grid edit of `row`; returns the detached editor host.
    pub fn on_cell_edit_create(&self, row: &RowView) -> ElementId {
        let host = self.toolkit.create_edit_host();
        let mut inner = self.inner.borrow_mut();
        inner.edit_host = Some(host.clone());
        inner.edit_row = Some(row.clone());
        host
    }

    pub fn on_cell_edit_read(&self) -> FormResult<FieldValue> {
        self.value()
    }

    /// Mounts a fresh widget into the edit host, seeded from `row`.
    pub fn on_cell_edit_write(&self, row: &RowView) -> FormResult<()> {
        self.destroy();
        let seed = match row.get(&self.spec.name) {
            Some(raw) => self.codec.normalize(&self.spec.name, FieldValue::from_json(raw))?,
            None => FieldValue::Null,
        };
        let existing = self.inner.borrow().edit_host.clone();
        let host = existing.unwrap_or_else(|| self.toolkit.create_edit_host());
        {
            let mut inner = self.inner.borrow_mut();
            inner.binding = Binding::Detached { cached: seed };
            inner.edit_row = Some(row.clone());
            inner.edit_host = Some(host.clone());
        }
        self.mount(&host)?;
        let mut inner = self.inner.borrow_mut();
        inner.visible = true;
        inner.container = Some(host);
        Ok(())
    }

    pub fn on_cell_edit_destroy(&self) {}

    /// Row currently under in-grid edit, if any.
    pub fn edit_row(&self) -> Option<RowView> {
        self.inner.borrow().edit_row.clone()
    }
}

fn dispatch_change(spec: &FieldSpec, codec: &dyn ValueCodec, event: &WidgetEvent) {
    let Some(callback) = &spec.on_change else {
        return;
    };
    let WidgetEvent::Change { value } = event else {
        return;
    };
    let value = if value.is_present() {
        match codec.from_widget(&spec.name, value.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(field = %spec.name, error = %err, "unreadable change value");
                None
            }
        }
    } else {
        None
    };
    callback(&FieldChange {
        name: spec.name.clone(),
        value,
    });
}

impl fmt::Debug for FieldControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("FieldControl");
        out.field("name", &self.spec.name);
        if let Ok(inner) = self.inner.try_borrow() {
            out.field("value", inner.binding.cached())
                .field("enabled", &inner.enabled)
                .field("visible", &inner.visible);
        }
        out.finish()
    }
}
