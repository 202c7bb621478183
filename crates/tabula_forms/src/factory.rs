//! Widget selection and markup, one strategy per variant.

use std::cell::RefCell;
use std::rc::Rc;

use tabula_model::LookupOption;

use crate::codec::SelectMode;
use crate::control::{FieldSpec, LabelMode};
use crate::errors::FormResult;
use crate::grid_column::GridColumn;
use crate::properties::{PropertyBag, PropertyValue};
use crate::toolkit::{props, ElementId, EnabledFlag, Primitive, Toolkit, Widget};
use crate::value::WidgetValue;

/// A live widget and the element it attaches to.
pub struct MountedWidget {
    pub target: ElementId,
    pub widget: Box<dyn Widget>,
}

impl MountedWidget {
    pub fn new(target: ElementId, widget: Box<dyn Widget>) -> Self {
        Self { target, widget }
    }
}

pub trait WidgetFactory {
    /// Markup rendered into the control's container before widgets attach.
    fn markup(&self, spec: &FieldSpec) -> String;

    fn create(&self, toolkit: &dyn Toolkit, spec: &FieldSpec) -> FormResult<Vec<MountedWidget>>;

    fn read(&self, widgets: &[MountedWidget]) -> WidgetValue {
        widgets
            .first()
            .map(|mounted| mounted.widget.value())
            .unwrap_or_default()
    }

    fn write(&self, widgets: &mut [MountedWidget], value: WidgetValue) {
        if let Some(mounted) = widgets.first_mut() {
            mounted.widget.set_value(value);
        }
    }

    fn enabled_flag(&self) -> EnabledFlag {
        EnabledFlag::Enabled
    }

    /// False when the control's cache, not the widget, owns the value.
    fn syncs_from_widget(&self) -> bool {
        true
    }

    fn column(&self, spec: &FieldSpec) -> GridColumn {
        GridColumn::new(spec.name.as_str(), spec.label.as_str()).kind("string")
    }
}

/// Label-derived properties shared by every primitive.
pub fn base_props(spec: &FieldSpec) -> PropertyBag {
    let mut bag = PropertyBag::new();
    match spec.label_mode {
        LabelMode::Shadow => bag.set(props::PLACEHOLDER, ""),
        LabelMode::Floating => {
            bag.set(props::PLACEHOLDER, spec.label.as_str());
            bag.set(props::FLOAT_LABEL, "Always");
        }
        LabelMode::Plain => bag.set(props::PLACEHOLDER, spec.label.as_str()),
    }
    bag
}

fn form_group(spec: &FieldSpec, body: &str) -> String {
    let shadow = match spec.label_mode {
        LabelMode::Shadow => format!(r#"<div class="pm-form-input-shadow-label">{}</div>"#, spec.label),
        _ => String::new(),
    };
    format!(r#"<div class="form-group pm-form-group">{}</div>{}"#, body, shadow)
}

/// Element layout of a single-widget control.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Input,
    TextArea { rows: u32 },
    Checkbox,
    Canvas { width: Option<String>, height: Option<String> },
    File,
    Message,
}

impl Markup {
    pub fn render(&self, spec: &FieldSpec) -> String {
        let id = spec.el_id.as_str();
        match self {
            Markup::Input => form_group(
                spec,
                &format!(r#"<input type="text" class="form-control" id="{id}" name="{id}">"#),
            ),
            Markup::TextArea { rows } => form_group(
                spec,
                &format!(r#"<textarea class="form-control" id="{id}" name="{id}" rows="{rows}"></textarea>"#),
            ),
            Markup::Checkbox => form_group(
                spec,
                &format!(r#"<input type="checkbox" class="form-control pm-checkbox-input" id="{id}" name="{id}">"#),
            ),
            Markup::Canvas { width, height } => {
                let mut style = String::new();
                if let Some(height) = height {
                    style.push_str(&format!("height:{};", height));
                }
                if let Some(width) = width {
                    style.push_str(&format!("width:{};", width));
                }
                format!(
                    r#"<div id="parent-{id}"><div class="form-group pm-form-group" style="{style}">{label}<br><canvas class="form-control" style="height:100%;width:100%;" id="{id}" name="{id}"></canvas></div></div>"#,
                    label = spec.label
                )
            }
            Markup::File => form_group(
                spec,
                &format!(
                    r#"<h6>{}</h6><input type="file" class="form-control" id="{id}" name="{id}">"#,
                    spec.label
                ),
            ),
            Markup::Message => format!(r#"<div id="{id}"></div>"#),
        }
    }
}

/// One primitive attached to the control's own element.
pub struct StandardFactory {
    primitive: Primitive,
    markup: Markup,
    flag: EnabledFlag,
    column: GridColumn,
    props: PropertyBag,
    syncs: bool,
}

impl StandardFactory {
    pub fn new(primitive: Primitive, markup: Markup) -> Self {
        Self {
            primitive,
            markup,
            flag: EnabledFlag::Enabled,
            column: GridColumn::default().kind("string"),
            props: PropertyBag::new(),
            syncs: true,
        }
    }

    pub fn with_enabled_flag(mut self, flag: EnabledFlag) -> Self {
        self.flag = flag;
        self
    }

    /// Column template; field and header come from the control.
    pub fn with_column(mut self, column: GridColumn) -> Self {
        self.column = column;
        self
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.props.set(key, value);
        self
    }

    pub fn cache_only(mut self) -> Self {
        self.syncs = false;
        self
    }
}

impl WidgetFactory for StandardFactory {
    fn markup(&self, spec: &FieldSpec) -> String {
        self.markup.render(spec)
    }

    fn create(&self, toolkit: &dyn Toolkit, spec: &FieldSpec) -> FormResult<Vec<MountedWidget>> {
        let mut bag = base_props(spec);
        for (key, value) in self.props.iter() {
            bag.set(key, value.clone());
        }
        let widget = toolkit.create_widget(self.primitive, bag)?;
        Ok(vec![MountedWidget::new(spec.el_id.clone(), widget)])
    }

    fn enabled_flag(&self) -> EnabledFlag {
        self.flag
    }

    fn syncs_from_widget(&self) -> bool {
        self.syncs
    }

    fn column(&self, spec: &FieldSpec) -> GridColumn {
        let mut column = self.column.clone();
        column.field = spec.name.clone();
        column.header_text = spec.label.clone();
        column.visible = true;
        column
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadioOption {
    pub value: String,
    pub label: String,
    pub el_id: ElementId,
}

impl RadioOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            el_id: ElementId::generate(),
        }
    }
}

impl From<&str> for RadioOption {
    fn from(value: &str) -> Self {
        RadioOption::new(value, value)
    }
}

/// One radio button per option, all sharing the control's name.
pub struct RadioFactory {
    options: Vec<RadioOption>,
    direction: Direction,
}

impl RadioFactory {
    pub fn new(options: Vec<RadioOption>, direction: Direction) -> Self {
        Self { options, direction }
    }

    pub fn options(&self) -> &[RadioOption] {
        &self.options
    }
}

impl WidgetFactory for RadioFactory {
    fn markup(&self, _spec: &FieldSpec) -> String {
        let spacer = match self.direction {
            Direction::Vertical => "<br>",
            Direction::Horizontal => "&nbsp;&nbsp;",
        };
        let buttons: String = self
            .options
            .iter()
            .map(|option| format!(r#"<input type="radio" class="form-control" id="{}">{}"#, option.el_id, spacer))
            .collect();
        format!(r#"<div class="form-group pm-form-group pm-radiobutton-input">{}</div>"#, buttons)
    }

    fn create(&self, toolkit: &dyn Toolkit, spec: &FieldSpec) -> FormResult<Vec<MountedWidget>> {
        self.options
            .iter()
            .map(|option| {
                let bag = PropertyBag::new()
                    .with(props::NAME, spec.name.as_str())
                    .with(props::VALUE, option.value.as_str())
                    .with(props::LABEL, option.label.as_str());
                let widget = toolkit.create_widget(Primitive::RadioButton, bag)?;
                Ok(MountedWidget::new(option.el_id.clone(), widget))
            })
            .collect()
    }

    fn read(&self, widgets: &[MountedWidget]) -> WidgetValue {
        widgets
            .iter()
            .zip(&self.options)
            .find(|(mounted, _)| mounted.widget.value() == WidgetValue::Checked(true))
            .map(|(_, option)| WidgetValue::Text(option.value.clone()))
            .unwrap_or_default()
    }

    fn write(&self, widgets: &mut [MountedWidget], value: WidgetValue) {
        let selected = match &value {
            WidgetValue::Text(s) | WidgetValue::Id(s) => Some(s.as_str()),
            _ => None,
        };
        for (mounted, option) in widgets.iter_mut().zip(&self.options) {
            mounted
                .widget
                .set_value(WidgetValue::Checked(selected == Some(option.value.as_str())));
        }
    }
}

/// Single or multi select list over a shared option list.
pub struct DropdownFactory {
    options: Rc<RefCell<Vec<LookupOption>>>,
    mode: SelectMode,
    footer: Option<String>,
}

impl DropdownFactory {
    pub fn new(options: Rc<RefCell<Vec<LookupOption>>>, mode: SelectMode) -> Self {
        Self {
            options,
            mode,
            footer: None,
        }
    }

    pub fn footer(mut self, template: impl Into<String>) -> Self {
        self.footer = Some(template.into());
        self
    }

    pub fn primitive(&self) -> Primitive {
        match self.mode {
            SelectMode::Single => Primitive::DropDownList,
            SelectMode::Multi => Primitive::MultiSelect,
        }
    }
}

impl WidgetFactory for DropdownFactory {
    fn markup(&self, spec: &FieldSpec) -> String {
        Markup::Input.render(spec)
    }

    fn create(&self, toolkit: &dyn Toolkit, spec: &FieldSpec) -> FormResult<Vec<MountedWidget>> {
        let mut bag = base_props(spec)
            .with("showClearButton", true)
            .with("allowFiltering", true)
            .with(props::DATA_SOURCE, self.options.borrow().clone());
        if self.mode == SelectMode::Multi {
            bag.set("showDropDownIcon", true);
        }
        if let Some(footer) = &self.footer {
            bag.set(props::FOOTER_TEMPLATE, footer.as_str());
        }
        let widget = toolkit.create_widget(self.primitive(), bag)?;
        Ok(vec![MountedWidget::new(spec.el_id.clone(), widget)])
    }
}
