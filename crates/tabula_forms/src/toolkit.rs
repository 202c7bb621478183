//! Seam to the third-party widget toolkit.
//!
//! The toolkit renders markup into containers and instantiates widget
//! primitives. Everything above this module talks to widgets only through
//! [`Widget`] and [`Toolkit`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tabula_model::LookupOption;

use crate::errors::FormResult;
use crate::events::{EventHandler, EventType};
use crate::properties::{PropertyBag, PropertyValue};
use crate::value::WidgetValue;

/// Identifier of a rendered element or container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id that is a valid element id (starts with a letter).
    pub fn generate() -> Self {
        Self(format!("q{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CSS selector for this element.
    pub fn selector(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Widget primitives the toolkit must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    TextBox,
    NumericTextBox,
    DatePicker,
    DateTimePicker,
    TimePicker,
    CheckBox,
    RadioButton,
    DropDownList,
    MultiSelect,
    Signature,
    Uploader,
    /// Static content area, not an input.
    Content,
}

impl Primitive {
    pub fn as_str(&self) -> &str {
        match self {
            Primitive::TextBox => "inputs.TextBox",
            Primitive::NumericTextBox => "inputs.NumericTextBox",
            Primitive::DatePicker => "calendars.DatePicker",
            Primitive::DateTimePicker => "calendars.DateTimePicker",
            Primitive::TimePicker => "calendars.TimePicker",
            Primitive::CheckBox => "buttons.CheckBox",
            Primitive::RadioButton => "buttons.RadioButton",
            Primitive::DropDownList => "dropdowns.DropDownList",
            Primitive::MultiSelect => "dropdowns.MultiSelect",
            Primitive::Signature => "inputs.Signature",
            Primitive::Uploader => "inputs.Uploader",
            Primitive::Content => "content",
        }
    }

    pub fn all() -> Vec<Primitive> {
        vec![
            Primitive::TextBox,
            Primitive::NumericTextBox,
            Primitive::DatePicker,
            Primitive::DateTimePicker,
            Primitive::TimePicker,
            Primitive::CheckBox,
            Primitive::RadioButton,
            Primitive::DropDownList,
            Primitive::MultiSelect,
            Primitive::Signature,
            Primitive::Uploader,
            Primitive::Content,
        ]
    }
}

/// Well-known widget flags.
pub mod flags {
    pub const ENABLED: &str = "enabled";
    pub const DISABLED: &str = "disabled";
}

/// Well-known widget properties.
pub mod props {
    pub const PLACEHOLDER: &str = "placeholder";
    pub const FLOAT_LABEL: &str = "floatLabelType";
    pub const DATA_SOURCE: &str = "dataSource";
    pub const FOOTER_TEMPLATE: &str = "footerTemplate";
    pub const LABEL: &str = "label";
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
}

/// One live toolkit widget.
pub trait Widget {
    fn primitive(&self) -> Primitive;

    /// Attaches the widget to a rendered element.
    fn append_to(&mut self, target: &ElementId) -> FormResult<()>;

    fn value(&self) -> WidgetValue;

    fn set_value(&mut self, value: WidgetValue);

    fn flag(&self, name: &str) -> bool;

    fn set_flag(&mut self, name: &str, on: bool);

    fn set_property(&mut self, name: &str, value: PropertyValue);

    fn on(&mut self, event: EventType, handler: EventHandler);

    /// Inserts an entry into a list widget's data source.
    fn add_item(&mut self, option: LookupOption, index: usize);

    /// Drops an entry from a list or uploader widget.
    fn remove_item(&mut self, key: &str);

    fn destroy(&mut self);
}

/// Entry points of the widget toolkit.
pub trait Toolkit {
    /// Instantiates a primitive; fails when the toolkit lacks it.
    fn create_widget(&self, primitive: Primitive, props: PropertyBag) -> FormResult<Box<dyn Widget>>;

    /// Replaces the content of a container with `markup`.
    fn render(&self, container: &ElementId, markup: &str) -> FormResult<()>;

    /// Creates a detached element used as an in-grid editor host.
    fn create_edit_host(&self) -> ElementId;

    /// Rendered height of a container in pixels.
    fn measure_height(&self, container: &ElementId) -> Option<i32>;
}

/// How a control's `enabled` maps onto a widget flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledFlag {
    Enabled,
    /// The widget exposes `disabled`; `enabled` is its negation.
    Disabled,
}

impl EnabledFlag {
    pub fn read(&self, widget: &dyn Widget) -> bool {
        match self {
            EnabledFlag::Enabled => widget.flag(flags::ENABLED),
            EnabledFlag::Disabled => !widget.flag(flags::DISABLED),
        }
    }

    pub fn write(&self, widget: &mut dyn Widget, enabled: bool) {
        match self {
            EnabledFlag::Enabled => widget.set_flag(flags::ENABLED, enabled),
            EnabledFlag::Disabled => widget.set_flag(flags::DISABLED, !enabled),
        }
    }
}
