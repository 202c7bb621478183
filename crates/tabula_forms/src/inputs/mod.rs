//! Constructors for every input variant.
//!
//! Each variant is a [`FieldControl`] composed with a codec and a widget
//! factory. Dropdown, Lookup and FileUpload add behavior on top and get
//! their own handle types.

use std::rc::Rc;

use crate::codec::{
    CheckboxCodec, DateCodec, DateTimeCodec, NumberCodec, PayloadCodec, TextCodec, TimeCodec,
};
use crate::control::{FieldControl, FieldSpec};
use crate::errors::FormResult;
use crate::factory::{Direction, Markup, RadioFactory, RadioOption, StandardFactory};
use crate::grid_column::{GridColumn, TextAlign};
use crate::toolkit::{props, EnabledFlag, Primitive, Toolkit};

pub mod dropdown;
pub mod lookup;
pub mod upload;

pub use dropdown::Dropdown;
pub use lookup::{ComputeOption, Lookup, LookupConfig};
pub use upload::FileUpload;

pub const DATE_FORMAT: &str = "dd/MM/yyyy";
pub const DATETIME_FORMAT: &str = "dd/MM/yyyy hh:mm a";
pub const TIME_FORMAT: &str = "hh:mm a";

pub fn text_input(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::TextBox, Markup::Input);
    FieldControl::new(spec, Rc::new(TextCodec), Rc::new(factory), toolkit)
}

pub fn multiline_input(spec: FieldSpec, rows: u32, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::TextBox, Markup::TextArea { rows }).prop("multiline", true);
    FieldControl::new(spec, Rc::new(TextCodec), Rc::new(factory), toolkit)
}

pub fn number_input(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::NumericTextBox, Markup::Input)
        .prop("showSpinButton", false)
        .with_column(GridColumn::default().kind("number").align(TextAlign::Right).format("C2"));
    FieldControl::new(spec, Rc::new(NumberCodec), Rc::new(factory), toolkit)
}

pub fn date_input(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::DatePicker, Markup::Input)
        .with_column(GridColumn::default().kind("date").format(DATE_FORMAT));
    FieldControl::new(spec, Rc::new(DateCodec), Rc::new(factory), toolkit)
}

/// Date-time input. Values reach the widget truncated to whole seconds.
pub fn date_time_input(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::DateTimePicker, Markup::Input)
        .with_column(GridColumn::default().kind("dateTime").format(DATETIME_FORMAT));
    FieldControl::new(spec, Rc::new(DateTimeCodec), Rc::new(factory), toolkit)
}

pub fn time_input(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::TimePicker, Markup::Input)
        .with_column(GridColumn::default().kind("dateTime").format(TIME_FORMAT));
    FieldControl::new(spec, Rc::new(TimeCodec), Rc::new(factory), toolkit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPosition {
    Before,
    #[default]
    After,
}

impl LabelPosition {
    pub fn as_str(&self) -> &str {
        match self {
            LabelPosition::Before => "Before",
            LabelPosition::After => "After",
        }
    }
}

pub fn checkbox_input(
    spec: FieldSpec,
    position: LabelPosition,
    toolkit: Rc<dyn Toolkit>,
) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::CheckBox, Markup::Checkbox)
        .with_enabled_flag(EnabledFlag::Disabled)
        .prop(props::LABEL, spec.label.as_str())
        .prop("labelPosition", position.as_str())
        .prop("cssClass", "pm-checkbox-input")
        .with_column(GridColumn::default().kind("boolean").checkbox());
    FieldControl::new(spec, Rc::new(CheckboxCodec), Rc::new(factory), toolkit)
}

/// Radio group; the option set is fixed once built.
pub fn radio_input(
    spec: FieldSpec,
    options: Vec<RadioOption>,
    direction: Direction,
    toolkit: Rc<dyn Toolkit>,
) -> FormResult<FieldControl> {
    let factory = RadioFactory::new(options, direction);
    FieldControl::new(spec, Rc::new(PayloadCodec), Rc::new(factory), toolkit)
}

pub fn signature_input(
    spec: FieldSpec,
    width: Option<String>,
    height: Option<String>,
    toolkit: Rc<dyn Toolkit>,
) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::Signature, Markup::Canvas { width, height });
    FieldControl::new(spec, Rc::new(PayloadCodec), Rc::new(factory), toolkit)
}

/// Static message area; never saved with the record.
pub fn inline_message(spec: FieldSpec, toolkit: Rc<dyn Toolkit>) -> FormResult<FieldControl> {
    let factory = StandardFactory::new(Primitive::Content, Markup::Message);
    FieldControl::new(spec.save(false), Rc::new(PayloadCodec), Rc::new(factory), toolkit)
}
