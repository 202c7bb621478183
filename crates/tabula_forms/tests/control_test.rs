use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::json;
use tabula_forms::inputs::{self, Dropdown, LabelPosition};
use tabula_forms::{
    flags, Direction, ElementId, EventHandler, EventType, FieldChange, FieldControl, FieldSet,
    FieldSpec, FieldValue, FormError, FormResult, HeadlessToolkit, Primitive, PropertyBag,
    PropertyValue, RadioOption, SelectMode, TextAlign, Toolkit, Widget, WidgetEvent, WidgetValue,
};
use tabula_model::{LookupOption, Record, RowView};

fn setup() -> (HeadlessToolkit, ElementId) {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form-body");
    (kit, container)
}

fn row(value: serde_json::Value) -> RowView {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_date_scenario() {
    let (kit, container) = setup();
    let due = inputs::date_input(
        FieldSpec::new("due").label("Due").value("2024-03-15").container(container),
        Rc::new(kit.clone()),
    )
    .unwrap();

    due.show().unwrap();
    assert!(due.is_visible());
    assert_eq!(
        due.value().unwrap(),
        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
    );

    due.set_value(FieldValue::Null).unwrap();
    assert_eq!(due.value().unwrap(), FieldValue::Null);
    assert_eq!(kit.widget(&due.spec().el_id).unwrap().value(), WidgetValue::Empty);
}

#[test]
fn test_unmounted_control_never_creates_widgets() {
    let (kit, container) = setup();
    let name = inputs::text_input(FieldSpec::new("name").value("Acme").container(container), Rc::new(kit.clone()))
        .unwrap();

    name.set_value("Globex").unwrap();
    assert_eq!(name.value().unwrap(), FieldValue::from("Globex"));
    assert!(!name.is_mounted());
    assert_eq!(kit.live_widgets(), 0);
}

#[test]
fn test_mounted_read_follows_widget() {
    let (kit, container) = setup();
    let name = inputs::text_input(FieldSpec::new("name").value("Acme").container(container), Rc::new(kit.clone()))
        .unwrap();
    name.show().unwrap();

    let widget = kit.widget(&name.spec().el_id).unwrap();
    assert_eq!(widget.value(), WidgetValue::Text("Acme".to_string()));
    widget.input(WidgetValue::Text("Initech".to_string()));
    assert_eq!(name.value().unwrap(), FieldValue::from("Initech"));
}

#[test]
fn test_datetime_truncates_to_whole_seconds_once_mounted() {
    let (kit, container) = setup();
    let at = inputs::date_time_input(FieldSpec::new("at").container(container), Rc::new(kit.clone())).unwrap();
    let precise = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_milli_opt(10, 30, 15, 750)
        .unwrap();

    at.set_value(precise).unwrap();
    assert_eq!(at.value().unwrap(), FieldValue::DateTime(precise));

    at.show().unwrap();
    let truncated = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(10, 30, 15)
        .unwrap();
    assert_eq!(at.value().unwrap(), FieldValue::DateTime(truncated));
}

#[test]
fn test_time_keeps_hour_and_minute() {
    let (kit, container) = setup();
    let start = inputs::time_input(FieldSpec::new("start").value("09:45:31").container(container), Rc::new(kit.clone()))
        .unwrap();
    let expected = NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_hms_opt(9, 45, 0)
        .unwrap();

    assert_eq!(start.value().unwrap(), FieldValue::DateTime(expected));
    start.show().unwrap();
    assert_eq!(start.value().unwrap(), FieldValue::DateTime(expected));
}

#[test]
fn test_round_trips_once_mounted() {
    let (kit, container) = setup();
    let toolkit = Rc::new(kit.clone());
    let controls = vec![
        (inputs::text_input(FieldSpec::new("a"), toolkit.clone()).unwrap(), FieldValue::from("text")),
        (inputs::multiline_input(FieldSpec::new("b"), 4, toolkit.clone()).unwrap(), FieldValue::from("line 1\nline 2")),
        (inputs::number_input(FieldSpec::new("c"), toolkit.clone()).unwrap(), FieldValue::Number(12.5)),
        (
            inputs::checkbox_input(FieldSpec::new("d"), LabelPosition::After, toolkit.clone()).unwrap(),
            FieldValue::Bool(true),
        ),
        (
            inputs::signature_input(FieldSpec::new("e"), None, Some("120px".to_string()), toolkit.clone()).unwrap(),
            FieldValue::from("data:image/png;base64,AAAA"),
        ),
        (
            inputs::date_input(FieldSpec::new("f"), toolkit.clone()).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        ),
    ];

    for (control, value) in controls {
        control.show_in(&container).unwrap();
        control.set_value(value.clone()).unwrap();
        assert_eq!(control.value().unwrap(), value, "field {}", control.name());
        control.hide().unwrap();
    }
}

#[test]
fn test_number_text_input_is_parsed() {
    let (kit, container) = setup();
    let qty = inputs::number_input(FieldSpec::new("qty").value("42").container(container), Rc::new(kit)).unwrap();
    assert_eq!(qty.value().unwrap(), FieldValue::Number(42.0));
    assert!(matches!(
        qty.set_value("many"),
        Err(FormError::ValueConversion { .. })
    ));
}

fn assert_hide_show_keeps_state(kit: &HeadlessToolkit, control: &FieldControl, value: FieldValue, expected: FieldValue) {
    let name = control.name().to_string();
    control.set_value(value).unwrap();
    control.set_enabled(false);

    control.show().unwrap();
    let live = kit.live_widgets();
    assert!(!control.enabled(), "{name} enabled after first show");
    control.hide().unwrap();
    assert_eq!(kit.markup(&control.spec().container_id).as_deref(), Some(""), "{name}");
    control.show().unwrap();

    assert_eq!(control.value().unwrap(), expected, "{name} value");
    assert!(!control.enabled(), "{name} enabled after show again");
    assert_eq!(kit.live_widgets(), live, "{name} rebuilt its widgets");
}

#[test]
fn test_hide_show_preserves_value_and_enabled() {
    let (kit, container) = setup();
    let name = inputs::text_input(FieldSpec::new("name").container(container.clone()), Rc::new(kit.clone())).unwrap();
    name.set_value("Acme").unwrap();
    name.set_enabled(false);

    name.show().unwrap();
    assert!(!kit.widget(&name.spec().el_id).unwrap().flag(flags::ENABLED));
    name.hide().unwrap();
    assert_eq!(kit.markup(&container).as_deref(), Some(""));
    name.show().unwrap();

    assert_eq!(name.value().unwrap(), FieldValue::from("Acme"));
    assert!(!name.enabled());
    assert_eq!(kit.live_widgets(), 1);
}

#[test]
fn test_hide_show_preserves_state_for_every_variant() {
    let (kit, container) = setup();
    let toolkit: Rc<dyn Toolkit> = Rc::new(kit.clone());
    let spec = |name: &str| FieldSpec::new(name).container(container.clone());

    let agree = inputs::checkbox_input(spec("agree"), LabelPosition::After, toolkit.clone()).unwrap();
    assert_hide_show_keeps_state(&kit, &agree, FieldValue::Bool(true), FieldValue::Bool(true));
    assert!(kit.widget(&agree.spec().el_id).unwrap().flag(flags::DISABLED));

    let colour = inputs::radio_input(
        spec("colour"),
        vec!["red".into(), "green".into()],
        Direction::Horizontal,
        toolkit.clone(),
    )
    .unwrap();
    assert_hide_show_keeps_state(&kit, &colour, FieldValue::from("green"), FieldValue::from("green"));

    let size = Dropdown::from_strings(spec("size"), &["S", "M", "L"], SelectMode::Single, toolkit.clone()).unwrap();
    let medium = FieldValue::Option(LookupOption::plain("M"));
    assert_hide_show_keeps_state(&kit, &size, medium.clone(), medium);

    let sizes = Dropdown::from_strings(spec("sizes"), &["S", "M", "L"], SelectMode::Multi, toolkit.clone()).unwrap();
    let picked = FieldValue::Options(vec![LookupOption::plain("S"), LookupOption::plain("L")]);
    assert_hide_show_keeps_state(&kit, &sizes, picked.clone(), picked);

    let due = inputs::date_input(spec("due"), toolkit.clone()).unwrap();
    let date = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    assert_hide_show_keeps_state(&kit, &due, FieldValue::from("2024-03-15"), date);

    let start = inputs::time_input(spec("start"), toolkit).unwrap();
    let time = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(9, 45, 0).unwrap();
    assert_hide_show_keeps_state(&kit, &start, FieldValue::from("09:45:31"), FieldValue::DateTime(time));
}

/// Toolkit whose widgets raise `change` when their value is set from code.
struct EchoingToolkit(HeadlessToolkit);

struct EchoingWidget {
    inner: Box<dyn Widget>,
    on_change: Vec<EventHandler>,
}

impl Widget for EchoingWidget {
    fn primitive(&self) -> Primitive {
        self.inner.primitive()
    }

    fn append_to(&mut self, target: &ElementId) -> FormResult<()> {
        self.inner.append_to(target)
    }

    fn value(&self) -> WidgetValue {
        self.inner.value()
    }

    fn set_value(&mut self, value: WidgetValue) {
        self.inner.set_value(value.clone());
        let event = WidgetEvent::Change { value };
        for handler in &self.on_change {
            handler(&event);
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.inner.flag(name)
    }

    fn set_flag(&mut self, name: &str, on: bool) {
        self.inner.set_flag(name, on);
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) {
        self.inner.set_property(name, value);
    }

    fn on(&mut self, event: EventType, handler: EventHandler) {
        if event == EventType::Change {
            self.on_change.push(Rc::clone(&handler));
        }
        self.inner.on(event, handler);
    }

    fn add_item(&mut self, option: LookupOption, index: usize) {
        self.inner.add_item(option, index);
    }

    fn remove_item(&mut self, key: &str) {
        self.inner.remove_item(key);
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

impl Toolkit for EchoingToolkit {
    fn create_widget(&self, primitive: Primitive, props: PropertyBag) -> FormResult<Box<dyn Widget>> {
        Ok(Box::new(EchoingWidget {
            inner: self.0.create_widget(primitive, props)?,
            on_change: Vec::new(),
        }))
    }

    fn render(&self, container: &ElementId, markup: &str) -> FormResult<()> {
        self.0.render(container, markup)
    }

    fn create_edit_host(&self) -> ElementId {
        self.0.create_edit_host()
    }

    fn measure_height(&self, container: &ElementId) -> Option<i32> {
        self.0.measure_height(container)
    }
}

#[test]
fn test_change_callback_can_read_control_while_value_is_written() {
    let (kit, container) = setup();
    let slot: Rc<RefCell<Option<FieldControl>>> = Rc::default();
    let seen: Rc<RefCell<Vec<(FieldValue, bool)>>> = Rc::default();
    let (reader, sink) = (slot.clone(), seen.clone());
    let spec = FieldSpec::new("name").container(container).on_change(move |_| {
        if let Some(control) = reader.borrow().as_ref() {
            sink.borrow_mut().push((control.value().unwrap(), control.enabled()));
        }
    });
    let name = inputs::text_input(spec, Rc::new(EchoingToolkit(kit.clone()))).unwrap();
    *slot.borrow_mut() = Some(name.clone());

    name.show().unwrap();
    name.set_value("Acme").unwrap();
    assert_eq!(seen.borrow().last(), Some(&(FieldValue::from("Acme"), true)));

    name.set_enabled(false);
    name.set_value("Globex").unwrap();
    assert_eq!(seen.borrow().last(), Some(&(FieldValue::from("Globex"), false)));
    assert_eq!(name.value().unwrap(), FieldValue::from("Globex"));
    assert_eq!(kit.widget(&name.spec().el_id).unwrap().value(), WidgetValue::Text("Globex".to_string()));

    name.destroy();
    slot.borrow_mut().take();
}

#[test]
fn test_destroy_returns_to_detached_and_can_show_again() {
    let (kit, container) = setup();
    let name = inputs::text_input(FieldSpec::new("name").container(container), Rc::new(kit.clone())).unwrap();
    name.show().unwrap();
    let first = kit.widget(&name.spec().el_id).unwrap();
    first.input(WidgetValue::Text("typed".to_string()));

    name.destroy();
    assert!(first.is_destroyed());
    assert!(!name.is_mounted());
    assert!(!name.is_visible());
    assert_eq!(name.value().unwrap(), FieldValue::from("typed"));

    name.destroy();
    name.show().unwrap();
    let second = kit.widget(&name.spec().el_id).unwrap();
    assert_eq!(second.value(), WidgetValue::Text("typed".to_string()));
}

#[test]
fn test_checkbox_enabled_is_inverted_disabled_flag() {
    let (kit, container) = setup();
    let agree = inputs::checkbox_input(
        FieldSpec::new("agree").label("I agree").container(container),
        LabelPosition::Before,
        Rc::new(kit.clone()),
    )
    .unwrap();
    agree.show().unwrap();
    let widget = kit.widget(&agree.spec().el_id).unwrap();
    assert!(!widget.flag(flags::DISABLED));

    agree.set_enabled(false);
    assert!(widget.flag(flags::DISABLED));
    assert!(!agree.enabled());
    assert_eq!(agree.value().unwrap(), FieldValue::Bool(false));
}

#[test]
fn test_radio_group_checks_one_option() {
    let (kit, container) = setup();
    let options: Vec<RadioOption> = vec!["red".into(), "green".into(), RadioOption::new("blue", "Blue")];
    let ids: Vec<ElementId> = options.iter().map(|o| o.el_id.clone()).collect();
    let colour = inputs::radio_input(
        FieldSpec::new("colour").container(container),
        options,
        Direction::Vertical,
        Rc::new(kit.clone()),
    )
    .unwrap();
    colour.show().unwrap();

    colour.set_value("green").unwrap();
    let checked: Vec<WidgetValue> = ids.iter().map(|id| kit.widget(id).unwrap().value()).collect();
    assert_eq!(
        checked,
        vec![WidgetValue::Checked(false), WidgetValue::Checked(true), WidgetValue::Checked(false)]
    );

    kit.widget(&ids[1]).unwrap().input(WidgetValue::Checked(false));
    kit.widget(&ids[2]).unwrap().input(WidgetValue::Checked(true));
    assert_eq!(colour.value().unwrap(), FieldValue::from("blue"));
}

#[test]
fn test_missing_primitive_is_a_construction_error() {
    let (kit, container) = setup();
    kit.remove_primitive(Primitive::DatePicker);
    let due = inputs::date_input(FieldSpec::new("due").value("2024-03-15").container(container), Rc::new(kit.clone()))
        .unwrap();

    let err = due.show().unwrap_err();
    assert!(matches!(err, FormError::WidgetConstruction { .. }));
    assert!(!due.is_mounted());
    assert!(!due.is_visible());
    assert!(due.value().unwrap().as_date().is_some());
}

#[test]
fn test_bad_date_names_field() {
    let (kit, _) = setup();
    let err = inputs::date_input(FieldSpec::new("due").value("15/03/2024"), Rc::new(kit)).unwrap_err();
    match err {
        FormError::ValueConversion { field, input } => {
            assert_eq!(field, "due");
            assert_eq!(input, "15/03/2024");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_container() {
    let kit = HeadlessToolkit::new();
    let name = inputs::text_input(FieldSpec::new("name").container("nowhere"), Rc::new(kit)).unwrap();
    assert!(matches!(name.show(), Err(FormError::ContainerNotFound(_))));
}

#[test]
fn test_change_callback_reports_value_or_none() {
    let (kit, container) = setup();
    let seen: Rc<RefCell<Vec<FieldChange>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let name = inputs::text_input(
        FieldSpec::new("name")
            .container(container)
            .on_change(move |change| sink.borrow_mut().push(change.clone())),
        Rc::new(kit.clone()),
    )
    .unwrap();
    name.show().unwrap();

    let widget = kit.widget(&name.spec().el_id).unwrap();
    widget.input(WidgetValue::Text("Acme".to_string()));
    widget.input(WidgetValue::Text(String::new()));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].name, "name");
    assert_eq!(seen[0].value, Some(FieldValue::from("Acme")));
    assert_eq!(seen[1].value, None);
}

#[test]
fn test_cell_edit_hooks() {
    let (kit, _) = setup();
    let city = inputs::text_input(FieldSpec::new("city").label("City"), Rc::new(kit.clone())).unwrap();
    let first = row(json!({"uid": "r1", "city": "Oslo"}));

    let host = city.on_cell_edit_create(&first);
    assert!(kit.element_exists(&host));
    city.on_cell_edit_write(&first).unwrap();
    let widget = kit.widget(&city.spec().el_id).unwrap();
    assert_eq!(widget.value(), WidgetValue::Text("Oslo".to_string()));

    widget.input(WidgetValue::Text("Bergen".to_string()));
    assert_eq!(city.on_cell_edit_read().unwrap(), FieldValue::from("Bergen"));
    city.on_cell_edit_destroy();

    let second = row(json!({"uid": "r2"}));
    city.on_cell_edit_write(&second).unwrap();
    assert!(widget.is_destroyed());
    assert_eq!(city.value().unwrap(), FieldValue::Null);
    assert_eq!(kit.live_widgets(), 1);
    assert_eq!(city.edit_row(), Some(second));
}

#[test]
fn test_grid_column_hints() {
    let (kit, _) = setup();
    let amount = inputs::number_input(FieldSpec::new("amount").label("Amount"), Rc::new(kit.clone())).unwrap();
    let column = amount.grid_column();
    assert_eq!(column.field, "amount");
    assert_eq!(column.header_text, "Amount");
    assert_eq!(column.kind.as_deref(), Some("number"));
    assert_eq!(column.text_align, Some(TextAlign::Right));
    assert_eq!(column.format.as_deref(), Some("C2"));
    assert!(column.editor.is_some());

    let paid = inputs::checkbox_input(FieldSpec::new("paid"), LabelPosition::After, Rc::new(kit)).unwrap();
    assert!(paid.grid_column().display_as_checkbox);
}

#[test]
fn test_inline_message_rerenders_and_is_not_saved() {
    let (kit, container) = setup();
    let toolkit = Rc::new(kit.clone());
    let note = inputs::inline_message(FieldSpec::new("note").value("Saved").container(container.clone()), toolkit.clone())
        .unwrap();
    let name = inputs::text_input(FieldSpec::new("name").value("Acme").container(container), toolkit).unwrap();
    assert!(!note.saves());

    note.show().unwrap();
    note.set_value("Saving failed").unwrap();
    assert_eq!(
        kit.widget(&note.spec().el_id).unwrap().value(),
        WidgetValue::Text("Saving failed".to_string())
    );

    let form = FieldSet::new("CustomerForm").with(note).with(name);
    let values = form.values().unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values.get("name"), Some(&json!("Acme")));
}

#[test]
fn test_field_set_load_and_apply() {
    let (kit, _) = setup();
    let toolkit = Rc::new(kit);
    let form = FieldSet::new("InvoiceForm")
        .with(inputs::text_input(FieldSpec::new("number"), toolkit.clone()).unwrap())
        .with(inputs::date_input(FieldSpec::new("due"), toolkit.clone()).unwrap());

    let record = Record::new("i1").with("number", "INV-7").with("due", "2024-03-15");
    form.load(&record).unwrap();

    let mut saved = Record::new("i1");
    form.apply_to(&mut saved).unwrap();
    assert_eq!(saved.get("number"), Some(&json!("INV-7")));
    assert_eq!(saved.get("due"), Some(&json!("2024-03-15")));
}
