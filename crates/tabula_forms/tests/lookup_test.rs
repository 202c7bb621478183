use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::json;
use tabula_forms::inputs::{Dropdown, Lookup, LookupConfig};
use tabula_forms::{
    props, FieldSpec, FieldValue, FormError, HeadlessToolkit, SelectMode, WidgetEvent, WidgetValue,
};
use tabula_model::{
    AppContext, DataModels, EditFormLauncher, FieldType, FormAction, FormRequest, LookupOption,
    MemoryModel, ModelResult, ModelSchema, Record, RowView,
};

/// Edit form stand-in that remembers the last request.
#[derive(Default)]
struct RecordingForm {
    requests: RefCell<Vec<FormRequest>>,
}

impl EditFormLauncher for RecordingForm {
    fn open(&self, request: FormRequest) -> ModelResult<()> {
        self.requests.borrow_mut().push(request);
        Ok(())
    }
}

fn customers() -> MemoryModel {
    MemoryModel::new(
        ModelSchema::new("Customer")
            .attribute("name", FieldType::String)
            .attribute("city", FieldType::String),
    )
    .with_records(vec![
        Record::new("c1").with("name", "Globex").with("city", "Oslo"),
        Record::new("c2").with("name", "Initech").with("city", "Bergen"),
    ])
}

fn context(form: Rc<RecordingForm>) -> AppContext {
    AppContext::new(DataModels::new().with(Rc::new(customers()))).with_form("CustomerForm", form)
}

fn colours() -> Vec<LookupOption> {
    vec![
        LookupOption::new("Red", "r"),
        LookupOption::new("Green", "g"),
        LookupOption::new("Blue", "b"),
    ]
}

#[test]
fn test_dropdown_single_round_trip() {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form");
    let colour = Dropdown::new(
        FieldSpec::new("colour").container(container),
        colours(),
        SelectMode::Single,
        Rc::new(kit.clone()),
    )
    .unwrap();
    colour.show().unwrap();

    colour.set_value(LookupOption::new("Green", "g")).unwrap();
    assert_eq!(kit.widget(&colour.spec().el_id).unwrap().value(), WidgetValue::Id("g".to_string()));
    assert_eq!(colour.value().unwrap(), FieldValue::Option(LookupOption::new("Green", "g")));

    colour.set_value("b").unwrap();
    assert_eq!(colour.value().unwrap().as_option().map(|o| o.name.as_str()), Some("Blue"));
    assert!(matches!(colour.set_value("x"), Err(FormError::ValueConversion { .. })));
}

#[test]
fn test_dropdown_multi_membership() {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form");
    let colours_dd = Dropdown::new(
        FieldSpec::new("colours").container(container),
        colours(),
        SelectMode::Multi,
        Rc::new(kit.clone()),
    )
    .unwrap();
    colours_dd.show().unwrap();

    let chosen = vec![LookupOption::new("Blue", "b"), LookupOption::new("Red", "r")];
    colours_dd.set_value(chosen.clone()).unwrap();
    let read: HashSet<LookupOption> = colours_dd
        .value()
        .unwrap()
        .as_options()
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(read, chosen.into_iter().collect::<HashSet<_>>());
}

#[test]
fn test_dropdown_plain_strings_and_option_refresh() {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form");
    let size = Dropdown::from_strings(
        FieldSpec::new("size").container(container),
        &["S", "M", "L"],
        SelectMode::Single,
        Rc::new(kit.clone()),
    )
    .unwrap();
    size.show().unwrap();
    size.set_value("M").unwrap();
    assert_eq!(size.value().unwrap(), FieldValue::Option(LookupOption::plain("M")));

    size.set_options(vec![LookupOption::plain("XL")]);
    let widget = kit.widget(&size.spec().el_id).unwrap();
    assert_eq!(widget.items(), vec![LookupOption::plain("XL")]);
    assert!(widget.property(props::DATA_SOURCE).is_some());
}

#[test]
fn test_lookup_loads_options_from_model() {
    let kit = HeadlessToolkit::new();
    let ctx = context(Rc::new(RecordingForm::default()));
    let customer = Lookup::new(FieldSpec::new("customer"), LookupConfig::new("Customer"), &ctx, Rc::new(kit))
        .unwrap();

    assert_eq!(
        customer.options(),
        vec![LookupOption::new("Globex", "c1"), LookupOption::new("Initech", "c2")]
    );
}

#[test]
fn test_lookup_prefers_enumeration_and_computes_text() {
    let kit = HeadlessToolkit::new();
    let ctx = context(Rc::new(RecordingForm::default()))
        .with_enumeration("Status", vec![LookupOption::new("Open", "open")]);
    let status = Lookup::new(FieldSpec::new("status"), LookupConfig::new("Status"), &ctx, Rc::new(kit.clone()))
        .unwrap();
    assert_eq!(status.options(), vec![LookupOption::new("Open", "open")]);

    let config = LookupConfig::new("Customer")
        .compute_option(|row: &RowView| {
            format!(
                "{} ({})",
                row.get("name").and_then(|v| v.as_str()).unwrap_or_default(),
                row.get("city").and_then(|v| v.as_str()).unwrap_or_default()
            )
        })
        .data(vec![json!({"uid": "c9", "name": "Umbrella", "city": "Raccoon"})
            .as_object()
            .cloned()
            .unwrap()]);
    let customer = Lookup::new(FieldSpec::new("customer"), config, &ctx, Rc::new(kit)).unwrap();
    assert_eq!(customer.options(), vec![LookupOption::new("Umbrella (Raccoon)", "c9")]);
}

#[test]
fn test_lookup_add_item_scenario() {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form");
    let form = Rc::new(RecordingForm::default());
    let ctx = context(Rc::clone(&form));
    let customer = Lookup::new(
        FieldSpec::new("customer").container(container),
        LookupConfig::new("Customer"),
        &ctx,
        Rc::new(kit.clone()),
    )
    .unwrap();
    customer.show().unwrap();

    let footer_id = customer.add_item_id().cloned().unwrap();
    let widget = kit.widget(&customer.spec().el_id).unwrap();
    assert!(widget
        .property(props::FOOTER_TEMPLATE)
        .and_then(|p| p.as_text().map(|s| s.contains(footer_id.as_str())))
        .unwrap_or(false));

    widget.fire(&WidgetEvent::FooterClick {
        target: footer_id.to_string(),
    });
    let request = form.requests.borrow_mut().pop().unwrap();
    assert_eq!(request.model, "Customer");
    assert_eq!(request.action, FormAction::Add);
    assert!(request.modal);
    assert!(request.record.is_none());

    let created = Record::new("x1").with("name", "Acme");
    (request.on_complete)(&created, FormAction::Add);

    let acme = LookupOption::new("Acme", "x1");
    assert_eq!(customer.options()[0], acme);
    assert_eq!(widget.items()[0], acme);
    assert_eq!(customer.value().unwrap(), FieldValue::Option(acme));
}

#[test]
fn test_lookup_multi_appends_new_item_to_selection() {
    let kit = HeadlessToolkit::new();
    let container = kit.add_container("form");
    let ctx = context(Rc::new(RecordingForm::default()));
    let customers = Lookup::new(
        FieldSpec::new("customers")
            .container(container)
            .value(vec![LookupOption::new("Globex", "c1")]),
        LookupConfig::new("Customer").multi(),
        &ctx,
        Rc::new(kit),
    )
    .unwrap();
    customers.show().unwrap();

    customers
        .new_item(&Record::new("x1").with("name", "Acme"), FormAction::Add)
        .unwrap();
    let selected = customers.value().unwrap();
    let uids: Vec<&str> = selected.as_options().unwrap().iter().map(|o| o.uid.as_str()).collect();
    assert_eq!(uids, vec!["c1", "x1"]);
}

#[test]
fn test_lookup_without_form_has_no_footer() {
    let kit = HeadlessToolkit::new();
    let ctx = AppContext::new(DataModels::new().with(Rc::new(customers())));
    let customer = Lookup::new(FieldSpec::new("customer"), LookupConfig::new("Customer"), &ctx, Rc::new(kit))
        .unwrap();
    assert!(customer.add_item_id().is_none());
    assert!(matches!(customer.open_add_item(), Err(FormError::NotConfigured(_))));
}

#[test]
fn test_lookup_set_data_refreshes_options() {
    let kit = HeadlessToolkit::new();
    let ctx = context(Rc::new(RecordingForm::default()));
    let customer = Lookup::new(
        FieldSpec::new("customer"),
        LookupConfig::new("Customer").text_field("name.first").without_data(),
        &ctx,
        Rc::new(kit),
    )
    .unwrap();
    assert!(customer.options().is_empty());

    customer.set_data(&[json!({"uid": "p1", "name": "Ada"}).as_object().cloned().unwrap()]);
    assert_eq!(customer.options(), vec![LookupOption::new("Ada", "p1")]);
}
