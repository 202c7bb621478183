use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use tabula_forms::{FieldValue, HeadlessToolkit, Toolkit};
use tabula_grid::{GridError, SchemaForm};
use tabula_model::{
    AppContext, BackingModel, DataModels, EditFormLauncher, FieldType, FormAction, FormRequest,
    LookupOption, MemoryModel, ModelError, ModelSchema, Record,
};

fn setup() -> (Rc<MemoryModel>, SchemaForm, HeadlessToolkit) {
    let orders = Rc::new(
        MemoryModel::new(
            ModelSchema::new("SalesOrder")
                .title("number")
                .attribute("number", FieldType::String)
                .attribute("amount", FieldType::Number)
                .attribute("rush", FieldType::Boolean)
                .attribute("attachments", FieldType::Files)
                .computed("total", FieldType::Number)
                .relationship("customer", "Customer"),
        )
        .with_records(vec![Record::new("o1")
            .with("number", "SO-1")
            .with("amount", 10.0)
            .with("rush", true)
            .with("customer", json!({"uid": "c1", "name": "Acme"}))]),
    );
    let customers = Rc::new(
        MemoryModel::new(
            ModelSchema::new("Customer")
                .title("name")
                .attribute("name", FieldType::String),
        )
        .with_records(vec![
            Record::new("c1").with("name", "Acme"),
            Record::new("c2").with("name", "Globex"),
        ]),
    );
    let context = AppContext::new(DataModels::new().with(orders.clone()).with(customers));
    let kit = HeadlessToolkit::new();
    let toolkit: Rc<dyn Toolkit> = Rc::new(kit.clone());
    (orders, SchemaForm::new(context, toolkit), kit)
}

type Completions = Rc<RefCell<Vec<(String, FormAction)>>>;

fn request(record: Option<Record>, action: FormAction) -> (FormRequest, Completions) {
    let completions: Completions = Rc::default();
    let sink = completions.clone();
    let request = FormRequest {
        model: "SalesOrder".to_string(),
        action,
        record,
        modal: true,
        target: None,
        on_complete: Rc::new(move |record: &Record, action: FormAction| {
            sink.borrow_mut().push((record.uid.clone(), action));
        }),
    };
    (request, completions)
}

#[test]
fn test_fields_follow_model_metadata() {
    let (_, form, kit) = setup();
    let (request, _) = request(None, FormAction::Add);
    form.open(request).unwrap();

    let fields = form.fields().unwrap();
    let names: Vec<&str> = fields.controls().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["number", "amount", "rush", "customer"]);
    assert_eq!(fields.get("amount").unwrap().label(), "Amount");

    let host = form.host().unwrap();
    let markup = kit.markup(&host).unwrap();
    assert!(markup.contains(fields.get("number").unwrap().spec().container_id.as_str()));
    assert!(fields.controls().iter().all(|c| c.is_mounted()));
}

#[test]
fn test_edit_loads_record_and_saves_changes() {
    let (orders, form, _) = setup();
    let existing = orders.get("o1").unwrap();
    let (request, completions) = request(existing, FormAction::Edit);
    form.open(request).unwrap();

    let fields = form.fields().unwrap();
    assert_eq!(fields.get("number").unwrap().value().unwrap(), FieldValue::from("SO-1"));
    assert_eq!(fields.get("rush").unwrap().value().unwrap(), FieldValue::Bool(true));
    assert_eq!(
        fields.get("customer").unwrap().value().unwrap(),
        FieldValue::Option(LookupOption::new("Acme", "c1"))
    );

    fields.get("number").unwrap().set_value("SO-1b").unwrap();
    let saved = form.submit().unwrap();

    assert_eq!(saved.uid, "o1");
    assert_eq!(orders.get("o1").unwrap().unwrap().get("number"), Some(&json!("SO-1b")));
    assert_eq!(*completions.borrow(), vec![("o1".to_string(), FormAction::Edit)]);
    assert!(!form.is_open());
}

#[test]
fn test_add_saves_new_record() {
    let (orders, form, _) = setup();
    let (request, completions) = request(None, FormAction::Add);
    form.open(request).unwrap();

    let fields = form.fields().unwrap();
    fields.get("number").unwrap().set_value("SO-7").unwrap();
    fields.get("amount").unwrap().set_value(7.5).unwrap();
    let saved = form.submit().unwrap();

    assert!(!saved.uid.is_empty());
    assert_eq!(orders.len(), 2);
    assert_eq!(saved.get("amount"), Some(&json!(7.5)));
    assert_eq!(completions.borrow()[0].1, FormAction::Add);
}

#[test]
fn test_failed_save_keeps_form_open() {
    let (orders, form, _) = setup();
    let (request, completions) = request(None, FormAction::Add);
    form.open(request).unwrap();

    orders.set_available(false);
    let err = form.submit().unwrap_err();
    assert!(matches!(err, GridError::Model(ModelError::BackingStore(_))));
    assert!(form.is_open());
    assert!(completions.borrow().is_empty());

    orders.set_available(true);
    form.submit().unwrap();
    assert_eq!(completions.borrow().len(), 1);
}

#[test]
fn test_submit_without_open_form() {
    let (_, form, _) = setup();
    assert!(matches!(form.submit(), Err(GridError::InvalidState(_))));
}

#[test]
fn test_unknown_model_fails_to_open() {
    let (_, form, _) = setup();
    let (mut request, _) = request(None, FormAction::Add);
    request.model = "Invoice".to_string();

    let err = form.open(request).unwrap_err();
    assert!(matches!(err, ModelError::EditForm(_)));
    assert!(!form.is_open());
}
