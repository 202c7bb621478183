//! Grid views over backing models.
//!
//! A [`GridView`] resolves a view configuration into columns and toolbar
//! items, drives a [`TabularControl`] and opens edit forms for add and edit
//! actions, patching rows back when the form completes.

pub mod errors;
pub mod options;
pub mod control;
pub mod view;
pub mod schema_form;
pub mod headless;

pub use errors::*;
pub use options::*;
pub use control::*;
pub use view::*;
pub use schema_form::SchemaForm;
pub use headless::{GridInspector, HeadlessGridToolkit};
