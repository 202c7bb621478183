use std::rc::Rc;

use tabula_forms::{ElementId, FormResult, Toolkit};
use tabula_model::RowView;

use crate::options::GridOptions;

/// A constructed tabular control. Row mutations are applied by the owning
/// [`GridView`](crate::GridView) only after the backing store agreed.
pub trait TabularControl {
    /// Mounts the control into an existing element.
    fn append_to(&mut self, target: &ElementId) -> FormResult<()>;

    fn set_data_source(&mut self, rows: Vec<RowView>);

    fn add_record(&mut self, row: RowView, index: usize);

    /// Replaces the row whose primary key is `key`.
    fn set_row_data(&mut self, key: &str, row: RowView);

    fn remove_records(&mut self, keys: &[String]);

    /// Cancels the control's built-in edit dialog.
    fn close_dialog(&mut self);

    fn style_toolbar_item(&mut self, key: &str, css_class: Option<&str>, style: Option<&str>);

    fn set_toolbar_item_visible(&mut self, id: &str, visible: bool);

    fn destroy(&mut self);
}

/// Creates tabular controls and hands out the widget toolkit used by the
/// edit forms a grid opens.
pub trait GridToolkit {
    fn create_grid(&self, options: GridOptions) -> FormResult<Box<dyn TabularControl>>;

    fn widgets(&self) -> Rc<dyn Toolkit>;
}
