//! Input controls bound to domain values.
//!
//! A [`FieldControl`] holds one typed value and lazily owns the toolkit
//! widgets that edit it. Variants differ only in their [`ValueCodec`] and
//! [`WidgetFactory`]; see [`inputs`] for the constructors.

pub mod errors;
pub mod properties;
pub mod value;
pub mod events;
pub mod toolkit;
pub mod codec;
pub mod factory;
pub mod grid_column;
pub mod control;
pub mod form;
pub mod inputs;
pub mod headless;

pub use errors::*;
pub use properties::*;
pub use value::*;
pub use events::*;
pub use toolkit::*;
pub use codec::*;
pub use factory::*;
pub use grid_column::*;
pub use control::*;
pub use form::*;
pub use headless::{HeadlessToolkit, WidgetInspector};
