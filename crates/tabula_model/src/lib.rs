//! Record, metadata and collaborator layer for tabula.
//!
//! Everything the form and grid crates consume from the outside world lives
//! here: records and row views, model metadata, the backing-model and
//! object-store interfaces, stored view configuration and the application
//! context that ties them together.

pub mod errors;
pub mod record;
pub mod schema;
pub mod options;
pub mod view;
pub mod resolver;
pub mod backing;
pub mod storage;
pub mod context;
pub mod text;

pub use errors::*;
pub use record::*;
pub use schema::*;
pub use options::*;
pub use view::*;
pub use resolver::*;
pub use backing::*;
pub use storage::*;
pub use context::*;
