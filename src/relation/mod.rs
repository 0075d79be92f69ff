pub mod catalog;
pub mod record;
pub mod relation;
pub mod schema;
pub mod value;

pub use catalog::Catalog;
pub use record::Record;
pub use relation::Relation;
pub use schema::{Column, ColumnType, Schema};
pub use value::Value;
