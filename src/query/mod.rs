pub mod filter;
pub mod iterator;
pub mod project;
pub mod scan;

pub use filter::{Condition, Filter, Op};
pub use iterator::RecordIterator;
pub use project::Project;
pub use scan::Scan;
