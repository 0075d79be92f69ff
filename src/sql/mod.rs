pub mod csv_import;
pub mod executor;
pub mod parser;

pub use executor::{execute, Outcome};
pub use parser::{parse, Command};
