pub mod address;

pub use address::{PageAddress, RecordAddress};
