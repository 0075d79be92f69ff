use crate::common::RecordAddress;
use crate::relation::value::Value;

/// One row: a value per schema column, plus the physical address it was
/// read from when produced by [`crate::query::scan::Scan`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
    pub address: Option<RecordAddress>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, address: None }
    }

    pub fn with_address(values: Vec<Value>, address: RecordAddress) -> Self {
        Self {
            values,
            address: Some(address),
        }
    }
}
