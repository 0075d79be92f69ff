use crate::error::Result;
use crate::relation::Record;

/// Pull-based operator interface. Exhaustion is `Ok(None)`, never an
/// error; an underlying I/O failure propagates as `Err` and ends the
/// pipeline for good (implementations do not try to resume after one).
///
/// Grounded on `examples/original_source/query_engine/iterators.py`'s
/// `IRecordIterator`.
pub trait RecordIterator {
    fn next(&mut self) -> Result<Option<Record>>;
    fn reset(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
