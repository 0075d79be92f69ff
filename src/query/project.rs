use crate::error::Result;
use crate::query::iterator::RecordIterator;
use crate::relation::Record;

/// Restricts each child record to `keep_indices`, in order. Discards the
/// physical address — a projected record can no longer be the target of
/// `DELETE`/`UPDATE`.
pub struct Project<I> {
    child: I,
    keep_indices: Vec<usize>,
}

impl<I: RecordIterator> Project<I> {
    pub fn new(child: I, keep_indices: Vec<usize>) -> Self {
        Self { child, keep_indices }
    }
}

impl<I: RecordIterator> RecordIterator for Project<I> {
    fn next(&mut self) -> Result<Option<Record>> {
        let Some(record) = self.child.next()? else {
            return Ok(None);
        };
        let values = self.keep_indices.iter().map(|&i| record.values[i].clone()).collect();
        Ok(Some(Record::new(values)))
    }

    fn reset(&mut self) -> Result<()> {
        self.child.reset()
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()
    }
}
