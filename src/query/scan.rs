use crate::buffer::BufferPool;
use crate::common::RecordAddress;
use crate::error::Result;
use crate::query::iterator::RecordIterator;
use crate::relation::{Record, Relation};

/// Enumerates every live record of a relation's data pages in order,
/// attaching each record's physical address. Grounded on
/// `examples/original_source/query_engine/relation_scanner.py`.
pub struct Scan<'a> {
    relation: Relation,
    pool: &'a mut BufferPool,
    page_idx: usize,
    slot_idx: usize,
}

impl<'a> Scan<'a> {
    pub fn new(relation: Relation, pool: &'a mut BufferPool) -> Self {
        Self {
            relation,
            pool,
            page_idx: 0,
            slot_idx: 0,
        }
    }

    pub fn schema(&self) -> &crate::relation::Schema {
        &self.relation.schema
    }
}

impl RecordIterator for Scan<'_> {
    fn next(&mut self) -> Result<Option<Record>> {
        while self.page_idx < self.relation.allocated_pages.len() {
            let page = self.relation.allocated_pages[self.page_idx];
            let slot_count = self.relation.slot_count();

            while self.slot_idx < slot_count {
                let slot = self.slot_idx;
                self.slot_idx += 1;

                let frame = self.pool.get_page(page)?;
                let occupied = frame.data()[slot] == 1;
                if occupied {
                    let values = {
                        let data = frame.data();
                        self.relation.decode_slot(&data, slot)
                    };
                    self.pool.free_page(page, false);
                    return Ok(Some(Record::with_address(values, RecordAddress::new(page, slot))));
                }
                self.pool.free_page(page, false);
            }

            self.page_idx += 1;
            self.slot_idx = 0;
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<()> {
        self.page_idx = 0;
        self.slot_idx = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{Column, ColumnType, Schema, Value};
    use crate::storage::PageStore;
    use tempdir::TempDir;

    fn pool(dir: &TempDir) -> BufferPool {
        let bindata = dir.path().join("BinData");
        let freelist = bindata.join("dm_save.bin");
        let ps = PageStore::new(bindata, freelist, 64, 4).unwrap();
        BufferPool::new(ps, 4, crate::buffer::ReplacementPolicy::Lru)
    }

    fn schema() -> Schema {
        Schema::new(vec![Column::new("id", ColumnType::Int), Column::new("name", ColumnType::Char(8))])
    }

    /// Every insert lands on a fresh page under the append-only policy, so
    /// three inserts already exercise the page-boundary rollover at
    /// `next`'s inner-loop exit.
    #[test]
    fn yields_records_across_page_boundary_in_order() {
        let dir = TempDir::new("scan").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
            rel.insert_record(&mut pool, vec![Value::Int(id), Value::Text(name.to_string())])
                .unwrap();
        }
        assert!(rel.allocated_pages.len() >= 2, "expected inserts to span multiple pages");

        let mut scan = Scan::new(rel, &mut pool);
        let mut seen = Vec::new();
        while let Some(record) = scan.next().unwrap() {
            assert!(record.address.is_some());
            seen.push(record.values);
        }
        assert_eq!(
            seen,
            vec![
                vec![Value::Int(1), Value::Text("alice".into())],
                vec![Value::Int(2), Value::Text("bob".into())],
                vec![Value::Int(3), Value::Text("carol".into())],
            ]
        );
    }

    #[test]
    fn deleted_record_is_skipped() {
        let dir = TempDir::new("scan").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        let rid = rel
            .insert_record(&mut pool, vec![Value::Int(1), Value::Text("alice".into())])
            .unwrap();
        rel.insert_record(&mut pool, vec![Value::Int(2), Value::Text("bob".into())])
            .unwrap();
        rel.delete_record(&mut pool, rid).unwrap();

        let mut scan = Scan::new(rel, &mut pool);
        let mut seen = Vec::new();
        while let Some(record) = scan.next().unwrap() {
            seen.push(record.values);
        }
        assert_eq!(seen, vec![vec![Value::Int(2), Value::Text("bob".into())]]);
    }

    #[test]
    fn reset_rewinds_cursor() {
        let dir = TempDir::new("scan").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        rel.insert_record(&mut pool, vec![Value::Int(1), Value::Text("alice".into())])
            .unwrap();

        let mut scan = Scan::new(rel, &mut pool);
        assert!(scan.next().unwrap().is_some());
        assert!(scan.next().unwrap().is_none());
        scan.reset().unwrap();
        assert!(scan.next().unwrap().is_some());
    }
}
