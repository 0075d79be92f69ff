use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{PageAddress, RecordAddress};
use crate::error::{Error, Result};
use crate::relation::record::Record;
use crate::relation::schema::Schema;
use crate::relation::value::Value;

/// A table's schema, data-page list, and slotted-layout arithmetic. Holds
/// no reference to the buffer pool — every operation takes one as a
/// parameter, since the pool is a sibling resource shared by every table
/// rather than something a single relation can own exclusively.
///
/// Grounded on `examples/original_source/managers/relation.py`.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub schema: Schema,
    record_width: usize,
    slot_count: usize,
    pub allocated_pages: Vec<PageAddress>,
}

impl Relation {
    pub fn new(name: impl Into<String>, schema: Schema, page_size: usize) -> Result<Self> {
        schema.validate_fits(page_size)?;
        let record_width = schema.record_width();
        let slot_count = schema.slot_count(page_size);
        Ok(Self {
            name: name.into(),
            schema,
            record_width,
            slot_count,
            allocated_pages: Vec::new(),
        })
    }

    pub fn with_allocated_pages(mut self, pages: Vec<PageAddress>) -> Self {
        self.allocated_pages = pages;
        self
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn record_width(&self) -> usize {
        self.record_width
    }

    fn slot_offset(&self, slot: usize) -> usize {
        self.slot_count + slot * self.record_width
    }

    /// Allocates a page via the pool, zeroes it (an all-free bitmap), and
    /// appends it to `allocated_pages`.
    pub fn add_data_page(&mut self, pool: &mut BufferPool) -> Result<PageAddress> {
        let addr = pool.alloc_page()?;
        let frame = pool.get_page(addr)?;
        {
            let mut data = frame.data_mut();
            data.fill(0);
        }
        frame.set_dirty(true);
        pool.free_page(addr, true);
        self.allocated_pages.push(addr);
        debug!(table = %self.name, %addr, "added data page");
        Ok(addr)
    }

    /// This engine's conformant-but-wasteful policy: every insert targets
    /// a brand-new page rather than scanning `allocated_pages` for room.
    fn free_data_page(&mut self, pool: &mut BufferPool) -> Result<PageAddress> {
        self.add_data_page(pool)
    }

    pub fn insert_record(&mut self, pool: &mut BufferPool, values: Vec<Value>) -> Result<RecordAddress> {
        if values.len() != self.schema.len() {
            return Err(Error::bad_request(format!(
                "expected {} values, got {}",
                self.schema.len(),
                values.len()
            )));
        }
        let addr = self.free_data_page(pool)?;
        let frame = pool.get_page(addr)?;

        let slot = {
            let data = frame.data();
            (0..self.slot_count).find(|&i| data[i] == 0)
        };
        let Some(slot) = slot else {
            pool.free_page(addr, false);
            return Err(Error::PageFull { page: addr });
        };

        {
            let mut data = frame.data_mut();
            data[slot] = 1;
            let mut cursor = self.slot_offset(slot);
            for (col, value) in self.schema.columns.iter().zip(values.iter()) {
                value.encode_into(&mut data, cursor, col.col_type);
                cursor += col.col_type.byte_width();
            }
        }
        frame.set_dirty(true);
        pool.free_page(addr, true);
        Ok(RecordAddress::new(addr, slot))
    }

    /// Does not check the slot's bitmap bit; callers that care about
    /// liveness use the scan iterator instead.
    pub fn read_record(&self, pool: &mut BufferPool, rid: RecordAddress) -> Result<Record> {
        let frame = pool.get_page(rid.page)?;
        let data = frame.data();
        let values = self.decode_slot(&data, rid.slot);
        drop(data);
        pool.free_page(rid.page, false);
        Ok(Record::with_address(values, rid))
    }

    pub fn decode_slot(&self, data: &[u8], slot: usize) -> Vec<Value> {
        let offset = self.slot_offset(slot);
        let mut cursor = offset;
        let mut values = Vec::with_capacity(self.schema.len());
        for col in &self.schema.columns {
            values.push(Value::decode_from(data, cursor, col.col_type));
            cursor += col.col_type.byte_width();
        }
        values
    }

    pub fn update_record(&self, pool: &mut BufferPool, rid: RecordAddress, new_values: Vec<Value>) -> Result<()> {
        if new_values.len() != self.schema.len() {
            return Err(Error::bad_request(format!(
                "expected {} values, got {}",
                self.schema.len(),
                new_values.len()
            )));
        }
        let frame = pool.get_page(rid.page)?;
        {
            let mut data = frame.data_mut();
            let offset = self.slot_offset(rid.slot);
            let mut cursor = offset;
            for (col, value) in self.schema.columns.iter().zip(new_values.iter()) {
                value.encode_into(&mut data, cursor, col.col_type);
                cursor += col.col_type.byte_width();
            }
        }
        frame.set_dirty(true);
        pool.free_page(rid.page, true);
        Ok(())
    }

    pub fn delete_record(&self, pool: &mut BufferPool, rid: RecordAddress) -> Result<()> {
        let frame = pool.get_page(rid.page)?;
        {
            let mut data = frame.data_mut();
            data[rid.slot] = 0;
        }
        frame.set_dirty(true);
        pool.free_page(rid.page, true);
        Ok(())
    }

    /// Every record in `page` whose bitmap byte is `0x01`, with its slot
    /// index attached.
    pub fn records_in_page(&self, pool: &mut BufferPool, page: PageAddress) -> Result<Vec<(usize, Vec<Value>)>> {
        let frame = pool.get_page(page)?;
        let data = frame.data();
        let mut out = Vec::new();
        for slot in 0..self.slot_count {
            if data[slot] == 1 {
                out.push((slot, self.decode_slot(&data, slot)));
            }
        }
        drop(data);
        pool.free_page(page, false);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::schema::{Column, ColumnType};
    use crate::storage::PageStore;
    use tempdir::TempDir;

    fn pool(dir: &TempDir) -> BufferPool {
        let bindata = dir.path().join("BinData");
        let freelist = bindata.join("dm_save.bin");
        let ps = PageStore::new(bindata, freelist, 64, 4).unwrap();
        BufferPool::new(ps, 4, crate::buffer::ReplacementPolicy::Lru)
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Char(8)),
        ])
    }

    #[test]
    fn insert_then_read_roundtrips() {
        let dir = TempDir::new("rel").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        let rid = rel
            .insert_record(&mut pool, vec![Value::Int(7), Value::Text("hi".into())])
            .unwrap();
        let rec = rel.read_record(&mut pool, rid).unwrap();
        assert_eq!(rec.values, vec![Value::Int(7), Value::Text("hi".into())]);
    }

    #[test]
    fn delete_clears_bitmap_bit() {
        let dir = TempDir::new("rel").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        let rid = rel
            .insert_record(&mut pool, vec![Value::Int(1), Value::Text("a".into())])
            .unwrap();
        rel.delete_record(&mut pool, rid).unwrap();
        let live = rel.records_in_page(&mut pool, rid.page).unwrap();
        assert!(live.is_empty());
    }

    #[test]
    fn update_overwrites_values_in_place() {
        let dir = TempDir::new("rel").unwrap();
        let mut pool = pool(&dir);
        let mut rel = Relation::new("t", schema(), 64).unwrap();
        let rid = rel
            .insert_record(&mut pool, vec![Value::Int(1), Value::Text("a".into())])
            .unwrap();
        rel.update_record(&mut pool, rid, vec![Value::Int(2), Value::Text("b".into())])
            .unwrap();
        let rec = rel.read_record(&mut pool, rid).unwrap();
        assert_eq!(rec.values, vec![Value::Int(2), Value::Text("b".into())]);
    }

    #[test]
    fn oversized_schema_is_rejected_at_construction() {
        let big = Schema::new(vec![Column::new("c", ColumnType::Char(128))]);
        let err = Relation::new("t", big, 64).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
