use std::collections::HashMap;

use tracing::{debug, warn};

use crate::buffer::frame::Frame;
use crate::buffer::ReplacementPolicy;
use crate::common::PageAddress;
use crate::error::{Error, Result};
use crate::storage::PageStore;

/// Bounded cache of page-sized frames keyed by [`PageAddress`]. Recency is
/// tracked by an explicit ordering vector (front = least recent, back =
/// most recent); eviction scans that ordering front-to-back under LRU or
/// back-to-front under MRU, skipping any frame that is still pinned.
///
/// Grounded on the teacher's `BufferPoolManager` for the alloc-or-evict
/// shape, and on the Python source's `BufferManager._evict_page` for the
/// LRU/MRU scan-direction policy (the teacher only implements LRU-K).
pub struct BufferPool {
    page_store: PageStore,
    capacity: usize,
    policy: ReplacementPolicy,
    frames: HashMap<PageAddress, Frame>,
    /// Recency order: front is least-recently-used, back is most-recently-used.
    order: Vec<PageAddress>,
}

impl BufferPool {
    pub fn new(page_store: PageStore, capacity: usize, policy: ReplacementPolicy) -> Self {
        Self {
            page_store,
            capacity,
            policy,
            frames: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_store.page_size()
    }

    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.policy = policy;
    }

    fn touch(&mut self, addr: PageAddress) {
        if let Some(pos) = self.order.iter().position(|a| *a == addr) {
            self.order.remove(pos);
        }
        self.order.push(addr);
    }

    /// Returns the resident frame for `addr`, pinning it and marking it
    /// most-recently-used; loads it from the [`PageStore`] (evicting a
    /// victim first if at capacity) when not already resident.
    pub fn get_page(&mut self, addr: PageAddress) -> Result<Frame> {
        if let Some(frame) = self.frames.get(&addr).cloned() {
            frame.pin();
            self.touch(addr);
            return Ok(frame);
        }

        if self.frames.len() >= self.capacity {
            self.evict_one()?;
        }

        let page_size = self.page_store.page_size();
        let frame = Frame::new(page_size);
        let mut buf = vec![0u8; page_size];
        self.page_store.read_page(addr, &mut buf)?;
        frame.load_bytes(&buf);
        frame.set_address(addr);
        frame.pin();

        self.frames.insert(addr, frame.clone());
        self.order.push(addr);
        Ok(frame)
    }

    /// Decrements the pin count for `addr` and, if `dirty`, marks the
    /// frame dirty. A call on a non-resident address is ignored.
    pub fn free_page(&mut self, addr: PageAddress, dirty: bool) {
        if let Some(frame) = self.frames.get(&addr) {
            frame.unpin();
            if dirty {
                frame.set_dirty(true);
            }
        }
    }

    fn victim_candidates(&self) -> Box<dyn Iterator<Item = &PageAddress> + '_> {
        match self.policy {
            ReplacementPolicy::Lru => Box::new(self.order.iter()),
            ReplacementPolicy::Mru => Box::new(self.order.iter().rev()),
        }
    }

    fn evict_one(&mut self) -> Result<()> {
        let victim = self
            .victim_candidates()
            .find(|addr| self.frames.get(addr).map_or(false, |f| f.pin_count() == 0))
            .copied();

        let Some(victim) = victim else {
            return Err(Error::NoEvictableFrame {
                pool_size: self.capacity,
            });
        };

        let frame = self.frames.remove(&victim).expect("victim must be resident");
        if let Some(pos) = self.order.iter().position(|a| *a == victim) {
            self.order.remove(pos);
        }
        if frame.is_dirty() {
            let data = frame.data().to_vec();
            self.page_store.write_page(victim, &data)?;
        }
        debug!(%victim, policy = ?self.policy, "evicted frame");
        Ok(())
    }

    /// Writes every dirty resident frame back to the page store, then
    /// drops all frames unconditionally. A non-zero pin count at this
    /// point is logged rather than rejected, since the only caller is the
    /// shutdown path and rejecting would leave the process unable to exit.
    pub fn flush_buffers(&mut self) -> Result<()> {
        for addr in self.order.clone() {
            let frame = self.frames.get(&addr).expect("order entries are resident");
            if frame.pin_count() > 0 {
                warn!(%addr, pin_count = frame.pin_count(), "flushing pinned frame");
            }
            if frame.is_dirty() {
                let data = frame.data().to_vec();
                self.page_store.write_page(addr, &data)?;
                frame.clear_dirty();
            }
        }
        self.frames.clear();
        self.order.clear();
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn resident_addresses(&self) -> Vec<PageAddress> {
        self.order.clone()
    }

    pub fn alloc_page(&mut self) -> Result<PageAddress> {
        self.page_store.alloc_page()
    }

    pub fn dealloc_page(&mut self, addr: PageAddress) {
        self.page_store.dealloc_page(addr)
    }

    pub fn page_store(&mut self) -> &mut PageStore {
        &mut self.page_store
    }

    pub fn page_store_ref(&self) -> &PageStore {
        &self.page_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn pool(dir: &TempDir, capacity: usize, policy: ReplacementPolicy) -> BufferPool {
        let bindata = dir.path().join("BinData");
        let freelist = bindata.join("dm_save.bin");
        let ps = PageStore::new(bindata, freelist, 64, 4).unwrap();
        BufferPool::new(ps, capacity, policy)
    }

    #[test]
    fn lru_eviction_scenario() {
        let dir = TempDir::new("bp").unwrap();
        let mut bp = pool(&dir, 2, ReplacementPolicy::Lru);
        let p0 = bp.page_store().alloc_page().unwrap();
        let p1 = bp.page_store().alloc_page().unwrap();
        let p2 = bp.page_store().alloc_page().unwrap();

        bp.get_page(p0).unwrap();
        bp.free_page(p0, false);
        bp.get_page(p1).unwrap();
        bp.free_page(p1, false);
        bp.get_page(p2).unwrap();

        let resident = bp.resident_addresses();
        assert!(!resident.contains(&p0));
        assert!(resident.contains(&p1));
        assert!(resident.contains(&p2));
    }

    #[test]
    fn mru_eviction_prefers_most_recent() {
        let dir = TempDir::new("bp").unwrap();
        let mut bp = pool(&dir, 2, ReplacementPolicy::Mru);
        let p0 = bp.page_store().alloc_page().unwrap();
        let p1 = bp.page_store().alloc_page().unwrap();
        let p2 = bp.page_store().alloc_page().unwrap();

        bp.get_page(p0).unwrap();
        bp.free_page(p0, false);
        bp.get_page(p1).unwrap();
        bp.free_page(p1, false);
        // p1 is most-recent and unpinned; MRU evicts it to make room for p2.
        bp.get_page(p2).unwrap();

        let resident = bp.resident_addresses();
        assert!(resident.contains(&p0));
        assert!(!resident.contains(&p1));
        assert!(resident.contains(&p2));
    }

    #[test]
    fn pinned_frame_is_not_evicted() {
        let dir = TempDir::new("bp").unwrap();
        let mut bp = pool(&dir, 1, ReplacementPolicy::Lru);
        let p0 = bp.page_store().alloc_page().unwrap();
        let p1 = bp.page_store().alloc_page().unwrap();
        bp.get_page(p0).unwrap(); // pinned, never freed
        let err = bp.get_page(p1).unwrap_err();
        assert!(matches!(err, Error::NoEvictableFrame { .. }));
    }

    #[test]
    fn dirty_flush_then_reload_roundtrips() {
        let dir = TempDir::new("bp").unwrap();
        let mut bp = pool(&dir, 2, ReplacementPolicy::Lru);
        let p0 = bp.page_store().alloc_page().unwrap();
        let frame = bp.get_page(p0).unwrap();
        frame.data_mut()[0] = 88;
        bp.free_page(p0, true);
        bp.flush_buffers().unwrap();
        assert!(bp.is_empty());

        let mut check = vec![0u8; 64];
        bp.page_store().read_page(p0, &mut check).unwrap();
        assert_eq!(check[0], 88);
    }
}
