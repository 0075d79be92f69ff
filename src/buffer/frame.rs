use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageAddress;

/// A page-sized in-memory buffer that may hold one page, plus the
/// bookkeeping the buffer pool needs: owning address, pin count, dirty bit.
///
/// Modeled as a cheaply-cloneable handle around `Arc<RwLock<FrameInner>>`
/// (mirroring the teacher's `Page` type) rather than a borrowed slice, so a
/// caller can hold the handle across further pool calls without fighting
/// the borrow checker — the pin/dirty bookkeeping lives centrally on the
/// frame and is visible through every clone.
#[derive(Debug, Clone)]
pub struct Frame(Arc<RwLock<FrameInner>>);

#[derive(Debug)]
struct FrameInner {
    address: Option<PageAddress>,
    data: Vec<u8>,
    pin_count: i32,
    dirty: bool,
}

impl Frame {
    pub fn new(page_size: usize) -> Self {
        Frame(Arc::new(RwLock::new(FrameInner {
            address: None,
            data: vec![0u8; page_size],
            pin_count: 0,
            dirty: false,
        })))
    }

    pub fn reset(&self, page_size: usize) {
        let mut inner = self.0.write();
        inner.address = None;
        inner.data.clear();
        inner.data.resize(page_size, 0);
        inner.pin_count = 0;
        inner.dirty = false;
    }

    pub fn address(&self) -> Option<PageAddress> {
        self.0.read().address
    }

    pub fn set_address(&self, addr: PageAddress) {
        self.0.write().address = Some(addr);
    }

    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.0.read(), |i| i.data.as_slice())
    }

    pub fn data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.0.write(), |i| i.data.as_mut_slice())
    }

    pub fn load_bytes(&self, bytes: &[u8]) {
        self.0.write().data.copy_from_slice(bytes);
    }

    pub fn pin_count(&self) -> i32 {
        self.0.read().pin_count
    }

    pub fn pin(&self) {
        self.0.write().pin_count += 1;
    }

    pub fn unpin(&self) {
        let mut inner = self.0.write();
        if inner.pin_count > 0 {
            inner.pin_count -= 1;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().dirty
    }

    pub fn set_dirty(&self, dirty: bool) {
        if dirty {
            self.0.write().dirty = true;
        }
    }

    pub fn clear_dirty(&self) {
        self.0.write().dirty = false;
    }
}
