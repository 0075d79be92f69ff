use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::common::PageAddress;
use crate::error::{Error, Result};

/// Owns a directory of up to `max_file_count` fixed-size-page files and
/// hands out stable [`PageAddress`]es. Mirrors the on-disk layout of
/// `{dbpath}/BinData/Data{i}.bin` plus a persisted free-list
/// (`dm_save.bin`).
///
/// Grounded on the teacher's `DiskManager` for the read/write-at-offset
/// shape, and on the Python source's `DiskManager` for the allocator and
/// free-list semantics the teacher's slice doesn't implement.
pub struct PageStore {
    bindata_dir: PathBuf,
    freelist_path: PathBuf,
    page_size: usize,
    max_file_count: u32,
    free_list: VecDeque<PageAddress>,
    num_reads: u64,
    num_writes: u64,
}

impl PageStore {
    pub fn new(bindata_dir: PathBuf, freelist_path: PathBuf, page_size: usize, max_file_count: u32) -> Result<Self> {
        fs::create_dir_all(&bindata_dir).map_err(|e| Error::io(&bindata_dir, e))?;
        Ok(Self {
            bindata_dir,
            freelist_path,
            page_size,
            max_file_count,
            free_list: VecDeque::new(),
            num_reads: 0,
            num_writes: 0,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn file_path(&self, file_idx: u32) -> PathBuf {
        self.bindata_dir.join(format!("Data{file_idx}.bin"))
    }

    /// Loads the persisted free-list, if any, so pages freed before a
    /// previous `finish()` are handed back out by subsequent `alloc_page`
    /// calls (invariant I7).
    pub fn init(&mut self) -> Result<()> {
        if !self.freelist_path.exists() {
            return Ok(());
        }
        let bytes = fs::read(&self.freelist_path).map_err(|e| Error::io(&self.freelist_path, e))?;
        let addrs: Vec<PageAddress> = serde_json::from_slice(&bytes)
            .map_err(|e| Error::bad_request(format!("corrupt free-list file: {e}")))?;
        self.free_list = addrs.into();
        debug!(count = self.free_list.len(), "loaded persisted free-list");
        Ok(())
    }

    /// Persists the current free-list so a later `init()` restores it.
    pub fn finish(&self) -> Result<()> {
        let addrs: Vec<PageAddress> = self.free_list.iter().copied().collect();
        let bytes = serde_json::to_vec(&addrs)
            .map_err(|e| Error::bad_request(format!("failed to encode free-list: {e}")))?;
        fs::write(&self.freelist_path, bytes).map_err(|e| Error::io(&self.freelist_path, e))?;
        Ok(())
    }

    /// Returns the free-list head if non-empty, otherwise appends a fresh
    /// zeroed page to the first file with room. Fails with
    /// [`Error::OutOfSpace`] once `max_file_count` would be exceeded.
    pub fn alloc_page(&mut self) -> Result<PageAddress> {
        if let Some(addr) = self.free_list.pop_front() {
            return Ok(addr);
        }

        for file_idx in 0..self.max_file_count {
            let path = self.file_path(file_idx);
            let file_size = if path.exists() {
                fs::metadata(&path).map_err(|e| Error::io(&path, e))?.len()
            } else {
                0
            };
            let num_pages = file_size / self.page_size as u64;
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&path)
                .map_err(|e| Error::io(&path, e))?;
            file.seek(SeekFrom::End(0)).map_err(|e| Error::io(&path, e))?;
            file.write_all(&vec![0u8; self.page_size])
                .map_err(|e| Error::io(&path, e))?;
            file.flush().map_err(|e| Error::io(&path, e))?;
            let addr = PageAddress::new(file_idx, num_pages as u32);
            info!(%addr, "allocated fresh page");
            return Ok(addr);
        }

        Err(Error::OutOfSpace {
            max_file_count: self.max_file_count,
        })
    }

    /// Pushes `addr` onto the tail of the free-list. On-disk bytes are left
    /// untouched; the reusing relation's bitmap governs semantics.
    pub fn dealloc_page(&mut self, addr: PageAddress) {
        self.free_list.push_back(addr);
    }

    pub fn read_page(&mut self, addr: PageAddress, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let path = self.file_path(addr.file_idx);
        if !path.exists() {
            return Err(Error::MissingFile { path });
        }
        let mut file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let offset = addr.page_idx as u64 * self.page_size as u64;
        file.seek(SeekFrom::Start(offset)).map_err(|e| Error::io(&path, e))?;
        file.read_exact(buf).map_err(|e| Error::io(&path, e))?;
        self.num_reads += 1;
        Ok(())
    }

    pub fn write_page(&mut self, addr: PageAddress, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), self.page_size, "write_page buffer must equal page_size");
        let path = self.file_path(addr.file_idx);
        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        let offset = addr.page_idx as u64 * self.page_size as u64;
        file.seek(SeekFrom::Start(offset)).map_err(|e| Error::io(&path, e))?;
        file.write_all(buf).map_err(|e| Error::io(&path, e))?;
        file.flush().map_err(|e| Error::io(&path, e))?;
        self.num_writes += 1;
        Ok(())
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn store(dir: &TempDir, page_size: usize, max_files: u32) -> PageStore {
        let bindata = dir.path().join("BinData");
        let freelist = bindata.join("dm_save.bin");
        PageStore::new(bindata, freelist, page_size, max_files).unwrap()
    }

    #[test]
    fn alloc_then_read_write_roundtrip() {
        let dir = TempDir::new("ps").unwrap();
        let mut ps = store(&dir, 64, 4);
        let addr = ps.alloc_page().unwrap();
        assert_eq!(addr, PageAddress::new(0, 0));

        let mut data = vec![0u8; 64];
        data[0] = 42;
        ps.write_page(addr, &data).unwrap();

        let mut buf = vec![0u8; 64];
        ps.read_page(addr, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn successive_allocs_are_unique_and_sequential() {
        let dir = TempDir::new("ps").unwrap();
        let mut ps = store(&dir, 64, 4);
        let a0 = ps.alloc_page().unwrap();
        let a1 = ps.alloc_page().unwrap();
        assert_ne!(a0, a1);
        assert_eq!(a1, PageAddress::new(0, 1));
    }

    #[test]
    fn dealloc_then_alloc_reuses_fifo() {
        let dir = TempDir::new("ps").unwrap();
        let mut ps = store(&dir, 64, 4);
        let a0 = ps.alloc_page().unwrap();
        let a1 = ps.alloc_page().unwrap();
        ps.dealloc_page(a0);
        ps.dealloc_page(a1);
        assert_eq!(ps.alloc_page().unwrap(), a0);
        assert_eq!(ps.alloc_page().unwrap(), a1);
    }

    #[test]
    fn read_missing_file_errors() {
        let dir = TempDir::new("ps").unwrap();
        let mut ps = store(&dir, 64, 4);
        let mut buf = vec![0u8; 64];
        let err = ps.read_page(PageAddress::new(3, 0), &mut buf).unwrap_err();
        assert!(matches!(err, Error::MissingFile { .. }));
    }

    #[test]
    fn freelist_persists_across_instances() {
        let dir = TempDir::new("ps").unwrap();
        let addr = {
            let mut ps = store(&dir, 64, 4);
            let a = ps.alloc_page().unwrap();
            ps.dealloc_page(a);
            ps.finish().unwrap();
            a
        };
        let mut ps2 = store(&dir, 64, 4);
        ps2.init().unwrap();
        assert_eq!(ps2.alloc_page().unwrap(), addr);
    }
}
