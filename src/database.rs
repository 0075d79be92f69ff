use tracing::{info, warn};

use crate::buffer::BufferPool;
use crate::config::DbConfig;
use crate::error::Result;
use crate::relation::Catalog;
use crate::storage::PageStore;

/// Wires configuration, page store, buffer pool, and catalog into one
/// handle. Grounded on `examples/original_source/managers/db_manager.py`'s
/// `DBManager.__init__`/`LoadState` construction order; the teacher has no
/// analogous single `Database` type (its binder/optimizer layers are
/// assembled per-query instead), so this follows the Python source.
pub struct Database {
    pub config: DbConfig,
    pub pool: BufferPool,
    pub catalog: Catalog,
}

impl Database {
    pub fn open(config: DbConfig) -> Result<Self> {
        let mut page_store = PageStore::new(
            config.bindata_dir(),
            config.freelist_path(),
            config.pagesize,
            config.dm_maxfilecount,
        )?;
        page_store.init()?;

        let pool = BufferPool::new(page_store, config.bm_buffercount, config.bm_policy);
        let catalog = Catalog::load(&config.catalog_path())?;

        info!(dbpath = %config.dbpath, tables = catalog.table_names().len(), "database opened");
        Ok(Self { config, pool, catalog })
    }

    /// Flushes the buffer pool, persists the catalog, and persists the
    /// page store's free-list. Matches `EXIT`'s contract in §4.6.
    pub fn close(&mut self) -> Result<()> {
        if let Err(e) = self.pool.flush_buffers() {
            warn!(error = %e, "flush_buffers failed during close");
            return Err(e);
        }
        self.catalog.save(&self.config.catalog_path())?;
        self.pool.page_store().finish()?;
        info!("database closed");
        Ok(())
    }
}
