use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::PageAddress;
use crate::error::{Error, Result};
use crate::relation::relation::Relation;
use crate::relation::schema::Schema;

/// Persisted shape of one table: schema plus the pages it owns.
/// `header_page_id` mirrors the original design's unused header-page slot
/// (never populated — no header page scheme exists above the catalog's
/// own flat page list) and is carried only so a saved catalog round-trips
/// the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub schema: Schema,
    pub header_page_id: Option<PageAddress>,
    pub allocated_pages: Vec<PageAddress>,
}

/// Name -> table metadata. Grounded on `managers/db_manager.py`'s
/// `SaveState`/`LoadState`, reshaped so the catalog stores metadata rather
/// than live `Relation` handles (a `Relation` here carries no pool
/// reference, so cloning it into a transient working copy per operation
/// is cheap and avoids aliasing the pool through the catalog).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: HashMap<String, TableMeta>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        let catalog: Catalog =
            serde_json::from_slice(&bytes).map_err(|e| Error::bad_request(format!("corrupt catalog file: {e}")))?;
        debug!(tables = catalog.tables.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes =
            serde_json::to_vec_pretty(self).map_err(|e| Error::bad_request(format!("failed to encode catalog: {e}")))?;
        fs::write(path, bytes).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    pub fn create_table(&mut self, name: &str, schema: Schema, page_size: usize) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(Error::DuplicateTable { name: name.to_string() });
        }
        schema.validate_fits(page_size)?;
        self.tables.insert(
            name.to_string(),
            TableMeta {
                schema,
                header_page_id: None,
                allocated_pages: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::UnknownTable { name: name.to_string() })
    }

    pub fn drop_all_tables(&mut self) {
        self.tables.clear();
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schema(&self, name: &str) -> Result<&Schema> {
        self.tables
            .get(name)
            .map(|t| &t.schema)
            .ok_or_else(|| Error::UnknownTable { name: name.to_string() })
    }

    /// Builds a transient [`Relation`] for `name` to run operations
    /// against; pair with [`Catalog::sync_relation`] to persist any new
    /// pages the operation allocated.
    pub fn relation(&self, name: &str, page_size: usize) -> Result<Relation> {
        let meta = self
            .tables
            .get(name)
            .ok_or_else(|| Error::UnknownTable { name: name.to_string() })?;
        Relation::new(name, meta.schema.clone(), page_size).map(|r| r.with_allocated_pages(meta.allocated_pages.clone()))
    }

    pub fn sync_relation(&mut self, relation: &Relation) {
        if let Some(meta) = self.tables.get_mut(&relation.name) {
            meta.allocated_pages = relation.allocated_pages.clone();
        }
    }
}
