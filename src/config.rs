use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::ReplacementPolicy;
use crate::error::{Error, Result};

fn default_dbpath() -> String {
    "./databases".to_string()
}
fn default_pagesize() -> usize {
    4096
}
fn default_maxfilecount() -> u32 {
    4
}
fn default_buffercount() -> usize {
    2
}
fn default_policy() -> ReplacementPolicy {
    ReplacementPolicy::Lru
}

/// Validated, immutable configuration shared by the Page Store, Buffer Pool,
/// and Relation Layer. Built once at startup from an optional JSON file;
/// a missing file yields every default below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_dbpath")]
    pub dbpath: String,
    #[serde(default = "default_pagesize")]
    pub pagesize: usize,
    #[serde(default = "default_maxfilecount")]
    pub dm_maxfilecount: u32,
    #[serde(default = "default_buffercount")]
    pub bm_buffercount: usize,
    #[serde(default = "default_policy")]
    pub bm_policy: ReplacementPolicy,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dbpath: default_dbpath(),
            pagesize: default_pagesize(),
            dm_maxfilecount: default_maxfilecount(),
            bm_buffercount: default_buffercount(),
            bm_policy: default_policy(),
        }
    }
}

impl DbConfig {
    /// Loads configuration from `path`. A missing file yields [`DbConfig::default`];
    /// a present-but-malformed file is a [`Error::BadRequest`] rather than a
    /// silent fallback, so operator mistakes in the file are not hidden.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::bad_request(format!("invalid config file {}: {e}", path.display())))
    }

    pub fn bindata_dir(&self) -> std::path::PathBuf {
        Path::new(&self.dbpath).join("BinData")
    }

    pub fn catalog_path(&self) -> std::path::PathBuf {
        Path::new(&self.dbpath).join("tables.sv")
    }

    pub fn freelist_path(&self) -> std::path::PathBuf {
        self.bindata_dir().join("dm_save.bin")
    }

    pub fn data_file_path(&self, file_idx: u32) -> std::path::PathBuf {
        self.bindata_dir().join(format!("Data{file_idx}.bin"))
    }
}
