pub mod frame;
pub mod pool;

pub use frame::Frame;
pub use pool::BufferPool;

use serde::{Deserialize, Serialize};

/// Eviction policy for the buffer pool, selectable at construction and at
/// runtime via [`BufferPool::set_policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Evict the least-recently-used unpinned frame (scan front-to-back).
    Lru,
    /// Evict the most-recently-used unpinned frame (scan back-to-front).
    Mru,
}
