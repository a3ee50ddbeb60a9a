//! In-memory query cache.
//!
//! This module is blog-agnostic: it memoizes serialized query results by
//! string key with a fixed staleness window, coalesces concurrent identical
//! reads into one fetch, retries a failed fetch once, and supports marking a
//! key family stale after a write. The cache is created at application start
//! and handed to whatever builds the read operations; nothing here is a
//! process-wide singleton.

mod layer;
mod store;

pub use layer::CacheLayer;
pub use store::MemoryStore;
