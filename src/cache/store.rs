//! Cache storage trait and the in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// A cached query result with the bookkeeping needed for staleness checks.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// The serialized result
  pub value: serde_json::Value,
  /// When the result was stored
  pub cached_at: DateTime<Utc>,
  /// Set by invalidation; a stale entry is refetched on the next read
  pub stale: bool,
}

/// Trait for cache storage backends.
///
/// Each method is a single atomic operation: a concurrent reader sees either
/// the state before a mutation or the state after it, never a mix.
pub trait CacheStore: Send + Sync {
  /// Look up an entry by key.
  fn get(&self, key: &str) -> Result<Option<CachedEntry>>;

  /// Insert or replace an entry, resetting its staleness.
  fn put(&self, key: &str, value: serde_json::Value) -> Result<()>;

  /// Mark every entry whose key starts with `prefix` as stale.
  fn mark_stale(&self, prefix: &str) -> Result<()>;
}

/// In-memory storage. The cache lives and dies with the process; there is no
/// teardown to perform.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<CachedEntry>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    Ok(entries.get(key).cloned())
  }

  fn put(&self, key: &str, value: serde_json::Value) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    entries.insert(
      key.to_string(),
      CachedEntry {
        value,
        cached_at: Utc::now(),
        stale: false,
      },
    );

    Ok(())
  }

  fn mark_stale(&self, prefix: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    for (key, entry) in entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.stale = true;
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_put_then_get() {
    let store = MemoryStore::new();
    store.put("blogs", json!([1, 2, 3])).unwrap();

    let entry = store.get("blogs").unwrap().unwrap();
    assert_eq!(entry.value, json!([1, 2, 3]));
    assert!(!entry.stale);
  }

  #[test]
  fn test_get_missing_key() {
    let store = MemoryStore::new();
    assert!(store.get("blogs").unwrap().is_none());
  }

  #[test]
  fn test_put_resets_staleness() {
    let store = MemoryStore::new();
    store.put("blogs", json!(1)).unwrap();
    store.mark_stale("blogs").unwrap();
    store.put("blogs", json!(2)).unwrap();

    let entry = store.get("blogs").unwrap().unwrap();
    assert!(!entry.stale);
    assert_eq!(entry.value, json!(2));
  }

  #[test]
  fn test_mark_stale_covers_the_prefix() {
    let store = MemoryStore::new();
    store.put("blogs", json!(1)).unwrap();
    store.put("blogs:infinite", json!(2)).unwrap();

    store.mark_stale("blogs").unwrap();

    assert!(store.get("blogs").unwrap().unwrap().stale);
    assert!(store.get("blogs:infinite").unwrap().unwrap().stale);
  }

  #[test]
  fn test_mark_stale_spares_other_keys() {
    let store = MemoryStore::new();
    store.put("blogs", json!(1)).unwrap();
    store.put("blog:4", json!(2)).unwrap();

    store.mark_stale("blogs").unwrap();

    assert!(!store.get("blog:4").unwrap().unwrap().stale);
  }
}
