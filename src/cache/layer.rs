//! Cache layer that orchestrates staleness, retry, and coalescing over a
//! storage backend.

use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::store::{CacheStore, CachedEntry};

/// Where the data of a [`CacheResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the network
  Network,
  /// Data from cache, inside the staleness window
  CacheFresh,
  /// Stale cache served because the refetch failed
  CacheStale,
}

/// Result of a cached fetch, with metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

/// Cache layer sitting between the application and the network client.
///
/// Results are memoized by key with a fixed staleness window. Concurrent
/// reads of the same key share a single in-flight fetch via a per-key lock,
/// so response ordering can never clobber fresher data. A failed fetch is
/// retried once before any fallback or error applies.
pub struct CacheLayer<S: CacheStore> {
  store: Arc<S>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  /// One lock per key; identical concurrent reads serialize on it and the
  /// latecomer finds the fresh entry instead of fetching again
  locks: Arc<tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<S: CacheStore> CacheLayer<S> {
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      stale_time: Duration::minutes(5),
      locks: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn is_fresh(&self, entry: &CachedEntry) -> bool {
    !entry.stale && Utc::now() - entry.cached_at <= self.stale_time
  }

  async fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self.locks.lock().await;
    locks.entry(key.to_string()).or_default().clone()
  }

  fn decode<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value)
      .map_err(|e| eyre!("Failed to decode cached entry {}: {}", key, e))
  }

  fn encode<T: Serialize>(key: &str, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| eyre!("Failed to encode cache entry {}: {}", key, e))
  }

  /// Run `fetcher`, retrying once on failure.
  async fn fetch_with_retry<T, F, Fut>(fetcher: F) -> Result<T>
  where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    match fetcher().await {
      Ok(data) => Ok(data),
      Err(first) => {
        warn!("fetch failed, retrying once: {}", first);
        fetcher().await
      }
    }
  }

  /// Fetch a value with cache-first semantics.
  ///
  /// 1. Fresh cache entry: returned immediately, no network call.
  /// 2. Stale or missing: fetch (one retry), store, return.
  /// 3. Refetch failure with a cached entry: the stale entry is served.
  pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let lock = self.key_lock(key).await;
    let _guard = lock.lock().await;

    let cached = self.store.get(key)?;
    if let Some(entry) = &cached {
      if self.is_fresh(entry) {
        return Ok(CacheResult {
          data: Self::decode(key, entry.value.clone())?,
          source: CacheSource::CacheFresh,
        });
      }
    }

    match Self::fetch_with_retry(&fetcher).await {
      Ok(data) => {
        self.store.put(key, Self::encode(key, &data)?)?;
        Ok(CacheResult {
          data,
          source: CacheSource::Network,
        })
      }
      Err(err) => match cached {
        Some(entry) => {
          warn!("serving stale cache for {}: {}", key, err);
          Ok(CacheResult {
            data: Self::decode(key, entry.value)?,
            source: CacheSource::CacheStale,
          })
        }
        None => Err(err),
      },
    }
  }

  /// Fetch a page sequence with cache-first semantics.
  ///
  /// Same policy as [`fetch`](Self::fetch), except the fetcher receives the
  /// number of previously loaded pages so a stale refetch can re-walk the
  /// same range instead of starting over with a single page.
  pub async fn fetch_pages<P, F, Fut>(&self, key: &str, fetcher: F) -> Result<CacheResult<Vec<P>>>
  where
    P: Serialize + DeserializeOwned,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<Vec<P>>>,
  {
    let lock = self.key_lock(key).await;
    let _guard = lock.lock().await;

    let cached = self.store.get(key)?;
    let prev_len = cached
      .as_ref()
      .and_then(|entry| entry.value.as_array())
      .map(|pages| pages.len())
      .unwrap_or(0);

    if let Some(entry) = &cached {
      if self.is_fresh(entry) {
        return Ok(CacheResult {
          data: Self::decode(key, entry.value.clone())?,
          source: CacheSource::CacheFresh,
        });
      }
    }

    match Self::fetch_with_retry(|| fetcher(prev_len)).await {
      Ok(pages) => {
        self.store.put(key, Self::encode(key, &pages)?)?;
        Ok(CacheResult {
          data: pages,
          source: CacheSource::Network,
        })
      }
      Err(err) => match cached {
        Some(entry) => {
          warn!("serving stale cache for {}: {}", key, err);
          Ok(CacheResult {
            data: Self::decode(key, entry.value)?,
            source: CacheSource::CacheStale,
          })
        }
        None => Err(err),
      },
    }
  }

  /// Append the next page to a cached page sequence.
  ///
  /// `seen_pages` is how many pages the caller held when it asked for more.
  /// If a concurrent identical request already advanced the sequence past
  /// that, the cached sequence is returned as-is and no request is issued.
  /// `next_param` extracts the next page index from the sequence (`None`
  /// means end of collection); `fetcher` loads a single page.
  ///
  /// A failed page fetch propagates without touching the stored sequence, so
  /// already-loaded pages survive the error.
  pub async fn fetch_next<P, N, F, Fut>(
    &self,
    key: &str,
    seen_pages: usize,
    next_param: N,
    fetcher: F,
  ) -> Result<CacheResult<Vec<P>>>
  where
    P: Serialize + DeserializeOwned,
    N: Fn(&[P]) -> Option<u32>,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<P>>,
  {
    let lock = self.key_lock(key).await;
    let _guard = lock.lock().await;

    let mut pages: Vec<P> = match self.store.get(key)? {
      Some(entry) => Self::decode(key, entry.value)?,
      None => Vec::new(),
    };

    if pages.len() > seen_pages {
      return Ok(CacheResult {
        data: pages,
        source: CacheSource::CacheFresh,
      });
    }

    let Some(next) = next_param(&pages) else {
      return Ok(CacheResult {
        data: pages,
        source: CacheSource::CacheFresh,
      });
    };

    let page = Self::fetch_with_retry(|| fetcher(next)).await?;
    pages.push(page);
    self.store.put(key, Self::encode(key, &pages)?)?;

    Ok(CacheResult {
      data: pages,
      source: CacheSource::Network,
    })
  }

  /// Mark every entry under `prefix` stale. The next read of an affected key
  /// goes back to the network.
  pub fn invalidate(&self, prefix: &str) -> Result<()> {
    debug!("invalidating cache entries under {}", prefix);
    self.store.mark_stale(prefix)
  }
}

impl<S: CacheStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      stale_time: self.stale_time,
      locks: Arc::clone(&self.locks),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::store::MemoryStore;
  use serde::Deserialize;
  use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct TestPage {
    items: Vec<u32>,
    next: Option<u32>,
  }

  fn page(n: u32, last: u32) -> TestPage {
    TestPage {
      items: vec![n],
      next: (n < last).then_some(n + 1),
    }
  }

  fn next_param(pages: &[TestPage]) -> Option<u32> {
    match pages.last() {
      Some(last) => last.next,
      None => Some(1),
    }
  }

  #[tokio::test]
  async fn test_fresh_cache_skips_network() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1, 2, 3])
      }
    };

    let first = layer.fetch("blogs", fetcher).await.unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second = layer.fetch("blogs", fetcher).await.unwrap();
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data, vec![1, 2, 3]);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_is_refetched() {
    let layer = CacheLayer::new(MemoryStore::new()).with_stale_time(Duration::milliseconds(1));
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = calls.clone();
      async move { Ok(calls.fetch_add(1, Ordering::SeqCst)) }
    };

    layer.fetch("blogs", fetcher).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let second = layer.fetch("blogs", fetcher).await.unwrap();
    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(second.data, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failed_refetch_serves_stale_entry() {
    let layer = CacheLayer::new(MemoryStore::new()).with_stale_time(Duration::milliseconds(1));

    layer.fetch("blogs", || async { Ok(7) }).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let result = layer
      .fetch::<i32, _, _>("blogs", || async { Err(eyre!("connection refused")) })
      .await
      .unwrap();

    assert_eq!(result.data, 7);
    assert_eq!(result.source, CacheSource::CacheStale);
  }

  #[tokio::test]
  async fn test_failed_fetch_is_retried_once() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = calls.clone();
      async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
          Err(eyre!("transient"))
        } else {
          Ok(7)
        }
      }
    };

    let result = layer.fetch("blogs", fetcher).await.unwrap();
    assert_eq!(result.data, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_surfaces_after_one_retry() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let result = layer
      .fetch::<i32, _, _>("blogs", || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Err(eyre!("boom"))
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok("posts".to_string())
      }
    };

    layer.fetch("blogs", fetcher).await.unwrap();
    layer.invalidate("blogs").unwrap();

    let result = layer.fetch("blogs", fetcher).await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = || {
      let calls = calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok(42)
      }
    };

    let (a, b) = tokio::join!(layer.fetch("blogs", fetcher), layer.fetch("blogs", fetcher));

    assert_eq!(a.unwrap().data, 42);
    assert_eq!(b.unwrap().data, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_next_appends_pages() {
    let layer = CacheLayer::new(MemoryStore::new());

    let fetcher = |n: u32| async move { Ok(page(n, 3)) };

    let first = layer
      .fetch_next("blogs:infinite", 0, next_param, fetcher)
      .await
      .unwrap();
    assert_eq!(first.data.len(), 1);

    let second = layer
      .fetch_next("blogs:infinite", 1, next_param, fetcher)
      .await
      .unwrap();
    assert_eq!(second.data.len(), 2);
    assert_eq!(second.data[1].items, vec![2]);
  }

  #[tokio::test]
  async fn test_fetch_next_coalesces_on_seen_pages() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = |n: u32| {
      let calls = calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(page(n, 3))
      }
    };

    layer
      .fetch_next("blogs:infinite", 0, next_param, fetcher)
      .await
      .unwrap();
    layer
      .fetch_next("blogs:infinite", 1, next_param, fetcher)
      .await
      .unwrap();

    // A request made while page 2 was in flight still observes one page; the
    // sequence has since advanced, so the cached result is shared instead of
    // fetching page 2 again.
    let repeat = layer
      .fetch_next("blogs:infinite", 1, next_param, fetcher)
      .await
      .unwrap();
    assert_eq!(repeat.data.len(), 2);
    assert_eq!(repeat.source, CacheSource::CacheFresh);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_next_stops_at_end_of_collection() {
    let layer = CacheLayer::new(MemoryStore::new());
    let calls = Arc::new(AtomicU32::new(0));

    let fetcher = |n: u32| {
      let calls = calls.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(page(n, 2))
      }
    };

    layer
      .fetch_next("blogs:infinite", 0, next_param, fetcher)
      .await
      .unwrap();
    layer
      .fetch_next("blogs:infinite", 1, next_param, fetcher)
      .await
      .unwrap();

    let done = layer
      .fetch_next("blogs:infinite", 2, next_param, fetcher)
      .await
      .unwrap();
    assert_eq!(done.data.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_fetch_next_error_keeps_loaded_pages() {
    let layer = CacheLayer::new(MemoryStore::new());

    layer
      .fetch_next("blogs:infinite", 0, next_param, |n: u32| async move {
        Ok(page(n, 3))
      })
      .await
      .unwrap();

    let failed = layer
      .fetch_next::<TestPage, _, _, _>("blogs:infinite", 1, next_param, |_| async {
        Err(eyre!("boom"))
      })
      .await;
    assert!(failed.is_err());

    // The stored sequence is untouched; a request with a stale view of the
    // sequence is still answered from cache.
    let calls = Arc::new(AtomicU32::new(0));
    let kept = layer
      .fetch_next("blogs:infinite", 0, next_param, |n: u32| {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(page(n, 3))
        }
      })
      .await
      .unwrap();
    assert_eq!(kept.data.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_fetch_pages_rewalks_loaded_range_when_stale() {
    let layer = CacheLayer::new(MemoryStore::new()).with_stale_time(Duration::milliseconds(1));
    let seen_prev = Arc::new(AtomicUsize::new(0));

    let fetcher = |prev: usize| {
      let seen_prev = seen_prev.clone();
      async move {
        seen_prev.store(prev, Ordering::SeqCst);
        let count = prev.max(1) as u32;
        Ok((1..=count).map(|n| page(n, count + 1)).collect())
      }
    };

    layer
      .fetch_pages("blogs:infinite", fetcher)
      .await
      .unwrap();
    assert_eq!(seen_prev.load(Ordering::SeqCst), 0);

    // Grow the sequence to two pages, then let it go stale.
    layer
      .fetch_next("blogs:infinite", 1, next_param, |n: u32| async move {
        Ok(page(n, 3))
      })
      .await
      .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let rewalked = layer.fetch_pages("blogs:infinite", fetcher).await.unwrap();
    assert_eq!(rewalked.source, CacheSource::Network);
    assert_eq!(seen_prev.load(Ordering::SeqCst), 2);
    assert_eq!(rewalked.data.len(), 2);
  }
}
