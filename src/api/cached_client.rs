//! Cached blog client that wraps [`BlogClient`] with transparent caching.

use color_eyre::Result;
use tracing::debug;

use crate::cache::{CacheLayer, MemoryStore};
use crate::config::Config;

use super::client::BlogClient;
use super::keys::{BlogQueryKey, BLOGS_KEY_FAMILY};
use super::types::{Blog, CreateBlogInput, Page};

/// Blog client with transparent caching.
///
/// Wraps the underlying [`BlogClient`] and provides the same operations, but
/// memoizes reads by query key, coalesces concurrent identical requests, and
/// invalidates the list keys after a create. Clones share one cache.
#[derive(Clone)]
pub struct CachedBlogClient {
  inner: BlogClient,
  cache: CacheLayer<MemoryStore>,
}

impl CachedBlogClient {
  pub fn new(config: &Config) -> Result<Self> {
    let inner = BlogClient::new(config)?;
    let cache = CacheLayer::new(MemoryStore::new());

    Ok(Self { inner, cache })
  }

  /// Fetch the full collection, cached under the list key.
  pub async fn blogs(&self) -> Result<Vec<Blog>> {
    let key = BlogQueryKey::Blogs.as_key();

    let result = self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.get_blogs().await }
      })
      .await?;

    debug!("blogs list served from {:?}", result.source);
    Ok(result.data)
  }

  /// Fetch a single post by id with caching.
  pub async fn blog(&self, id: u64) -> Result<Blog> {
    let key = BlogQueryKey::Blog { id }.as_key();

    let result = self
      .cache
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.get_blog(id).await }
      })
      .await?;

    debug!("blog {} served from {:?}", id, result.source);
    Ok(result.data)
  }

  /// Fetch the pages loaded so far for the infinite list.
  ///
  /// A cold cache loads page 1. A stale entry (five minutes old, or
  /// invalidated by a create) re-walks the previously loaded range so the
  /// whole sequence is fresh, stopping early if the server now reports fewer
  /// pages.
  pub async fn blog_pages(&self) -> Result<Vec<Page>> {
    let key = BlogQueryKey::BlogsInfinite.as_key();

    let result = self
      .cache
      .fetch_pages(&key, |prev_len| {
        let inner = self.inner.clone();
        async move {
          let target = prev_len.max(1);
          let mut pages: Vec<Page> = Vec::new();
          let mut next = Some(1);

          while let Some(n) = next {
            if pages.len() >= target {
              break;
            }
            let page = inner.get_blogs_page(n).await?;
            next = page.next_page;
            pages.push(page);
          }

          Ok(pages)
        }
      })
      .await?;

    Ok(result.data)
  }

  /// Append the next page to the infinite list.
  ///
  /// `seen_pages` is the number of pages the caller currently shows; if the
  /// cached sequence has already grown past that (a concurrent request won),
  /// it is returned as-is without a network call. With no next page the
  /// sequence is likewise returned unchanged.
  pub async fn load_more(&self, seen_pages: usize) -> Result<Vec<Page>> {
    let key = BlogQueryKey::BlogsInfinite.as_key();

    let result = self
      .cache
      .fetch_next(
        &key,
        seen_pages,
        |pages: &[Page]| match pages.last() {
          Some(last) => last.next_page,
          None => Some(1),
        },
        |page| {
          let inner = self.inner.clone();
          async move { inner.get_blogs_page(page).await }
        },
      )
      .await?;

    Ok(result.data)
  }

  /// Publish a new post and mark the list keys stale, so the next read of
  /// the list or infinite list refetches. The created post is not spliced
  /// into cached pages; correctness after a create relies on the refetch.
  pub async fn create(&self, input: &CreateBlogInput) -> Result<Blog> {
    let created = self.inner.create_blog(input).await?;
    self.cache.invalidate(BLOGS_KEY_FAMILY)?;

    Ok(created)
  }
}
