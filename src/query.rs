//! Async query abstraction for data fetching in views.
//!
//! A `Query<T>` wraps a fetch closure and exposes loading, success, and error
//! states that views poll once per tick. `InfiniteQuery<P>` is the same
//! machine over a growing page sequence. Results travel over a channel from a
//! spawned task; dropping the receiver (navigation, refetch) silently
//! discards whatever arrives later.
//!
//! # Example
//!
//! ```ignore
//! let store = store.clone();
//! let mut query = Query::new(move || {
//!     let store = store.clone();
//!     async move { store.blogs().await.map_err(|e| e.to_string()) }
//! });
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use futures::future::BoxFuture;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Freshness window shared by all queries; matches the cache layer below.
pub const STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has no data yet
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Async query with state management for a single value.
///
/// While a refetch of existing data is in flight the previous value stays in
/// `Success`; only a first fetch shows `Loading`. `is_fetching()` tells the
/// two apart.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It is called each time
  /// `fetch()` or `refetch()` starts a request.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: STALE_TIME,
    }
  }

  /// Set the stale time for this query.
  #[allow(dead_code)]
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is loading with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if any fetch is in flight, including a background revalidation.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is older than the stale time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching unless a fetch is already in flight.
  ///
  /// With existing data this is a background revalidation: the data stays
  /// visible until the new result arrives.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Force a new fetch, discarding any in-flight result.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

/// A factory function that creates futures for fetching page sequences.
///
/// The argument is `None` for an initial load or refetch and `Some(seen)` -
/// the number of pages currently held - when the next page is requested.
/// Either way the future resolves to the full sequence.
type PageFetcherFn<P> =
  Box<dyn Fn(Option<usize>) -> BoxFuture<'static, Result<Vec<P>, String>> + Send + Sync>;

/// Async query over an accumulated page sequence.
///
/// `fetch_next()` is a no-op while any fetch is in flight, so rapid repeated
/// requests collapse into one. A failed next-page request keeps the loaded
/// pages on screen and surfaces its error separately via `next_error()`.
pub struct InfiniteQuery<P> {
  state: QueryState<Vec<P>>,
  fetcher: PageFetcherFn<P>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Vec<P>, String>>>,
  /// Set while a next-page request (vs an initial load) is in flight
  fetching_next: bool,
  /// Error from a failed next-page request; loaded pages stay available
  next_error: Option<String>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<P: Send + 'static> InfiniteQuery<P> {
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(Option<usize>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<P>, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move |seen| Box::pin(fetcher(seen))),
      receiver: None,
      fetching_next: false,
      next_error: None,
      fetched_at: None,
      stale_time: STALE_TIME,
    }
  }

  /// Set the stale time for this query.
  #[allow(dead_code)]
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn state(&self) -> &QueryState<Vec<P>> {
    &self.state
  }

  /// The loaded pages, in order. Empty until the initial load succeeds.
  pub fn pages(&self) -> &[P] {
    self.state.data().map(|p| p.as_slice()).unwrap_or(&[])
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Check if a next-page request specifically is in flight.
  pub fn is_fetching_next(&self) -> bool {
    self.fetching_next && self.receiver.is_some()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Error from the most recent failed next-page request.
  pub fn next_error(&self) -> Option<&str> {
    self.next_error.as_deref()
  }

  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start the initial load, or a background revalidation of the sequence.
  /// No-op while a fetch is in flight.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch(None);
  }

  /// Request the next page. No-op while any fetch is in flight, which
  /// collapses rapid repeated requests into a single page fetch.
  pub fn fetch_next(&mut self) {
    if self.receiver.is_some() {
      return;
    }

    let seen = self.pages().len();
    if seen == 0 {
      // Nothing loaded yet - same as an initial load
      self.start_fetch(None);
      return;
    }

    self.fetching_next = true;
    self.next_error = None;
    self.start_fetch(Some(seen));
  }

  /// Force a full reload from the first page, discarding any in-flight
  /// result.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.fetching_next = false;
    self.next_error = None;
    self.start_fetch(None);
  }

  /// Re-issue the next-page request after a failure.
  pub fn retry_next(&mut self) {
    self.next_error = None;
    self.fetch_next();
  }

  /// Poll for results from a pending fetch.
  ///
  /// The page sequence is swapped in as one unit; a render pass never sees a
  /// half-updated list.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(pages)) => {
        self.state = QueryState::Success(pages);
        self.fetched_at = Some(Instant::now());
        self.fetching_next = false;
        self.next_error = None;
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        if self.fetching_next && self.state.is_success() {
          self.next_error = Some(error);
        } else {
          self.state = QueryState::Error(error);
        }
        self.fetching_next = false;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.fetching_next = false;
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self, seen: Option<usize>) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)(seen);
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send(result);
    });
  }
}

impl<P: std::fmt::Debug> std::fmt::Debug for InfiniteQuery<P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("InfiniteQuery")
      .field("state", &self.state)
      .field("fetching_next", &self.fetching_next)
      .field("next_error", &self.next_error)
      .finish_non_exhaustive()
  }
}
