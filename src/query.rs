//! Query hooks over the shared [`QueryClient`].
//!
//! Inspired by TanStack Query: a [`Query<T>`] owns one cache key, starts
//! reads on a background task and reports loading, success and error
//! states. [`PagedQuery<T, P>`] adds per-consumer page state on top of it: the
//! key is recomposed whenever the page or the search parameters change, and
//! the previous page is shown as a placeholder until the new one settles.
//!
//! # Example
//!
//! ```ignore
//! let service = imports.clone();
//! let mut query = PagedQuery::subscribe(
//!     client.clone(),
//!     "imports.search",
//!     move |params, page| {
//!         let service = service.clone();
//!         async move { service.search(&params, page).await }
//!     },
//!     ReceiptSearch::default(),
//!     10,
//!     true,
//! )?;
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let view = query.view();
//! render_rows(view.data());
//! render_pager(view.current_page, view.total_pages);
//! ```

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::{CacheKey, QueryClient, QueryStatus, Subscription};
use crate::error::{QueryError, ServiceError};

/// One page of a paged backend listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
  #[serde(default)]
  pub content: Vec<T>,
  #[serde(default)]
  pub total_elements: u64,
  #[serde(default)]
  pub total_pages: u32,
  /// Zero-based page index echoed by the backend
  #[serde(default)]
  pub number: u32,
  #[serde(default)]
  pub size: u32,
}

impl<T> Page<T> {
  pub fn is_empty(&self) -> bool {
    self.content.is_empty()
  }
}

/// Page coordinates sent to the backend. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRequest {
  pub page: u32,
  pub size: u32,
}

/// Page position of one consumer. `current` is 1-based and never below 1;
/// the zero-based index only exists in [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
  current: u32,
  size: u32,
}

impl PageState {
  pub fn new(size: u32) -> Result<Self, QueryError> {
    if size == 0 {
      return Err(QueryError::InvalidPageSize);
    }
    Ok(Self { current: 1, size })
  }

  pub fn current(&self) -> u32 {
    self.current
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  /// Pages below 1 clamp to 1.
  pub fn set(&mut self, page: u32) {
    self.current = page.max(1);
  }

  pub fn reset(&mut self) {
    self.current = 1;
  }

  pub fn index(&self) -> u32 {
    self.current - 1
  }

  pub fn request(&self) -> PageRequest {
    PageRequest {
      page: self.index(),
      size: self.size,
    }
  }
}

/// A boxed future that resolves one fetch
type BoxFetch<T> = BoxFuture<'static, Result<T, ServiceError>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Arc<dyn Fn() -> BoxFetch<T> + Send + Sync>;

/// Fetch function of a paged resource: search params plus page coordinates.
type PageFetcherFn<T, P> = Arc<dyn Fn(P, PageRequest) -> BoxFetch<Page<T>> + Send + Sync>;

/// What a consumer renders for a [`Query`].
#[derive(Debug, Clone)]
pub struct QueryView<T> {
  pub data: Option<Arc<T>>,
  pub status: QueryStatus,
  /// No data yet and a fetch is running
  pub is_loading: bool,
  /// A fetch for this key is running, whoever started it
  pub is_fetching: bool,
  pub is_error: bool,
  pub error: Option<QueryError>,
  pub is_stale: bool,
}

impl<T> QueryView<T> {
  fn idle() -> Self {
    Self {
      data: None,
      status: QueryStatus::Idle,
      is_loading: false,
      is_fetching: false,
      is_error: false,
      error: None,
      is_stale: true,
    }
  }
}

/// Keyed query over the shared cache.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - A subscription that keeps its cache entry alive
/// - Async result delivery via a channel, polled from the event loop
pub struct Query<T> {
  client: QueryClient,
  key: CacheKey,
  fetcher: FetcherFn<T>,
  enabled: bool,
  subscription: Option<Subscription>,
  receiver: Option<mpsc::UnboundedReceiver<Result<Arc<T>, QueryError>>>,
  last_error: Option<QueryError>,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// Create a query for `key`. Nothing is fetched until [`fetch`](Self::fetch).
  pub fn new<F, Fut>(client: QueryClient, key: CacheKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    Self::from_fetcher(client, key, Arc::new(move || fetcher().boxed()))
  }

  fn from_fetcher(client: QueryClient, key: CacheKey, fetcher: FetcherFn<T>) -> Self {
    Self {
      client,
      key,
      fetcher,
      enabled: true,
      subscription: None,
      receiver: None,
      last_error: None,
    }
  }

  /// A disabled query never fetches and reports idle with no data.
  pub fn with_enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    if !enabled {
      self.detach();
      self.subscription = None;
    }
    self
  }

  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Read through the cache. Fresh data is served without a fetch; this is a
  /// no-op while a delivery is already pending.
  pub fn fetch(&mut self) {
    if !self.enabled || self.receiver.is_some() {
      return;
    }
    self.ensure_subscribed();
    if self.client.snapshot::<T>(&self.key).is_fresh() {
      return;
    }
    self.start(false);
  }

  /// Fetch regardless of freshness, replacing any pending delivery.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    self.ensure_subscribed();
    self.detach();
    self.start(true);
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.finish(Some(result));
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.finish(None);
        true
      }
    }
  }

  /// Wait for the pending fetch, if any, to settle.
  pub async fn settled(&mut self) {
    let Some(receiver) = self.receiver.as_mut() else {
      return;
    };
    let result = receiver.recv().await;
    self.finish(result);
  }

  pub fn view(&self) -> QueryView<T> {
    if !self.enabled {
      return QueryView::idle();
    }
    let snap = self.client.snapshot::<T>(&self.key);
    let is_fetching = self.receiver.is_some() || snap.is_fetching();
    let error = match snap.status {
      QueryStatus::Success => None,
      _ => snap.error.clone().or_else(|| self.last_error.clone()),
    };
    QueryView {
      is_loading: is_fetching && snap.data.is_none(),
      is_fetching,
      is_error: error.is_some(),
      error,
      is_stale: snap.is_stale,
      status: snap.status,
      data: snap.data,
    }
  }

  pub fn data(&self) -> Option<Arc<T>> {
    self.view().data
  }

  fn ensure_subscribed(&mut self) {
    if self.subscription.is_none() {
      self.subscription = Some(self.client.subscribe(&self.key));
    }
  }

  fn start(&mut self, force: bool) {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = self.client.clone();
    let key = self.key.clone();
    let fetcher = Arc::clone(&self.fetcher);

    tokio::spawn(async move {
      let call = move || fetcher();
      let result = if force {
        client.fetch_fresh(&key, call).await
      } else {
        client.fetch(&key, call).await
      };
      // Ignore send errors - the consumer may have gone away
      let _ = tx.send(result);
    });

    self.receiver = Some(rx);
  }

  fn finish(&mut self, result: Option<Result<Arc<T>, QueryError>>) {
    self.receiver = None;
    self.last_error = match result {
      Some(Ok(_)) => None,
      Some(Err(err)) => Some(err),
      None => Some(QueryError::Cancelled {
        key: self.key.to_string(),
      }),
    };
  }

  /// Stop delivering to this consumer. The shared fetch itself keeps running
  /// and still populates the cache.
  fn detach(&mut self) {
    self.receiver = None;
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("enabled", &self.enabled)
      .field("pending", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}

/// What a consumer renders for a [`PagedQuery`].
#[derive(Debug, Clone)]
pub struct PageView<T> {
  page: Option<Arc<Page<T>>>,
  pub total_items: u64,
  pub total_pages: u32,
  /// 1-based
  pub current_page: u32,
  pub page_size: u32,
  pub is_loading: bool,
  pub is_fetching: bool,
  pub is_error: bool,
  /// The rows belong to the previously shown page, not the current one
  pub is_placeholder: bool,
  pub error: Option<QueryError>,
}

impl<T> PageView<T> {
  pub fn data(&self) -> &[T] {
    self
      .page
      .as_deref()
      .map(|page| page.content.as_slice())
      .unwrap_or(&[])
  }

  /// 1-based position of the first row shown, 0 when nothing is shown.
  pub fn display_start(&self) -> u64 {
    if self.data().is_empty() {
      return 0;
    }
    u64::from(self.current_page - 1) * u64::from(self.page_size) + 1
  }

  pub fn display_end(&self) -> u64 {
    match self.display_start() {
      0 => 0,
      start => start + self.data().len() as u64 - 1,
    }
  }
}

/// Paged query: per-consumer page state over one resource and search params.
pub struct PagedQuery<T, P> {
  client: QueryClient,
  resource: String,
  fetcher: PageFetcherFn<T, P>,
  params: P,
  state: PageState,
  enabled: bool,
  query: Query<Page<T>>,
  placeholder: Option<Arc<Page<T>>>,
}

impl<T, P> PagedQuery<T, P>
where
  T: Send + Sync + 'static,
  P: Serialize + Clone + PartialEq + Send + Sync + 'static,
{
  /// Start consuming page 1 of `resource` filtered by `params`.
  ///
  /// With `enabled = false` nothing is fetched until
  /// [`set_enabled`](Self::set_enabled) turns the query on.
  pub fn subscribe<F, Fut>(
    client: QueryClient,
    resource: &str,
    fetcher: F,
    params: P,
    page_size: u32,
    enabled: bool,
  ) -> Result<Self, QueryError>
  where
    F: Fn(P, PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, ServiceError>> + Send + 'static,
  {
    let state = PageState::new(page_size)?;
    let fetcher: PageFetcherFn<T, P> = Arc::new(move |params, page| fetcher(params, page).boxed());
    let key = CacheKey::paged(resource, &params, state.index(), state.size())?;
    let query = page_query(&client, key, &fetcher, &params, state, enabled);

    let mut paged = Self {
      client,
      resource: resource.to_string(),
      fetcher,
      params,
      state,
      enabled,
      query,
      placeholder: None,
    };
    paged.query.fetch();
    Ok(paged)
  }

  pub fn key(&self) -> &CacheKey {
    self.query.key()
  }

  pub fn params(&self) -> &P {
    &self.params
  }

  pub fn current_page(&self) -> u32 {
    self.state.current()
  }

  pub fn page_size(&self) -> u32 {
    self.state.size()
  }

  /// Move to page `page` (values below 1 clamp to 1). The page being left
  /// stays cached and is shown as a placeholder until the new page settles.
  pub fn set_page(&mut self, page: u32) {
    let page = page.max(1);
    if page == self.state.current() {
      return;
    }
    self.remember_placeholder();
    self.state.set(page);
    let key = self.query.key().with_page(self.state.index(), self.state.size());
    self.rebuild(key);
  }

  /// Back to page 1.
  pub fn reset_page(&mut self) {
    self.set_page(1);
  }

  /// Advance one page when a later page is known to exist.
  pub fn next_page(&mut self) {
    let total = self.view().total_pages;
    if self.state.current() < total {
      self.set_page(self.state.current() + 1);
    }
  }

  pub fn previous_page(&mut self) {
    if self.state.current() > 1 {
      self.set_page(self.state.current() - 1);
    }
  }

  /// Replace the search parameters. A filter change resets to page 1.
  pub fn set_params(&mut self, params: P) -> Result<(), QueryError> {
    if params == self.params {
      return Ok(());
    }
    let key = CacheKey::paged(&self.resource, &params, 0, self.state.size())?;
    self.remember_placeholder();
    self.params = params;
    self.state.reset();
    self.rebuild(key);
    Ok(())
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    if enabled == self.enabled {
      return;
    }
    self.enabled = enabled;
    let key = self.query.key().clone();
    self.rebuild(key);
  }

  /// Fetch the current page again regardless of freshness.
  pub fn refetch(&mut self) {
    self.query.refetch();
  }

  /// See [`Query::poll`].
  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  pub async fn settled(&mut self) {
    self.query.settled().await;
  }

  pub fn view(&self) -> PageView<T> {
    let view = self.query.view();
    let (page, is_placeholder) = match view.data {
      Some(page) => (Some(page), false),
      None if view.is_fetching => (self.placeholder.clone(), self.placeholder.is_some()),
      None => (None, false),
    };
    PageView {
      total_items: page.as_ref().map(|p| p.total_elements).unwrap_or(0),
      total_pages: page.as_ref().map(|p| p.total_pages).unwrap_or(1),
      current_page: self.state.current(),
      page_size: self.state.size(),
      is_loading: view.is_loading,
      is_fetching: view.is_fetching,
      is_error: view.is_error,
      is_placeholder,
      error: view.error,
      page,
    }
  }

  fn remember_placeholder(&mut self) {
    if let Some(page) = self.query.data() {
      self.placeholder = Some(page);
    }
  }

  fn rebuild(&mut self, key: CacheKey) {
    self.query = page_query(
      &self.client,
      key,
      &self.fetcher,
      &self.params,
      self.state,
      self.enabled,
    );
    self.query.fetch();
  }
}

impl<T, P> std::fmt::Debug for PagedQuery<T, P> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PagedQuery")
      .field("resource", &self.resource)
      .field("state", &self.state)
      .field("query", &self.query)
      .finish_non_exhaustive()
  }
}

fn page_query<T, P>(
  client: &QueryClient,
  key: CacheKey,
  fetcher: &PageFetcherFn<T, P>,
  params: &P,
  state: PageState,
  enabled: bool,
) -> Query<Page<T>>
where
  T: Send + Sync + 'static,
  P: Clone + Send + Sync + 'static,
{
  let fetcher = Arc::clone(fetcher);
  let params = params.clone();
  let request = state.request();
  let call: FetcherFn<Page<T>> = Arc::new(move || fetcher(params.clone(), request));
  Query::from_fetcher(client.clone(), key, call).with_enabled(enabled)
}
