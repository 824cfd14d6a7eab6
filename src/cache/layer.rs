//! Query client: the shared, process-wide cache of query results.
//!
//! One `QueryClient` is built at startup and cloned into every consumer.
//! It serves fresh entries without touching the network, coalesces
//! concurrent reads of the same key onto a single fetch, retries transport
//! failures with exponential backoff and evicts entries once their
//! retention window passes with no subscriber.

use futures::future::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::{CacheEntry, Erased, FetchTicket, InFlight, QueryStatus, Settled, SharedFetch, Snapshot};
use super::key::CacheKey;
use super::policy::{Policy, PolicyTable};
use crate::error::{QueryError, ServiceError};

struct Inner {
  entries: Mutex<HashMap<CacheKey, CacheEntry>>,
  policies: PolicyTable,
  next_fetch_id: AtomicU64,
  next_entry_id: AtomicU64,
}

impl Inner {
  fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn new_entry(&self, key: &CacheKey, now: Instant) -> CacheEntry {
    let id = self.next_entry_id.fetch_add(1, Ordering::Relaxed);
    CacheEntry::new(id, self.policies.get(key.resource()), now)
  }

  /// Apply a finished fetch. Results for an entry that was cleared or
  /// removed since the fetch started are dropped.
  fn settle(&self, key: &CacheKey, ticket: &FetchTicket, result: &Result<Erased, QueryError>) {
    let now = Instant::now();
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key).filter(|entry| entry.id == ticket.entry_id) else {
      debug!(resource = key.resource(), key = %key.fingerprint(), "dropping result of a discarded entry");
      return;
    };
    if entry.in_flight.as_ref().map(|f| f.id) == Some(ticket.fetch_id) {
      entry.in_flight = None;
    }
    match entry.settle(ticket, result, now) {
      Settled::Stored => {
        debug!(resource = key.resource(), key = %key.fingerprint(), "query settled");
      }
      Settled::StoredStale => {
        debug!(resource = key.resource(), key = %key.fingerprint(), "query settled, invalidated meanwhile");
      }
      Settled::Superseded => {
        debug!(resource = key.resource(), key = %key.fingerprint(), "query result superseded by a write");
      }
      Settled::Failed => {
        if let Err(err) = result {
          warn!(resource = key.resource(), key = %key.fingerprint(), error = %err, "query failed");
        }
      }
    }
  }
}

/// Handle to the shared query cache. Cloning is cheap.
#[derive(Clone)]
pub struct QueryClient {
  inner: Arc<Inner>,
}

impl QueryClient {
  pub fn new(policies: PolicyTable) -> Self {
    Self {
      inner: Arc::new(Inner {
        entries: Mutex::new(HashMap::new()),
        policies,
        next_fetch_id: AtomicU64::new(1),
        next_entry_id: AtomicU64::new(1),
      }),
    }
  }

  /// Policy applied to entries of `resource`.
  pub fn policy(&self, resource: &str) -> Policy {
    self.inner.policies.get(resource)
  }

  /// Cache-first read.
  ///
  /// 1. Fresh entry: return it, no network call
  /// 2. A fetch for this key is in flight: wait for it
  /// 3. Otherwise start a fetch, shared with later callers of the same key
  ///
  /// The fetch runs on its own task, so it completes and populates the
  /// cache even if every caller stops waiting.
  pub async fn fetch<T, F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<Arc<T>, QueryError>
  where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    self.read(key, false, fetcher).await
  }

  /// Like [`fetch`](Self::fetch) but ignores freshness. Joins a fetch that is
  /// already in flight instead of starting a second one.
  pub async fn fetch_fresh<T, F, Fut>(
    &self,
    key: &CacheKey,
    fetcher: F,
  ) -> Result<Arc<T>, QueryError>
  where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    self.read(key, true, fetcher).await
  }

  async fn read<T, F, Fut>(
    &self,
    key: &CacheKey,
    force: bool,
    fetcher: F,
  ) -> Result<Arc<T>, QueryError>
  where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    let pending = {
      let now = Instant::now();
      let mut entries = self.inner.lock();
      let entry = entries
        .entry(key.clone())
        .or_insert_with(|| self.inner.new_entry(key, now));

      if !force && entry.is_fresh(now) {
        if let Some(value) = &entry.data {
          debug!(resource = key.resource(), key = %key.fingerprint(), "cache hit");
          return downcast(key, Arc::clone(value));
        }
      }

      match &entry.in_flight {
        Some(in_flight) => {
          debug!(resource = key.resource(), key = %key.fingerprint(), "joining in-flight fetch");
          in_flight.fetch.clone()
        }
        None => self.start_fetch(key, entry, fetcher),
      }
    };

    let value = pending.await?;
    downcast(key, value)
  }

  /// Spawn the network task for `key` and register it on the entry.
  /// Called with the entries lock held.
  fn start_fetch<T, F, Fut>(&self, key: &CacheKey, entry: &mut CacheEntry, fetcher: F) -> SharedFetch
  where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
    let ticket = entry.ticket(fetch_id);
    let retry = entry.policy.retry;
    let inner = Arc::clone(&self.inner);
    let task_key = key.clone();

    debug!(resource = key.resource(), key = %key.fingerprint(), "fetch started");
    let task: JoinHandle<Result<Erased, QueryError>> = tokio::spawn(async move {
      let result = fetch_with_retry(&task_key, retry, fetcher)
        .await
        .map(|value| Arc::new(value) as Erased)
        .map_err(QueryError::from);
      inner.settle(&task_key, &ticket, &result);
      result
    });

    let cancelled_key = key.to_string();
    let fetch = async move {
      match task.await {
        Ok(result) => result,
        Err(_) => Err(QueryError::Cancelled { key: cancelled_key }),
      }
    }
    .boxed()
    .shared();

    entry.status = QueryStatus::Fetching;
    entry.in_flight = Some(InFlight {
      id: fetch_id,
      fetch: fetch.clone(),
    });
    fetch
  }

  /// Synchronous read of what the cache currently holds for `key`.
  pub fn snapshot<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Snapshot<T> {
    let now = Instant::now();
    self
      .inner
      .lock()
      .get(key)
      .map(|entry| entry.snapshot(now))
      .unwrap_or_else(Snapshot::empty)
  }

  /// Whether a fetch for `key` is outstanding.
  pub fn is_fetching(&self, key: &CacheKey) -> bool {
    self
      .inner
      .lock()
      .get(key)
      .is_some_and(|entry| entry.in_flight.is_some())
  }

  /// Store `value` under `key` as freshly fetched data. A fetch of the key
  /// that is still in flight will not overwrite it.
  pub fn set_data<T: Send + Sync + 'static>(&self, key: &CacheKey, value: T) {
    let now = Instant::now();
    self
      .inner
      .lock()
      .entry(key.clone())
      .or_insert_with(|| self.inner.new_entry(key, now))
      .write(Arc::new(value), now);
  }

  /// Mark an entry stale. Its data stays visible until the next fetch
  /// settles; a fetch already in flight leaves it stale.
  pub fn invalidate(&self, key: &CacheKey) {
    if let Some(entry) = self.inner.lock().get_mut(key) {
      entry.invalidate();
    }
  }

  /// Mark every entry of `resource` stale.
  pub fn invalidate_resource(&self, resource: &str) {
    let mut count = 0usize;
    for (key, entry) in self.inner.lock().iter_mut() {
      if key.resource() == resource {
        entry.invalidate();
        count += 1;
      }
    }
    debug!(resource, count, "resource invalidated");
  }

  pub fn remove(&self, key: &CacheKey) {
    self.inner.lock().remove(key);
  }

  pub fn clear(&self) {
    self.inner.lock().clear();
  }

  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, key: &CacheKey) -> bool {
    self.inner.lock().contains_key(key)
  }

  /// Register a subscriber on `key`. The entry cannot be evicted while the
  /// returned guard is alive.
  pub fn subscribe(&self, key: &CacheKey) -> Subscription {
    let now = Instant::now();
    let mut entries = self.inner.lock();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| self.inner.new_entry(key, now));
    entry.subscribers += 1;
    entry.idle_since = None;
    Subscription {
      inner: Arc::downgrade(&self.inner),
      key: key.clone(),
    }
  }

  /// Evict expired entries. Returns how many were removed.
  pub fn sweep(&self) -> usize {
    sweep_entries(&self.inner)
  }

  /// Run [`sweep`](Self::sweep) every `period` until the last client handle
  /// is dropped.
  pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
    let inner: Weak<Inner> = Arc::downgrade(&self.inner);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
          break;
        };
        sweep_entries(&inner);
      }
    })
  }
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new(PolicyTable::default())
  }
}

impl std::fmt::Debug for QueryClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryClient")
      .field("entries", &self.len())
      .finish_non_exhaustive()
  }
}

/// Subscriber guard returned by [`QueryClient::subscribe`]. Dropping it
/// starts the entry's retention clock once no other subscriber remains.
#[derive(Debug)]
pub struct Subscription {
  inner: Weak<Inner>,
  key: CacheKey,
}

impl Subscription {
  pub fn key(&self) -> &CacheKey {
    &self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let Some(inner) = self.inner.upgrade() else {
      return;
    };
    let mut entries = inner.lock();
    if let Some(entry) = entries.get_mut(&self.key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      if entry.subscribers == 0 {
        entry.idle_since = Some(Instant::now());
      }
    }
  }
}

fn sweep_entries(inner: &Inner) -> usize {
  let now = Instant::now();
  let mut entries = inner.lock();
  let before = entries.len();
  entries.retain(|key, entry| {
    let expired = entry.is_expired(now);
    if expired {
      debug!(resource = key.resource(), key = %key.fingerprint(), "entry evicted");
    }
    !expired
  });
  before - entries.len()
}

fn downcast<T: Send + Sync + 'static>(key: &CacheKey, value: Erased) -> Result<Arc<T>, QueryError> {
  value.downcast::<T>().map_err(|_| QueryError::TypeMismatch {
    key: key.to_string(),
  })
}

async fn fetch_with_retry<T, F, Fut>(key: &CacheKey, retry: u32, mut fetcher: F) -> Result<T, ServiceError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, ServiceError>>,
{
  let mut attempt = 0u32;
  loop {
    match fetcher().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_retryable() && attempt < retry => {
        let delay = Policy::retry_delay(attempt);
        warn!(
          resource = key.resource(),
          key = %key.fingerprint(),
          attempt = attempt + 1,
          ?delay,
          error = %err,
          "fetch failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(err) => return Err(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::atomic::AtomicUsize;

  fn key(page: u32) -> CacheKey {
    CacheKey::paged("imports.search", &json!({"status": "PENDING"}), page, 10).unwrap()
  }

  fn client() -> QueryClient {
    QueryClient::new(PolicyTable::new(Policy::new(
      Duration::from_secs(60),
      Duration::from_secs(300),
      2,
    )))
  }

  fn counting_fetcher(
    calls: Arc<AtomicUsize>,
    value: u32,
  ) -> impl FnMut() -> futures::future::BoxFuture<'static, Result<u32, ServiceError>> + Send + 'static
  {
    slow_fetcher(calls, value, 50)
  }

  fn slow_fetcher(
    calls: Arc<AtomicUsize>,
    value: u32,
    millis: u64,
  ) -> impl FnMut() -> futures::future::BoxFuture<'static, Result<u32, ServiceError>> + Send + 'static
  {
    move || {
      let calls = Arc::clone(&calls);
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(value)
      }
      .boxed()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_reads_share_one_fetch() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let reads = (0..5).map(|_| {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      async move { client.fetch(&key(0), counting_fetcher(calls, 42)).await }
    });
    let results = futures::future::join_all(reads).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
      assert_eq!(*result.unwrap(), 42);
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_hit_skips_network() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 1))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    let again = client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 2))
      .await
      .unwrap();

    assert_eq!(*again, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_is_refetched() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 1))
      .await
      .unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(client.snapshot::<u32>(&key(0)).is_stale);

    let again = client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 2))
      .await
      .unwrap();
    assert_eq!(*again, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_fresh_ignores_freshness() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 1))
      .await
      .unwrap();
    let forced = client
      .fetch_fresh(&key(0), counting_fetcher(Arc::clone(&calls), 2))
      .await
      .unwrap();

    assert_eq!(*forced, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_transport_failure_is_retried() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let value = client
      .fetch(&key(0), move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
          if attempt < 2 {
            Err(ServiceError::Network {
              message: "connection reset".to_string(),
            })
          } else {
            Ok(9u32)
          }
        }
      })
      .await
      .unwrap();

    assert_eq!(*value, 9);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retries_exhausted_surfaces_error() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = client
      .fetch::<u32, _, _>(&key(0), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
          Err(ServiceError::Status {
            status: 502,
            message: "Bad gateway".to_string(),
          })
        }
      })
      .await;

    assert!(matches!(
      result,
      Err(QueryError::Service(ServiceError::Status { status: 502, .. }))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(client.snapshot::<u32>(&key(0)).status, QueryStatus::Error);
  }

  #[tokio::test(start_paused = true)]
  async fn test_envelope_failure_is_not_retried() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = client
      .fetch::<u32, _, _>(&key(0), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
          Err(ServiceError::Envelope {
            message: "Không có quyền".to_string(),
          })
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_error_keeps_previous_data_visible() {
    let client = client();
    client.set_data(&key(0), 5u32);
    client.invalidate(&key(0));

    let result = client
      .fetch::<u32, _, _>(&key(0), || async {
        Err(ServiceError::Envelope {
          message: "boom".to_string(),
        })
      })
      .await;
    assert!(result.is_err());

    let snap = client.snapshot::<u32>(&key(0));
    assert_eq!(snap.status, QueryStatus::Error);
    assert_eq!(snap.data.as_deref(), Some(&5));
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_completes_after_caller_drops() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let read = {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      tokio::spawn(async move { client.fetch(&key(0), counting_fetcher(calls, 3)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.is_fetching(&key(0)));
    read.abort();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snap = client.snapshot::<u32>(&key(0));
    assert_eq!(snap.data.as_deref(), Some(&3));
    assert!(!client.is_fetching(&key(0)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_type_mismatch_is_reported() {
    let client = client();
    client.set_data(&key(0), String::from("not a number"));

    let result = client
      .fetch::<u32, _, _>(&key(0), || async { Ok(1u32) })
      .await;
    assert!(matches!(result, Err(QueryError::TypeMismatch { .. })));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_resource_marks_all_pages_stale() {
    let client = client();
    client.set_data(&key(0), 1u32);
    client.set_data(&key(1), 2u32);
    let other = CacheKey::new("products.all", &json!({})).unwrap();
    client.set_data(&other, 3u32);

    client.invalidate_resource("imports.search");

    assert!(client.snapshot::<u32>(&key(0)).is_stale);
    assert!(client.snapshot::<u32>(&key(1)).is_stale);
    assert!(!client.snapshot::<u32>(&other).is_stale);
    assert_eq!(client.snapshot::<u32>(&key(1)).data.as_deref(), Some(&2));
  }

  #[tokio::test(start_paused = true)]
  async fn test_sweep_respects_subscribers_and_retention() {
    let client = client();
    client.set_data(&key(0), 1u32);
    client.set_data(&key(1), 2u32);
    let held = client.subscribe(&key(1));

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(client.sweep(), 0);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(client.sweep(), 1);
    assert!(!client.contains(&key(0)));
    assert!(client.contains(&key(1)));

    drop(held);
    tokio::time::advance(Duration::from_secs(300)).await;
    assert_eq!(client.sweep(), 1);
    assert!(client.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_sweeper_task_evicts_in_background() {
    let client = client();
    client.set_data(&key(0), 1u32);
    let sweeper = client.spawn_sweeper(Duration::from_secs(60));

    tokio::time::sleep(Duration::from_secs(361)).await;
    assert!(client.is_empty());
    sweeper.abort();
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidation_while_in_flight_forces_next_read() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let read = {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      tokio::spawn(async move { client.fetch(&key(0), counting_fetcher(calls, 0)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.invalidate_resource("imports.search");

    assert_eq!(*read.await.unwrap().unwrap(), 0);
    let snap = client.snapshot::<u32>(&key(0));
    assert_eq!(snap.data.as_deref(), Some(&0));
    assert!(snap.is_stale);

    let next = client
      .fetch(&key(0), counting_fetcher(Arc::clone(&calls), 1))
      .await
      .unwrap();
    assert_eq!(*next, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_set_data_while_in_flight_is_kept() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let read = {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      tokio::spawn(async move { client.fetch(&key(0), counting_fetcher(calls, 0)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.set_data(&key(0), 7u32);
    read.await.unwrap().unwrap();

    let snap = client.snapshot::<u32>(&key(0));
    assert_eq!(snap.data.as_deref(), Some(&7));
    assert!(snap.is_fresh());
    assert!(!client.is_fetching(&key(0)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_drops_result_of_earlier_fetch() {
    let client = client();
    let calls = Arc::new(AtomicUsize::new(0));

    let previous = {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      tokio::spawn(async move { client.fetch(&key(0), slow_fetcher(calls, 1, 50)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.clear();

    let current = {
      let client = client.clone();
      let calls = Arc::clone(&calls);
      tokio::spawn(async move { client.fetch(&key(0), slow_fetcher(calls, 2, 200)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The earlier fetch still answers its own caller
    assert_eq!(*previous.await.unwrap().unwrap(), 1);
    let snap = client.snapshot::<u32>(&key(0));
    assert!(snap.data.is_none());
    assert!(client.is_fetching(&key(0)));

    assert_eq!(*current.await.unwrap().unwrap(), 2);
    assert_eq!(client.snapshot::<u32>(&key(0)).data.as_deref(), Some(&2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
