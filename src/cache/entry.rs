//! Cache entries and the snapshots read from them.

use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::sync::Arc;
use tokio::time::Instant;

use super::policy::Policy;
use crate::error::QueryError;

/// Type-erased cached value; each resource maps to exactly one type.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// The outstanding network call of an entry, awaited by every coalesced caller.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Erased, QueryError>>>;

/// Lifecycle state of one entry.
///
/// `Idle -> Fetching -> {Success, Error}`; `Success`/`Error` go back to
/// `Fetching` on refetch or revalidation. Eviction removes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  Idle,
  Fetching,
  Success,
  Error,
}

pub(crate) struct InFlight {
  pub id: u64,
  pub fetch: SharedFetch,
}

/// State of an entry captured when a fetch starts, checked again when it
/// settles.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchTicket {
  pub fetch_id: u64,
  pub entry_id: u64,
  invalidations: u64,
  writes: u64,
}

/// How a settled fetch was applied to its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settled {
  Stored,
  /// Stored, but the entry was invalidated while the fetch ran
  StoredStale,
  Failed,
  /// Newer data was written while the fetch ran; the result is dropped
  Superseded,
}

pub(crate) struct CacheEntry {
  /// Unique per entry; a cleared or removed key gets a new id when it
  /// comes back.
  pub id: u64,
  pub data: Option<Erased>,
  pub data_updated_at: Option<Instant>,
  pub error: Option<QueryError>,
  pub status: QueryStatus,
  pub invalidated: bool,
  invalidations: u64,
  writes: u64,
  pub in_flight: Option<InFlight>,
  pub subscribers: usize,
  /// Set while no subscriber holds the entry; the retention clock.
  pub idle_since: Option<Instant>,
  pub policy: Policy,
}

impl CacheEntry {
  pub fn new(id: u64, policy: Policy, now: Instant) -> Self {
    Self {
      id,
      data: None,
      data_updated_at: None,
      error: None,
      status: QueryStatus::Idle,
      invalidated: false,
      invalidations: 0,
      writes: 0,
      in_flight: None,
      subscribers: 0,
      idle_since: Some(now),
      policy,
    }
  }

  pub fn is_stale(&self, now: Instant) -> bool {
    match self.data_updated_at {
      Some(at) if self.data.is_some() => {
        self.invalidated || now.saturating_duration_since(at) >= self.policy.stale_time
      }
      _ => true,
    }
  }

  pub fn is_fresh(&self, now: Instant) -> bool {
    !self.is_stale(now)
  }

  /// Past retention with nobody holding it and nothing in flight.
  pub fn is_expired(&self, now: Instant) -> bool {
    if self.subscribers > 0 || self.in_flight.is_some() {
      return false;
    }
    self
      .idle_since
      .map(|since| now.saturating_duration_since(since) >= self.policy.gc_time)
      .unwrap_or(false)
  }

  pub fn store(&mut self, value: Erased, now: Instant) {
    self.data = Some(value);
    self.data_updated_at = Some(now);
    self.error = None;
    self.invalidated = false;
    self.status = QueryStatus::Success;
  }

  /// Previous data is kept so it stays visible during the error state.
  pub fn fail(&mut self, error: QueryError) {
    self.error = Some(error);
    self.status = QueryStatus::Error;
  }

  /// Mark stale. A fetch already in flight does not clear the mark.
  pub fn invalidate(&mut self) {
    self.invalidated = true;
    self.invalidations += 1;
  }

  /// Store a value written from outside a fetch, such as a mutation result.
  pub fn write(&mut self, value: Erased, now: Instant) {
    self.store(value, now);
    self.writes += 1;
  }

  pub fn ticket(&self, fetch_id: u64) -> FetchTicket {
    FetchTicket {
      fetch_id,
      entry_id: self.id,
      invalidations: self.invalidations,
      writes: self.writes,
    }
  }

  /// Apply the result of the fetch that took `ticket`.
  pub fn settle(&mut self, ticket: &FetchTicket, result: &Result<Erased, QueryError>, now: Instant) -> Settled {
    if self.writes != ticket.writes {
      if self.in_flight.is_none() && self.data.is_some() {
        self.status = QueryStatus::Success;
      }
      return Settled::Superseded;
    }
    match result {
      Ok(value) => {
        let invalidated_meanwhile = self.invalidations != ticket.invalidations;
        self.store(Arc::clone(value), now);
        if invalidated_meanwhile {
          self.invalidated = true;
          Settled::StoredStale
        } else {
          Settled::Stored
        }
      }
      Err(err) => {
        self.fail(err.clone());
        Settled::Failed
      }
    }
  }

  pub fn snapshot<T: Send + Sync + 'static>(&self, now: Instant) -> Snapshot<T> {
    let data = self
      .data
      .as_ref()
      .and_then(|value| Arc::clone(value).downcast::<T>().ok());
    Snapshot {
      is_stale: self.is_stale(now),
      data,
      updated_at: self.data_updated_at,
      error: self.error.clone(),
      status: self.status,
    }
  }
}

/// Point-in-time read of one entry.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
  pub data: Option<Arc<T>>,
  pub updated_at: Option<Instant>,
  pub error: Option<QueryError>,
  pub status: QueryStatus,
  pub is_stale: bool,
}

impl<T> Snapshot<T> {
  /// Snapshot of a key the cache has never seen.
  pub fn empty() -> Self {
    Self {
      data: None,
      updated_at: None,
      error: None,
      status: QueryStatus::Idle,
      is_stale: true,
    }
  }

  pub fn is_fetching(&self) -> bool {
    self.status == QueryStatus::Fetching
  }

  pub fn is_fresh(&self) -> bool {
    self.data.is_some() && !self.is_stale
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn policy() -> Policy {
    Policy::new(Duration::from_secs(60), Duration::from_secs(300), 1)
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_until_stale_time() {
    let start = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), start);
    assert!(entry.is_stale(start));

    entry.store(Arc::new(7u32), start);
    assert!(entry.is_fresh(start + Duration::from_secs(59)));
    assert!(entry.is_stale(start + Duration::from_secs(60)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidated_entry_is_stale_but_keeps_data() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    entry.store(Arc::new(7u32), now);
    entry.invalidate();

    let snap = entry.snapshot::<u32>(now);
    assert!(snap.is_stale);
    assert_eq!(snap.data.as_deref(), Some(&7));
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_keeps_last_data() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    entry.store(Arc::new(String::from("cached")), now);
    entry.fail(QueryError::InvalidPageSize);

    let snap = entry.snapshot::<String>(now);
    assert_eq!(snap.status, QueryStatus::Error);
    assert_eq!(snap.data.as_deref().map(String::as_str), Some("cached"));
    assert_eq!(snap.error, Some(QueryError::InvalidPageSize));
  }

  #[tokio::test(start_paused = true)]
  async fn test_expiry_requires_no_subscribers() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    let later = now + Duration::from_secs(300);
    assert!(entry.is_expired(later));

    entry.subscribers = 1;
    entry.idle_since = None;
    assert!(!entry.is_expired(later));
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_of_wrong_type_has_no_data() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    entry.store(Arc::new(7u32), now);
    assert!(entry.snapshot::<String>(now).data.is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidation_during_fetch_survives_settle() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    entry.store(Arc::new(1u32), now);
    let ticket = entry.ticket(7);

    entry.invalidate();
    let outcome = entry.settle(&ticket, &Ok(Arc::new(2u32) as Erased), now);

    assert_eq!(outcome, Settled::StoredStale);
    let snap = entry.snapshot::<u32>(now);
    assert_eq!(snap.data.as_deref(), Some(&2));
    assert!(snap.is_stale);
  }

  #[tokio::test(start_paused = true)]
  async fn test_write_during_fetch_supersedes_result() {
    let now = Instant::now();
    let mut entry = CacheEntry::new(1, policy(), now);
    let ticket = entry.ticket(7);

    entry.write(Arc::new(5u32), now);
    let outcome = entry.settle(&ticket, &Ok(Arc::new(2u32) as Erased), now);

    assert_eq!(outcome, Settled::Superseded);
    let snap = entry.snapshot::<u32>(now);
    assert_eq!(snap.data.as_deref(), Some(&5));
    assert!(!snap.is_stale);
    assert_eq!(snap.status, QueryStatus::Success);
  }
}
