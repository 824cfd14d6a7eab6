//! Per-resource freshness, retention and retry settings.

use std::collections::HashMap;
use std::time::Duration;

/// Upper bound for the exponential retry backoff.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Static cache policy of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
  /// How long after a successful fetch data is served without refetching
  pub stale_time: Duration,
  /// How long an entry without subscribers is kept before eviction
  pub gc_time: Duration,
  /// Retries after the first failed attempt (transport failures only)
  pub retry: u32,
}

impl Policy {
  /// Retention never ends before staleness: `gc_time` is raised to
  /// `stale_time` when given a shorter window.
  pub const fn new(stale_time: Duration, gc_time: Duration, retry: u32) -> Self {
    let gc_time = if gc_time.as_nanos() < stale_time.as_nanos() {
      stale_time
    } else {
      gc_time
    };
    Self {
      stale_time,
      gc_time,
      retry,
    }
  }

  pub fn with_stale_time(self, stale_time: Duration) -> Self {
    Self::new(stale_time, self.gc_time, self.retry)
  }

  pub fn with_gc_time(self, gc_time: Duration) -> Self {
    Self::new(self.stale_time, gc_time, self.retry)
  }

  pub fn with_retry(self, retry: u32) -> Self {
    Self { retry, ..self }
  }

  /// Delay before retry number `attempt` (0 for the first retry):
  /// `min(1s * 2^attempt, 30s)`.
  pub fn retry_delay(attempt: u32) -> Duration {
    let millis = 1000u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(millis).min(MAX_RETRY_DELAY)
  }
}

impl Default for Policy {
  /// One minute fresh, five minutes retained, one retry.
  fn default() -> Self {
    Self::new(Duration::from_secs(60), Duration::from_secs(5 * 60), 1)
  }
}

/// Resource name to policy, with a fallback for unlisted resources.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
  policies: HashMap<String, Policy>,
  fallback: Policy,
}

impl PolicyTable {
  pub fn new(fallback: Policy) -> Self {
    Self {
      policies: HashMap::new(),
      fallback,
    }
  }

  pub fn with(mut self, resource: &str, policy: Policy) -> Self {
    self.insert(resource, policy);
    self
  }

  pub fn insert(&mut self, resource: &str, policy: Policy) {
    self.policies.insert(resource.to_string(), policy);
  }

  pub fn get(&self, resource: &str) -> Policy {
    self
      .policies
      .get(resource)
      .copied()
      .unwrap_or(self.fallback)
  }

  pub fn fallback(&self) -> Policy {
    self.fallback
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_gc_time_never_shorter_than_stale_time() {
    let policy = Policy::new(Duration::from_secs(120), Duration::from_secs(10), 0);
    assert_eq!(policy.gc_time, Duration::from_secs(120));

    let lowered = Policy::default().with_gc_time(Duration::ZERO);
    assert_eq!(lowered.gc_time, lowered.stale_time);
  }

  #[test]
  fn test_retry_delay_doubles_then_caps() {
    assert_eq!(Policy::retry_delay(0), Duration::from_secs(1));
    assert_eq!(Policy::retry_delay(1), Duration::from_secs(2));
    assert_eq!(Policy::retry_delay(4), Duration::from_secs(16));
    assert_eq!(Policy::retry_delay(5), MAX_RETRY_DELAY);
    assert_eq!(Policy::retry_delay(40), MAX_RETRY_DELAY);
  }

  #[test]
  fn test_table_falls_back_for_unknown_resource() {
    let detail = Policy::new(Duration::from_secs(30), Duration::from_secs(300), 2);
    let table = PolicyTable::default().with("products.detail", detail);
    assert_eq!(table.get("products.detail"), detail);
    assert_eq!(table.get("unknown"), Policy::default());
  }
}
