//! Shared query cache with request coalescing and stale-while-revalidate.
//!
//! This module is resource-agnostic:
//! - Entries are addressed by a structural [`CacheKey`] (resource, params, page)
//! - Freshness, retention and retry come from a static per-resource [`Policy`]
//! - At most one network call is in flight per key; concurrent readers share it
//! - Failed refetches keep the last good data visible

mod entry;
mod key;
mod layer;
mod policy;

pub use entry::{QueryStatus, Snapshot};
pub use key::{CacheKey, PageSlot};
pub use layer::{QueryClient, Subscription};
pub use policy::{Policy, PolicyTable};
