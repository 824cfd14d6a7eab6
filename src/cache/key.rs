//! Cache key composition.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::QueryError;

/// Page slot of a paged key. `index` is zero-based, as sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageSlot {
  pub index: u32,
  pub size: u32,
}

/// Identity of one cache entry: (resource, serialized params, page slot).
///
/// Keys compare structurally. Parameters are serialized to canonical JSON
/// (object keys sorted, absent fields omitted), so two parameter values that
/// serialize equally always land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  resource: String,
  params: String,
  page: Option<PageSlot>,
}

impl CacheKey {
  /// Key for a non-paged read (list-all, detail-by-id).
  pub fn new<P: Serialize + ?Sized>(resource: &str, params: &P) -> Result<Self, QueryError> {
    Ok(Self {
      resource: resource.to_string(),
      params: canonical_json(params)?,
      page: None,
    })
  }

  /// Key for a paged read.
  pub fn paged<P: Serialize + ?Sized>(
    resource: &str,
    params: &P,
    index: u32,
    size: u32,
  ) -> Result<Self, QueryError> {
    Ok(Self {
      page: Some(PageSlot { index, size }),
      ..Self::new(resource, params)?
    })
  }

  pub fn resource(&self) -> &str {
    &self.resource
  }

  pub fn params(&self) -> &str {
    &self.params
  }

  pub fn page(&self) -> Option<PageSlot> {
    self.page
  }

  /// Same resource and params, another page.
  pub fn with_page(&self, index: u32, size: u32) -> Self {
    Self {
      page: Some(PageSlot { index, size }),
      ..self.clone()
    }
  }

  /// Short stable hash used as a log field.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.resource, self.params)?;
    if let Some(slot) = self.page {
      write!(f, "#{}/{}", slot.index, slot.size)?;
    }
    Ok(())
  }
}

fn canonical_json<P: Serialize + ?Sized>(params: &P) -> Result<String, QueryError> {
  let value = serde_json::to_value(params).map_err(|e| QueryError::InvalidParams(e.to_string()))?;
  Ok(canonicalize(value).to_string())
}

/// Rebuild objects with sorted keys so ordering never depends on the
/// map implementation serde_json was compiled with.
fn canonicalize(value: Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(String, Value)> = map.into_iter().collect();
      entries.sort_by(|a, b| a.0.cmp(&b.0));
      let mut sorted = Map::new();
      for (k, v) in entries {
        sorted.insert(k, canonicalize(v));
      }
      Value::Object(sorted)
    }
    Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
    other => other,
  }
}
