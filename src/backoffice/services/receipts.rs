//! Import and export receipts.
//!
//! Both kinds share endpoints, filters and workflow actions; only the base
//! path and the payload types differ.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::marker::PhantomData;

use crate::backoffice::client::ApiClient;
use crate::backoffice::params::ReceiptSearch;
use crate::backoffice::types::{ExportReceipt, ExportRequest, Identified, ImportReceipt, ImportRequest};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

pub trait ReceiptKind: Send + Sync + 'static {
  /// Resource prefix, also used for cache resource names
  const NAME: &'static str;
  const BASE: &'static str;
  type Receipt: DeserializeOwned + Identified + Clone + Send + Sync + 'static;
  type Request: Serialize + Send + Sync;
}

#[derive(Debug, Clone, Copy)]
pub enum Import {}

#[derive(Debug, Clone, Copy)]
pub enum Export {}

impl ReceiptKind for Import {
  const NAME: &'static str = "imports";
  const BASE: &'static str = "/api/imports";
  type Receipt = ImportReceipt;
  type Request = ImportRequest;
}

impl ReceiptKind for Export {
  const NAME: &'static str = "exports";
  const BASE: &'static str = "/api/exports";
  type Receipt = ExportReceipt;
  type Request = ExportRequest;
}

/// Workflow transitions of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptAction {
  Approve,
  Confirm,
  Reject,
  Cancel,
}

impl ReceiptAction {
  pub const ALL: [ReceiptAction; 4] = [Self::Approve, Self::Confirm, Self::Reject, Self::Cancel];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Approve => "approve",
      Self::Confirm => "confirm",
      Self::Reject => "reject",
      Self::Cancel => "cancel",
    }
  }
}

impl fmt::Display for ReceiptAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The unpaged listing takes no sort parameters.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListFilter<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  status: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  code: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  from: Option<chrono::NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  to: Option<chrono::NaiveDate>,
}

impl<'a> From<&'a ReceiptSearch> for ListFilter<'a> {
  fn from(search: &'a ReceiptSearch) -> Self {
    Self {
      status: search.status.as_ref().map(|s| s.as_str()),
      code: search.code.as_deref(),
      from: search.from,
      to: search.to,
    }
  }
}

pub struct ReceiptService<K> {
  api: ApiClient,
  kind: PhantomData<K>,
}

impl<K> Clone for ReceiptService<K> {
  fn clone(&self) -> Self {
    Self {
      api: self.api.clone(),
      kind: PhantomData,
    }
  }
}

impl<K: ReceiptKind> fmt::Debug for ReceiptService<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReceiptService").field("kind", &K::NAME).finish()
  }
}

impl<K: ReceiptKind> ReceiptService<K> {
  pub fn new(api: ApiClient) -> Self {
    Self {
      api,
      kind: PhantomData,
    }
  }

  pub async fn search(
    &self,
    params: &ReceiptSearch,
    page: PageRequest,
  ) -> Result<Page<K::Receipt>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", K::BASE))
      .query(params)
      .query(&page)
      .data()
      .await
  }

  pub async fn list(&self, params: &ReceiptSearch) -> Result<Vec<K::Receipt>, ServiceError> {
    self
      .api
      .get(K::BASE)
      .query(&ListFilter::from(params))
      .data()
      .await
  }

  pub async fn get(&self, id: u64) -> Result<K::Receipt, ServiceError> {
    self.api.get(&format!("{}/{}", K::BASE, id)).data().await
  }

  pub async fn create(&self, request: &K::Request) -> Result<K::Receipt, ServiceError> {
    self.api.post(K::BASE).body(request).data().await
  }

  pub async fn update(&self, id: u64, request: &K::Request) -> Result<K::Receipt, ServiceError> {
    self
      .api
      .put(&format!("{}/{}", K::BASE, id))
      .body(request)
      .data()
      .await
  }

  /// Run a workflow action and return the receipt in its new state.
  pub async fn act(&self, id: u64, action: ReceiptAction) -> Result<K::Receipt, ServiceError> {
    self
      .api
      .post(&format!("{}/{}/{}", K::BASE, id, action))
      .data()
      .await
  }

  pub async fn approve(&self, id: u64) -> Result<K::Receipt, ServiceError> {
    self.act(id, ReceiptAction::Approve).await
  }

  pub async fn confirm(&self, id: u64) -> Result<K::Receipt, ServiceError> {
    self.act(id, ReceiptAction::Confirm).await
  }

  pub async fn reject(&self, id: u64) -> Result<K::Receipt, ServiceError> {
    self.act(id, ReceiptAction::Reject).await
  }

  pub async fn cancel(&self, id: u64) -> Result<K::Receipt, ServiceError> {
    self.act(id, ReceiptAction::Cancel).await
  }
}
