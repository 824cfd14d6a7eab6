use tracing::warn;

use crate::backoffice::client::ApiClient;
use crate::backoffice::params::SupplierSearch;
use crate::backoffice::types::{ExportSupplier, Supplier, SupplierPayload};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/suppliers";
const EXPORT_SUPPLIERS: &str = "/api/exports/suppliers";

#[derive(Debug, Clone)]
pub struct SupplierService {
  api: ApiClient,
}

impl SupplierService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// The backend returns this page without an envelope.
  pub async fn search(
    &self,
    params: &SupplierSearch,
    page: PageRequest,
  ) -> Result<Page<Supplier>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .json()
      .await
  }

  /// Suppliers of one type, or all of them.
  ///
  /// Accounts without access to the catalogue get an empty list so pickers
  /// keep working.
  pub async fn list(&self, kind: Option<&str>) -> Result<Vec<Supplier>, ServiceError> {
    let mut call = self.api.get(BASE);
    if let Some(kind) = kind.filter(|k| !k.is_empty()) {
      call = call.query(&[("type", kind)]);
    }
    match call.data().await {
      Err(ServiceError::Status { status, message }) if status == 401 || status == 403 => {
        warn!(status, message = %message, "supplier list not permitted, using empty list");
        Ok(Vec::new())
      }
      result => result,
    }
  }

  pub async fn get(&self, id: u64) -> Result<Supplier, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, payload: &SupplierPayload) -> Result<Supplier, ServiceError> {
    self.api.post(BASE).body(payload).data().await
  }

  pub async fn update(&self, id: u64, payload: &SupplierPayload) -> Result<Supplier, ServiceError> {
    self
      .api
      .put(&format!("{}/{}", BASE, id))
      .body(payload)
      .data()
      .await
  }

  pub async fn delete(&self, id: u64) -> Result<(), ServiceError> {
    self.api.delete(&format!("{}/{}", BASE, id)).empty().await
  }

  /// Counterparts offered on export receipts.
  pub async fn export_suppliers(&self) -> Result<Vec<ExportSupplier>, ServiceError> {
    self.api.get(EXPORT_SUPPLIERS).data().await
  }
}
