use crate::backoffice::client::ApiClient;
use crate::backoffice::params::InventoryCheckSearch;
use crate::backoffice::types::{InventoryCheck, InventoryCheckRequest, RejectRequest};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/inventory-checks";

#[derive(Debug, Clone)]
pub struct InventoryCheckService {
  api: ApiClient,
}

impl InventoryCheckService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  pub async fn search(
    &self,
    params: &InventoryCheckSearch,
    page: PageRequest,
  ) -> Result<Page<InventoryCheck>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .data()
      .await
  }

  pub async fn list(&self, params: &InventoryCheckSearch) -> Result<Vec<InventoryCheck>, ServiceError> {
    self.api.get(BASE).query(params).data().await
  }

  pub async fn get(&self, id: u64) -> Result<InventoryCheck, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, request: &InventoryCheckRequest) -> Result<InventoryCheck, ServiceError> {
    self.api.post(BASE).body(request).data().await
  }

  pub async fn update(
    &self,
    id: u64,
    request: &InventoryCheckRequest,
  ) -> Result<InventoryCheck, ServiceError> {
    self
      .api
      .put(&format!("{}/{}", BASE, id))
      .body(request)
      .data()
      .await
  }

  pub async fn approve(&self, id: u64) -> Result<InventoryCheck, ServiceError> {
    self.api.post(&format!("{}/{}/approve", BASE, id)).data().await
  }

  pub async fn confirm(&self, id: u64) -> Result<InventoryCheck, ServiceError> {
    self.api.post(&format!("{}/{}/confirm", BASE, id)).data().await
  }

  pub async fn reject(&self, id: u64, reason: &str) -> Result<InventoryCheck, ServiceError> {
    self
      .api
      .post(&format!("{}/{}/reject", BASE, id))
      .body(&RejectRequest {
        reason: reason.to_string(),
      })
      .data()
      .await
  }

  pub async fn delete(&self, id: u64) -> Result<(), ServiceError> {
    self.api.delete(&format!("{}/{}", BASE, id)).empty().await
  }
}
