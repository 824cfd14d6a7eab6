use crate::backoffice::client::ApiClient;
use crate::backoffice::params::StoreSearch;
use crate::backoffice::types::{Store, StorePayload};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/stores";

#[derive(Debug, Clone)]
pub struct StoreService {
  api: ApiClient,
}

impl StoreService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// The backend returns this page without an envelope.
  pub async fn search(&self, params: &StoreSearch, page: PageRequest) -> Result<Page<Store>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .json()
      .await
  }

  pub async fn list(&self) -> Result<Vec<Store>, ServiceError> {
    self.api.get(BASE).data().await
  }

  pub async fn get(&self, id: u64) -> Result<Store, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, payload: &StorePayload) -> Result<Store, ServiceError> {
    self.api.post(BASE).body(payload).data().await
  }

  pub async fn update(&self, id: u64, payload: &StorePayload) -> Result<Store, ServiceError> {
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
}
