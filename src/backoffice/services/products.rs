use crate::backoffice::client::ApiClient;
use crate::backoffice::params::ProductSearch;
use crate::backoffice::types::{Product, ProductPayload};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/products";

#[derive(Debug, Clone)]
pub struct ProductService {
  api: ApiClient,
}

impl ProductService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// The backend returns this page without an envelope.
  pub async fn search(
    &self,
    params: &ProductSearch,
    page: PageRequest,
  ) -> Result<Page<Product>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .json()
      .await
  }

  pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
    self.api.get(BASE).data().await
  }

  pub async fn get(&self, id: u64) -> Result<Product, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, payload: &ProductPayload) -> Result<Product, ServiceError> {
    self.api.post(BASE).body(payload).data().await
  }

  pub async fn update(&self, id: u64, payload: &ProductPayload) -> Result<Product, ServiceError> {
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
