use crate::backoffice::client::ApiClient;
use crate::backoffice::params::CategorySearch;
use crate::backoffice::types::{Category, CategoryPayload};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/categories";

#[derive(Debug, Clone)]
pub struct CategoryService {
  api: ApiClient,
}

impl CategoryService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// Unlike the other catalogue searches this page comes inside the envelope.
  pub async fn search(
    &self,
    params: &CategorySearch,
    page: PageRequest,
  ) -> Result<Page<Category>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .data()
      .await
  }

  pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
    self.api.get(BASE).data().await
  }

  pub async fn get(&self, id: u64) -> Result<Category, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, payload: &CategoryPayload) -> Result<Category, ServiceError> {
    self.api.post(BASE).body(payload).data().await
  }

  pub async fn update(&self, id: u64, payload: &CategoryPayload) -> Result<Category, ServiceError> {
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
