use crate::backoffice::client::ApiClient;
use crate::backoffice::params::CustomerSearch;
use crate::backoffice::types::{Customer, CustomerRequest};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/customers";

#[derive(Debug, Clone)]
pub struct CustomerService {
  api: ApiClient,
}

impl CustomerService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  pub async fn search(
    &self,
    params: &CustomerSearch,
    page: PageRequest,
  ) -> Result<Page<Customer>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .json()
      .await
  }

  pub async fn list(&self) -> Result<Vec<Customer>, ServiceError> {
    self.api.get(BASE).data().await
  }

  pub async fn get(&self, id: u64) -> Result<Customer, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, request: &CustomerRequest) -> Result<Customer, ServiceError> {
    self.api.post(BASE).body(request).data().await
  }

  pub async fn update(&self, id: u64, request: &CustomerRequest) -> Result<Customer, ServiceError> {
    self
      .api
      .put(&format!("{}/{}", BASE, id))
      .body(request)
      .data()
      .await
  }

  pub async fn delete(&self, id: u64) -> Result<(), ServiceError> {
    self.api.delete(&format!("{}/{}", BASE, id)).empty().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backoffice::services::testing::api;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_search_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/customers/search"))
      .and(query_param("phone", "0901"))
      .and(query_param("sort", "name,asc"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"id": 8, "name": "Lê C", "phone": "0901234567"}],
        "totalElements": 1,
        "totalPages": 1,
      })))
      .mount(&server)
      .await;

    let service = CustomerService::new(api(&server));
    let search = CustomerSearch::default()
      .phone("0901")
      .sort("name", crate::backoffice::params::SortDir::Asc);
    let page = service.search(&search, PageRequest { page: 0, size: 10 }).await.unwrap();
    assert_eq!(page.content[0].display_name(), "Lê C");
  }

  #[tokio::test]
  async fn test_create_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/customers"))
      .and(body_json(json!({"name": "Phạm D", "phone": "0987"})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": 30, "name": "Phạm D"}})))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/api/customers/30"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": null})))
      .expect(1)
      .mount(&server)
      .await;

    let service = CustomerService::new(api(&server));
    let request = CustomerRequest {
      name: Some("Phạm D".to_string()),
      phone: Some("0987".to_string()),
      ..Default::default()
    };
    assert_eq!(service.create(&request).await.unwrap().id, 30);
    service.delete(30).await.unwrap();
  }
}
