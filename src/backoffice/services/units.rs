use crate::backoffice::client::ApiClient;
use crate::backoffice::params::UnitSearch;
use crate::backoffice::types::{Unit, UnitPayload};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/units";

#[derive(Debug, Clone)]
pub struct UnitService {
  api: ApiClient,
}

impl UnitService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// The backend returns this page without an envelope.
  pub async fn search(&self, params: &UnitSearch, page: PageRequest) -> Result<Page<Unit>, ServiceError> {
    self
      .api
      .get(&format!("{}/search", BASE))
      .query(params)
      .query(&page)
      .json()
      .await
  }

  pub async fn list(&self) -> Result<Vec<Unit>, ServiceError> {
    self.api.get(BASE).data().await
  }

  pub async fn get(&self, id: u64) -> Result<Unit, ServiceError> {
    self.api.get(&format!("{}/{}", BASE, id)).data().await
  }

  pub async fn create(&self, payload: &UnitPayload) -> Result<Unit, ServiceError> {
    self.api.post(BASE).body(payload).data().await
  }

  pub async fn update(&self, id: u64, payload: &UnitPayload) -> Result<Unit, ServiceError> {
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

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backoffice::services::testing::api;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_search_sends_name_and_sort() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/units/search"))
      .and(query_param("name", "hộp"))
      .and(query_param("sort", "name,asc"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{"id": 4, "name": "Hộp", "active": true}],
        "totalElements": 1,
        "totalPages": 1,
      })))
      .mount(&server)
      .await;

    let service = UnitService::new(api(&server));
    let params = UnitSearch::default().name("hộp").sort("name", crate::backoffice::params::SortDir::Asc);
    let page = service.search(&params, PageRequest { page: 0, size: 10 }).await.unwrap();
    assert_eq!(page.content[0].active, Some(true));
  }

  #[tokio::test]
  async fn test_update_sends_payload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/api/units/4"))
      .and(body_json(json!({"name": "Thùng", "active": false})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {"id": 4, "name": "Thùng", "active": false},
      })))
      .mount(&server)
      .await;

    let service = UnitService::new(api(&server));
    let payload = UnitPayload {
      name: "Thùng".to_string(),
      active: Some(false),
      ..Default::default()
    };
    assert_eq!(service.update(4, &payload).await.unwrap().name, "Thùng");
  }
}
