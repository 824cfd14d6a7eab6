use tracing::{debug, warn};

use crate::backoffice::client::ApiClient;
use crate::backoffice::types::{Stock, StockRequest};
use crate::error::ServiceError;
use crate::query::{Page, PageRequest};

const BASE: &str = "/api/stocks";

/// Page size used when collecting every stock row.
pub const ALL_STOCK_PAGE_SIZE: u32 = 100;
/// Collection stops after this many pages even if the backend reports more.
pub const ALL_STOCK_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct StockService {
  api: ApiClient,
}

impl StockService {
  pub fn new(api: ApiClient) -> Self {
    Self { api }
  }

  /// Stock of one product in every store that holds it.
  pub async fn by_product(&self, product_id: u64) -> Result<Vec<Stock>, ServiceError> {
    self
      .api
      .get(&format!("{}/product/{}", BASE, product_id))
      .data()
      .await
  }

  pub async fn by_product_and_store(&self, product_id: u64, store_id: u64) -> Result<Stock, ServiceError> {
    self
      .api
      .get(&format!("{}/product/{}/store/{}", BASE, product_id, store_id))
      .data()
      .await
  }

  pub async fn by_store(&self, store_id: u64) -> Result<Vec<Stock>, ServiceError> {
    self.api.get(&format!("{}/store/{}", BASE, store_id)).data().await
  }

  pub async fn paged(&self, page: PageRequest) -> Result<Page<Stock>, ServiceError> {
    self.api.get(&format!("{}/paged", BASE)).query(&page).data().await
  }

  /// Every stock row, read page by page. Any failed page fails the whole
  /// read so a partial result is never returned.
  pub async fn all(&self) -> Result<Vec<Stock>, ServiceError> {
    let mut stocks = Vec::new();
    let mut page = 0;
    loop {
      let batch = self
        .paged(PageRequest {
          page,
          size: ALL_STOCK_PAGE_SIZE,
        })
        .await?;
      stocks.extend(batch.content);
      page += 1;
      if page >= batch.total_pages {
        break;
      }
      if page >= ALL_STOCK_PAGE_LIMIT {
        warn!(
          pages = page,
          total_pages = batch.total_pages,
          "stock listing truncated at page limit"
        );
        break;
      }
    }
    debug!(pages = page, rows = stocks.len(), "collected all stock");
    Ok(stocks)
  }

  /// Creates or updates the row for the request's product and store.
  pub async fn save(&self, request: &StockRequest) -> Result<Stock, ServiceError> {
    self.api.post(BASE).body(request).data().await
  }
}
