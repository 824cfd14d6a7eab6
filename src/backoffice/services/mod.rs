//! Entity services: gateway calls per domain operation.
//!
//! Services neither cache nor retry. Reads go through the query hooks of
//! [`crate::backoffice::Backoffice`]; mutations there also keep the cache
//! consistent.

mod auth;
mod categories;
mod customers;
mod inventory_checks;
mod products;
mod receipts;
mod stocks;
mod stores;
mod suppliers;
mod units;

pub use auth::AuthService;
pub use categories::CategoryService;
pub use customers::CustomerService;
pub use inventory_checks::InventoryCheckService;
pub use products::ProductService;
pub use receipts::{Export, Import, ReceiptAction, ReceiptKind, ReceiptService};
pub use stocks::{StockService, ALL_STOCK_PAGE_LIMIT, ALL_STOCK_PAGE_SIZE};
pub use stores::StoreService;
pub use suppliers::SupplierService;
pub use units::UnitService;

use super::client::ApiClient;

/// Every entity service over one gateway client.
#[derive(Debug, Clone)]
pub struct Services {
  pub products: ProductService,
  pub suppliers: SupplierService,
  pub customers: CustomerService,
  pub imports: ReceiptService<Import>,
  pub exports: ReceiptService<Export>,
  pub inventory_checks: InventoryCheckService,
  pub stores: StoreService,
  pub stocks: StockService,
  pub units: UnitService,
  pub categories: CategoryService,
  pub auth: AuthService,
}

impl Services {
  pub fn new(api: ApiClient) -> Self {
    Self {
      products: ProductService::new(api.clone()),
      suppliers: SupplierService::new(api.clone()),
      customers: CustomerService::new(api.clone()),
      imports: ReceiptService::new(api.clone()),
      exports: ReceiptService::new(api.clone()),
      inventory_checks: InventoryCheckService::new(api.clone()),
      stores: StoreService::new(api.clone()),
      stocks: StockService::new(api.clone()),
      units: UnitService::new(api.clone()),
      categories: CategoryService::new(api.clone()),
      auth: AuthService::new(api),
    }
  }
}
