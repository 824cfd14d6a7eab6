//! Cached backoffice client: query hooks per resource and mutations that
//! keep the cache consistent.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use super::cache::{policy_table, Resource};
use super::client::ApiClient;
use super::params::{
  CategorySearch, CustomerSearch, InventoryCheckSearch, ProductSearch, ReceiptSearch, StoreSearch, SupplierSearch,
  UnitSearch,
};
use super::services::{ReceiptAction, ReceiptKind, ReceiptService, Services};
use super::types::{
  Category, CategoryPayload, Customer, CustomerRequest, ExportReceipt, ExportRequest, ExportSupplier, Identified,
  ImportReceipt, ImportRequest, InventoryCheck, InventoryCheckRequest, LoginResponse, Product, ProductPayload, Stock,
  StockRequest, Store, StorePayload, Supplier, SupplierPayload, Unit, UnitPayload, UpdateProfileRequest, UserProfile,
};
use crate::cache::{CacheKey, QueryClient};
use crate::config::Config;
use crate::error::{QueryError, ServiceError};
use crate::query::{Page, PageRequest, PagedQuery, Query};
use crate::session::{Session, TokenStore, UserInfo};

/// Resources touched when one entity changes.
struct Family {
  /// Listings that may contain the entity
  listings: &'static [Resource],
  detail: Resource,
}

const PRODUCTS: Family = Family {
  listings: &[Resource::ProductsSearch, Resource::ProductsList],
  detail: Resource::ProductDetail,
};

const SUPPLIERS: Family = Family {
  listings: &[Resource::SuppliersSearch, Resource::SuppliersList, Resource::ExportSuppliers],
  detail: Resource::SupplierDetail,
};

const CUSTOMERS: Family = Family {
  listings: &[Resource::CustomersSearch, Resource::CustomersList],
  detail: Resource::CustomerDetail,
};

const STORES: Family = Family {
  listings: &[Resource::StoresSearch, Resource::StoresList],
  detail: Resource::StoreDetail,
};

const UNITS: Family = Family {
  listings: &[Resource::UnitsSearch, Resource::UnitsList],
  detail: Resource::UnitDetail,
};

const CATEGORIES: Family = Family {
  listings: &[Resource::CategoriesSearch, Resource::CategoriesList],
  detail: Resource::CategoryDetail,
};

/// Listings that carry stock levels.
const STOCK_LISTINGS: [Resource; 4] = [
  Resource::ProductsList,
  Resource::StocksAll,
  Resource::StocksByProduct,
  Resource::StocksByStore,
];

/// Receipts and checks move stock, so stock listings go stale with them.
const IMPORTS: Family = Family {
  listings: &[
    Resource::ImportsSearch,
    Resource::ImportsList,
    Resource::ProductsList,
    Resource::StocksAll,
    Resource::StocksByProduct,
    Resource::StocksByStore,
  ],
  detail: Resource::ImportDetail,
};

const EXPORTS: Family = Family {
  listings: &[
    Resource::ExportsSearch,
    Resource::ExportsList,
    Resource::ProductsList,
    Resource::StocksAll,
    Resource::StocksByProduct,
    Resource::StocksByStore,
  ],
  detail: Resource::ExportDetail,
};

const INVENTORY_CHECKS: Family = Family {
  listings: &[
    Resource::InventoryChecksSearch,
    Resource::InventoryChecksList,
    Resource::ProductsList,
    Resource::StocksAll,
    Resource::StocksByProduct,
    Resource::StocksByStore,
  ],
  detail: Resource::InventoryCheckDetail,
};

/// Backoffice client with a shared query cache.
///
/// Reads are handed out as hooks ([`PagedQuery`], [`Query`]) bound to the
/// resource's policy. Mutations go straight to the services and then mark
/// the affected listings stale and store the returned entity under its
/// detail key.
#[derive(Clone)]
pub struct Backoffice {
  api: ApiClient,
  queries: QueryClient,
  services: Services,
  page_size: u32,
}

impl Backoffice {
  pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self> {
    let api = ApiClient::new(&config.api, tokens).map_err(|e| eyre!("Failed to create API client: {}", e))?;
    let queries = QueryClient::new(policy_table(&config.cache));
    Ok(Self::from_parts(api, queries, config.page_size))
  }

  pub fn from_parts(api: ApiClient, queries: QueryClient, page_size: u32) -> Self {
    Self {
      services: Services::new(api.clone()),
      api,
      queries,
      page_size: page_size.max(1),
    }
  }

  pub fn queries(&self) -> &QueryClient {
    &self.queries
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  /// Uncached access to the entity services.
  pub fn services(&self) -> &Services {
    &self.services
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  // ==========================================================================
  // Session
  // ==========================================================================

  /// Log in, store the token and drop everything cached for the previous
  /// user.
  pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
    let response = self
      .services
      .auth
      .login(username, password)
      .await
      .map_err(|e| eyre!("Login failed: {}", e))?;
    self.api.tokens().save(&response.token)?;
    self.queries.clear();
    info!(username = %response.username, "logged in");
    Ok(response)
  }

  pub fn logout(&self) -> Result<()> {
    self.api.tokens().clear()?;
    self.queries.clear();
    info!("logged out");
    Ok(())
  }

  pub fn session(&self) -> Option<UserInfo> {
    Session::current(self.api.tokens().as_ref())
  }

  pub fn is_logged_in(&self) -> bool {
    self.api.tokens().is_logged_in()
  }

  // ==========================================================================
  // Read hooks
  // ==========================================================================

  pub fn products(&self, params: ProductSearch) -> Result<PagedQuery<Product, ProductSearch>, QueryError> {
    let service = self.services.products.clone();
    self.paged(Resource::ProductsSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn product_list(&self) -> Result<Query<Vec<Product>>, QueryError> {
    let service = self.services.products.clone();
    self.keyed(Resource::ProductsList, &(), move || {
      let service = service.clone();
      async move { service.list().await }
    })
  }

  /// Disabled while `id` is `None`.
  pub fn product(&self, id: Option<u64>) -> Result<Query<Product>, QueryError> {
    let service = self.services.products.clone();
    self.detail(Resource::ProductDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn suppliers(&self, params: SupplierSearch) -> Result<PagedQuery<Supplier, SupplierSearch>, QueryError> {
    let service = self.services.suppliers.clone();
    self.paged(Resource::SuppliersSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn supplier_list(&self, kind: Option<&str>) -> Result<Query<Vec<Supplier>>, QueryError> {
    let service = self.services.suppliers.clone();
    let kind = kind.map(str::to_string);
    let key_kind = kind.clone();
    self.keyed(Resource::SuppliersList, &key_kind, move || {
      let service = service.clone();
      let kind = kind.clone();
      async move { service.list(kind.as_deref()).await }
    })
  }

  pub fn supplier(&self, id: Option<u64>) -> Result<Query<Supplier>, QueryError> {
    let service = self.services.suppliers.clone();
    self.detail(Resource::SupplierDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn export_suppliers(&self) -> Result<Query<Vec<ExportSupplier>>, QueryError> {
    let service = self.services.suppliers.clone();
    self.keyed(Resource::ExportSuppliers, &(), move || {
      let service = service.clone();
      async move { service.export_suppliers().await }
    })
  }

  pub fn customers(&self, params: CustomerSearch) -> Result<PagedQuery<Customer, CustomerSearch>, QueryError> {
    let service = self.services.customers.clone();
    self.paged(Resource::CustomersSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn customer_list(&self) -> Result<Query<Vec<Customer>>, QueryError> {
    let service = self.services.customers.clone();
    self.keyed(Resource::CustomersList, &(), move || {
      let service = service.clone();
      async move { service.list().await }
    })
  }

  pub fn customer(&self, id: Option<u64>) -> Result<Query<Customer>, QueryError> {
    let service = self.services.customers.clone();
    self.detail(Resource::CustomerDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn imports(&self, params: ReceiptSearch) -> Result<PagedQuery<ImportReceipt, ReceiptSearch>, QueryError> {
    self.receipts(&self.services.imports, Resource::ImportsSearch, params)
  }

  pub fn import_list(&self, params: ReceiptSearch) -> Result<Query<Vec<ImportReceipt>>, QueryError> {
    self.receipt_list(&self.services.imports, Resource::ImportsList, params)
  }

  pub fn import(&self, id: Option<u64>) -> Result<Query<ImportReceipt>, QueryError> {
    self.receipt(&self.services.imports, Resource::ImportDetail, id)
  }

  pub fn exports(&self, params: ReceiptSearch) -> Result<PagedQuery<ExportReceipt, ReceiptSearch>, QueryError> {
    self.receipts(&self.services.exports, Resource::ExportsSearch, params)
  }

  pub fn export_list(&self, params: ReceiptSearch) -> Result<Query<Vec<ExportReceipt>>, QueryError> {
    self.receipt_list(&self.services.exports, Resource::ExportsList, params)
  }

  pub fn export(&self, id: Option<u64>) -> Result<Query<ExportReceipt>, QueryError> {
    self.receipt(&self.services.exports, Resource::ExportDetail, id)
  }

  pub fn inventory_checks(
    &self,
    params: InventoryCheckSearch,
  ) -> Result<PagedQuery<InventoryCheck, InventoryCheckSearch>, QueryError> {
    let service = self.services.inventory_checks.clone();
    self.paged(Resource::InventoryChecksSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn inventory_check_list(
    &self,
    params: InventoryCheckSearch,
  ) -> Result<Query<Vec<InventoryCheck>>, QueryError> {
    let service = self.services.inventory_checks.clone();
    let key_params = params.clone();
    self.keyed(Resource::InventoryChecksList, &key_params, move || {
      let service = service.clone();
      let params = params.clone();
      async move { service.list(&params).await }
    })
  }

  pub fn inventory_check(&self, id: Option<u64>) -> Result<Query<InventoryCheck>, QueryError> {
    let service = self.services.inventory_checks.clone();
    self.detail(Resource::InventoryCheckDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn stores(&self, params: StoreSearch) -> Result<PagedQuery<Store, StoreSearch>, QueryError> {
    let service = self.services.stores.clone();
    self.paged(Resource::StoresSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn store_list(&self) -> Result<Query<Vec<Store>>, QueryError> {
    let service = self.services.stores.clone();
    self.keyed(Resource::StoresList, &(), move || {
      let service = service.clone();
      async move { service.list().await }
    })
  }

  pub fn store(&self, id: Option<u64>) -> Result<Query<Store>, QueryError> {
    let service = self.services.stores.clone();
    self.detail(Resource::StoreDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn units(&self, params: UnitSearch) -> Result<PagedQuery<Unit, UnitSearch>, QueryError> {
    let service = self.services.units.clone();
    self.paged(Resource::UnitsSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn unit_list(&self) -> Result<Query<Vec<Unit>>, QueryError> {
    let service = self.services.units.clone();
    self.keyed(Resource::UnitsList, &(), move || {
      let service = service.clone();
      async move { service.list().await }
    })
  }

  pub fn unit(&self, id: Option<u64>) -> Result<Query<Unit>, QueryError> {
    let service = self.services.units.clone();
    self.detail(Resource::UnitDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  pub fn categories(&self, params: CategorySearch) -> Result<PagedQuery<Category, CategorySearch>, QueryError> {
    let service = self.services.categories.clone();
    self.paged(Resource::CategoriesSearch, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  pub fn category_list(&self) -> Result<Query<Vec<Category>>, QueryError> {
    let service = self.services.categories.clone();
    self.keyed(Resource::CategoriesList, &(), move || {
      let service = service.clone();
      async move { service.list().await }
    })
  }

  pub fn category(&self, id: Option<u64>) -> Result<Query<Category>, QueryError> {
    let service = self.services.categories.clone();
    self.detail(Resource::CategoryDetail, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  /// Every stock row merged from all pages, cached under one key.
  pub fn all_stocks(&self) -> Result<Query<Vec<Stock>>, QueryError> {
    let service = self.services.stocks.clone();
    self.keyed(Resource::StocksAll, &(), move || {
      let service = service.clone();
      async move { service.all().await }
    })
  }

  /// Disabled while `product_id` is `None`.
  pub fn product_stocks(&self, product_id: Option<u64>) -> Result<Query<Vec<Stock>>, QueryError> {
    let service = self.services.stocks.clone();
    self.detail(Resource::StocksByProduct, product_id, move |id| {
      let service = service.clone();
      async move { service.by_product(id).await }
    })
  }

  pub fn store_stocks(&self, store_id: Option<u64>) -> Result<Query<Vec<Stock>>, QueryError> {
    let service = self.services.stocks.clone();
    self.detail(Resource::StocksByStore, store_id, move |id| {
      let service = service.clone();
      async move { service.by_store(id).await }
    })
  }

  pub fn profile(&self) -> Result<Query<UserProfile>, QueryError> {
    let service = self.services.auth.clone();
    self.keyed(Resource::Profile, &(), move || {
      let service = service.clone();
      async move { service.profile().await }
    })
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  pub async fn create_product(&self, payload: &ProductPayload) -> Result<Product, ServiceError> {
    let product = self.services.products.create(payload).await?;
    self.written(&PRODUCTS, &product);
    Ok(product)
  }

  pub async fn update_product(&self, id: u64, payload: &ProductPayload) -> Result<Product, ServiceError> {
    let product = self.services.products.update(id, payload).await?;
    self.written(&PRODUCTS, &product);
    Ok(product)
  }

  pub async fn delete_product(&self, id: u64) -> Result<(), ServiceError> {
    self.services.products.delete(id).await?;
    self.deleted(&PRODUCTS, id);
    Ok(())
  }

  pub async fn create_supplier(&self, payload: &SupplierPayload) -> Result<Supplier, ServiceError> {
    let supplier = self.services.suppliers.create(payload).await?;
    self.written(&SUPPLIERS, &supplier);
    Ok(supplier)
  }

  pub async fn update_supplier(&self, id: u64, payload: &SupplierPayload) -> Result<Supplier, ServiceError> {
    let supplier = self.services.suppliers.update(id, payload).await?;
    self.written(&SUPPLIERS, &supplier);
    Ok(supplier)
  }

  pub async fn delete_supplier(&self, id: u64) -> Result<(), ServiceError> {
    self.services.suppliers.delete(id).await?;
    self.deleted(&SUPPLIERS, id);
    Ok(())
  }

  pub async fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, ServiceError> {
    let customer = self.services.customers.create(request).await?;
    self.written(&CUSTOMERS, &customer);
    Ok(customer)
  }

  pub async fn update_customer(&self, id: u64, request: &CustomerRequest) -> Result<Customer, ServiceError> {
    let customer = self.services.customers.update(id, request).await?;
    self.written(&CUSTOMERS, &customer);
    Ok(customer)
  }

  pub async fn delete_customer(&self, id: u64) -> Result<(), ServiceError> {
    self.services.customers.delete(id).await?;
    self.deleted(&CUSTOMERS, id);
    Ok(())
  }

  pub async fn create_import(&self, request: &ImportRequest) -> Result<ImportReceipt, ServiceError> {
    let receipt = self.services.imports.create(request).await?;
    self.written(&IMPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn update_import(&self, id: u64, request: &ImportRequest) -> Result<ImportReceipt, ServiceError> {
    let receipt = self.services.imports.update(id, request).await?;
    self.written(&IMPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn import_action(&self, id: u64, action: ReceiptAction) -> Result<ImportReceipt, ServiceError> {
    let receipt = self.services.imports.act(id, action).await?;
    self.written(&IMPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn create_export(&self, request: &ExportRequest) -> Result<ExportReceipt, ServiceError> {
    let receipt = self.services.exports.create(request).await?;
    self.written(&EXPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn update_export(&self, id: u64, request: &ExportRequest) -> Result<ExportReceipt, ServiceError> {
    let receipt = self.services.exports.update(id, request).await?;
    self.written(&EXPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn export_action(&self, id: u64, action: ReceiptAction) -> Result<ExportReceipt, ServiceError> {
    let receipt = self.services.exports.act(id, action).await?;
    self.written(&EXPORTS, &receipt);
    Ok(receipt)
  }

  pub async fn create_inventory_check(
    &self,
    request: &InventoryCheckRequest,
  ) -> Result<InventoryCheck, ServiceError> {
    let check = self.services.inventory_checks.create(request).await?;
    self.written(&INVENTORY_CHECKS, &check);
    Ok(check)
  }

  pub async fn update_inventory_check(
    &self,
    id: u64,
    request: &InventoryCheckRequest,
  ) -> Result<InventoryCheck, ServiceError> {
    let check = self.services.inventory_checks.update(id, request).await?;
    self.written(&INVENTORY_CHECKS, &check);
    Ok(check)
  }

  pub async fn approve_inventory_check(&self, id: u64) -> Result<InventoryCheck, ServiceError> {
    let check = self.services.inventory_checks.approve(id).await?;
    self.written(&INVENTORY_CHECKS, &check);
    Ok(check)
  }

  pub async fn confirm_inventory_check(&self, id: u64) -> Result<InventoryCheck, ServiceError> {
    let check = self.services.inventory_checks.confirm(id).await?;
    self.written(&INVENTORY_CHECKS, &check);
    Ok(check)
  }

  pub async fn reject_inventory_check(&self, id: u64, reason: &str) -> Result<InventoryCheck, ServiceError> {
    let check = self.services.inventory_checks.reject(id, reason).await?;
    self.written(&INVENTORY_CHECKS, &check);
    Ok(check)
  }

  pub async fn delete_inventory_check(&self, id: u64) -> Result<(), ServiceError> {
    self.services.inventory_checks.delete(id).await?;
    self.deleted(&INVENTORY_CHECKS, id);
    Ok(())
  }

  pub async fn create_store(&self, payload: &StorePayload) -> Result<Store, ServiceError> {
    let store = self.services.stores.create(payload).await?;
    self.written(&STORES, &store);
    Ok(store)
  }

  pub async fn update_store(&self, id: u64, payload: &StorePayload) -> Result<Store, ServiceError> {
    let store = self.services.stores.update(id, payload).await?;
    self.written(&STORES, &store);
    Ok(store)
  }

  pub async fn delete_store(&self, id: u64) -> Result<(), ServiceError> {
    self.services.stores.delete(id).await?;
    self.deleted(&STORES, id);
    Ok(())
  }

  pub async fn create_unit(&self, payload: &UnitPayload) -> Result<Unit, ServiceError> {
    let unit = self.services.units.create(payload).await?;
    self.written(&UNITS, &unit);
    Ok(unit)
  }

  pub async fn update_unit(&self, id: u64, payload: &UnitPayload) -> Result<Unit, ServiceError> {
    let unit = self.services.units.update(id, payload).await?;
    self.written(&UNITS, &unit);
    Ok(unit)
  }

  pub async fn delete_unit(&self, id: u64) -> Result<(), ServiceError> {
    self.services.units.delete(id).await?;
    self.deleted(&UNITS, id);
    Ok(())
  }

  pub async fn create_category(&self, payload: &CategoryPayload) -> Result<Category, ServiceError> {
    let category = self.services.categories.create(payload).await?;
    self.written(&CATEGORIES, &category);
    Ok(category)
  }

  pub async fn update_category(&self, id: u64, payload: &CategoryPayload) -> Result<Category, ServiceError> {
    let category = self.services.categories.update(id, payload).await?;
    self.written(&CATEGORIES, &category);
    Ok(category)
  }

  pub async fn delete_category(&self, id: u64) -> Result<(), ServiceError> {
    self.services.categories.delete(id).await?;
    self.deleted(&CATEGORIES, id);
    Ok(())
  }

  /// Stock rows have no detail key of their own; every stock listing goes
  /// stale instead.
  pub async fn save_stock(&self, request: &StockRequest) -> Result<Stock, ServiceError> {
    let stock = self.services.stocks.save(request).await?;
    for listing in STOCK_LISTINGS {
      self.queries.invalidate_resource(listing.name());
    }
    debug!(product_id = stock.product_id, store_id = stock.store_id, "stock saved");
    Ok(stock)
  }

  pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile, ServiceError> {
    let profile = self.services.auth.update_profile(request).await?;
    if let Ok(key) = CacheKey::new(Resource::Profile.name(), &()) {
      self.queries.set_data(&key, profile.clone());
    }
    Ok(profile)
  }

  // ==========================================================================
  // Helpers
  // ==========================================================================

  fn paged<T, P, F, Fut>(&self, resource: Resource, params: P, fetcher: F) -> Result<PagedQuery<T, P>, QueryError>
  where
    T: Send + Sync + 'static,
    P: Serialize + Clone + PartialEq + Send + Sync + 'static,
    F: Fn(P, PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, ServiceError>> + Send + 'static,
  {
    PagedQuery::subscribe(
      self.queries.clone(),
      resource.name(),
      fetcher,
      params,
      self.page_size,
      true,
    )
  }

  fn keyed<T, K, F, Fut>(&self, resource: Resource, params: &K, fetcher: F) -> Result<Query<T>, QueryError>
  where
    T: Send + Sync + 'static,
    K: Serialize + ?Sized,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    let key = CacheKey::new(resource.name(), params)?;
    let mut query = Query::new(self.queries.clone(), key, fetcher);
    query.fetch();
    Ok(query)
  }

  fn detail<T, F, Fut>(&self, resource: Resource, id: Option<u64>, fetcher: F) -> Result<Query<T>, QueryError>
  where
    T: Send + Sync + 'static,
    F: Fn(u64) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
  {
    let key = CacheKey::new(resource.name(), &id)?;
    let mut query = Query::new(self.queries.clone(), key, move || fetcher(id.unwrap_or_default()))
      .with_enabled(id.is_some());
    query.fetch();
    Ok(query)
  }

  fn receipts<K: ReceiptKind>(
    &self,
    service: &ReceiptService<K>,
    resource: Resource,
    params: ReceiptSearch,
  ) -> Result<PagedQuery<K::Receipt, ReceiptSearch>, QueryError> {
    let service = service.clone();
    self.paged(resource, params, move |params, page| {
      let service = service.clone();
      async move { service.search(&params, page).await }
    })
  }

  fn receipt_list<K: ReceiptKind>(
    &self,
    service: &ReceiptService<K>,
    resource: Resource,
    params: ReceiptSearch,
  ) -> Result<Query<Vec<K::Receipt>>, QueryError> {
    let service = service.clone();
    let key_params = params.clone();
    self.keyed(resource, &key_params, move || {
      let service = service.clone();
      let params = params.clone();
      async move { service.list(&params).await }
    })
  }

  fn receipt<K: ReceiptKind>(
    &self,
    service: &ReceiptService<K>,
    resource: Resource,
    id: Option<u64>,
  ) -> Result<Query<K::Receipt>, QueryError> {
    let service = service.clone();
    self.detail(resource, id, move |id| {
      let service = service.clone();
      async move { service.get(id).await }
    })
  }

  fn written<T>(&self, family: &Family, entity: &T)
  where
    T: Identified + Clone + Send + Sync + 'static,
  {
    for listing in family.listings {
      self.queries.invalidate_resource(listing.name());
    }
    if let Ok(key) = CacheKey::new(family.detail.name(), &entity.id()) {
      debug!(resource = %family.detail, id = entity.id(), "detail updated from mutation");
      self.queries.set_data(&key, entity.clone());
    }
  }

  fn deleted(&self, family: &Family, id: u64) {
    for listing in family.listings {
      self.queries.invalidate_resource(listing.name());
    }
    if let Ok(key) = CacheKey::new(family.detail.name(), &id) {
      self.queries.remove(&key);
    }
  }
}

impl std::fmt::Debug for Backoffice {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Backoffice")
      .field("api", &self.api)
      .field("queries", &self.queries)
      .field("page_size", &self.page_size)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backoffice::types::ReceiptStatus;
  use crate::config::ApiConfig;
  use crate::session::MemoryTokenStore;
  use serde_json::json;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn backoffice(server: &MockServer, tokens: Arc<dyn TokenStore>) -> Backoffice {
    let api = ApiClient::new(&ApiConfig::with_url(server.uri()), tokens).unwrap();
    let queries = QueryClient::new(policy_table(&Default::default()));
    Backoffice::from_parts(api, queries, 10)
  }

  fn receipt(id: u64, status: &str) -> serde_json::Value {
    json!({"id": id, "code": format!("PN{:04}", id), "status": status, "importsDate": "2025-02-01"})
  }

  async fn mount_import_search(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
      .and(path("/api/imports/search"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {"content": [receipt(1, "PENDING")], "totalElements": 1, "totalPages": 1},
      })))
      .expect(expected)
      .mount(server)
      .await;
  }

  #[tokio::test]
  async fn test_identical_hooks_share_one_call() {
    let server = MockServer::start().await;
    mount_import_search(&server, 1).await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let mut first = backoffice.imports(ReceiptSearch::default()).unwrap();
    let mut second = backoffice.imports(ReceiptSearch::default()).unwrap();
    first.settled().await;
    second.settled().await;

    assert_eq!(first.view().total_items, 1);
    assert_eq!(second.view().data()[0].code, "PN0001");
  }

  #[tokio::test]
  async fn test_action_refreshes_detail_and_stales_search() {
    let server = MockServer::start().await;
    mount_import_search(&server, 1).await;
    Mock::given(method("POST"))
      .and(path("/api/imports/1/approve"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": receipt(1, "APPROVED")})))
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let mut search = backoffice.imports(ReceiptSearch::default()).unwrap();
    search.settled().await;
    assert!(!search.view().is_fetching);

    let approved = backoffice.import_action(1, ReceiptAction::Approve).await.unwrap();
    assert_eq!(approved.status, ReceiptStatus::Approved);

    let detail = CacheKey::new(Resource::ImportDetail.name(), &1u64).unwrap();
    let snapshot = backoffice.queries().snapshot::<ImportReceipt>(&detail);
    assert_eq!(snapshot.data.as_ref().unwrap().status, ReceiptStatus::Approved);
    assert!(snapshot.is_fresh());

    let page = backoffice.queries().snapshot::<Page<ImportReceipt>>(search.key());
    assert!(page.is_stale);
    assert!(page.data.is_some());
  }

  #[tokio::test]
  async fn test_detail_hook_reads_mutated_entity_without_call() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/api/products/5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {"id": 5, "code": "SP005", "name": "Bánh quy", "unitPrice": 15000, "status": "ACTIVE"},
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/products/5"))
      .respond_with(ResponseTemplate::new(500))
      .expect(0)
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    backoffice
      .update_product(5, &ProductPayload::default())
      .await
      .unwrap();

    let query = backoffice.product(Some(5)).unwrap();
    let view = query.view();
    assert!(!view.is_fetching);
    assert_eq!(view.data.unwrap().name, "Bánh quy");
  }

  #[tokio::test]
  async fn test_delete_removes_detail() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/customers/3"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let key = CacheKey::new(Resource::CustomerDetail.name(), &3u64).unwrap();
    backoffice.queries().set_data(&key, 3u64);
    backoffice.delete_customer(3).await.unwrap();
    assert!(!backoffice.queries().contains(&key));
  }

  #[tokio::test]
  async fn test_missing_id_disables_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let query = backoffice.inventory_check(None).unwrap();
    let view = query.view();
    assert!(!view.is_fetching);
    assert!(view.data.is_none());
    assert!(!view.is_error);
  }

  #[tokio::test]
  async fn test_login_stores_token_and_logout_clears_everything() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {"token": "h.eyJzdWIiOiJhZG1pbiJ9.s", "username": "admin", "roles": ["ADMIN"]},
      })))
      .mount(&server)
      .await;

    let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let backoffice = backoffice(&server, Arc::clone(&tokens));
    backoffice.login("admin", "secret").await.unwrap();
    assert!(backoffice.is_logged_in());
    assert_eq!(backoffice.session().unwrap().username, "admin");

    let key = CacheKey::new(Resource::Profile.name(), &()).unwrap();
    backoffice.queries().set_data(&key, 1u8);
    backoffice.logout().unwrap();
    assert!(!tokens.is_logged_in());
    assert!(backoffice.session().is_none());
    assert!(backoffice.queries().is_empty());
  }

  #[tokio::test]
  async fn test_supplier_list_is_keyed_by_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/suppliers"))
      .and(query_param("type", "NCC"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": [{"id": 4, "name": "NCC Minh An", "type": "NCC"}],
      })))
      .expect(1)
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let mut query = backoffice.supplier_list(Some("NCC")).unwrap();
    query.settled().await;
    assert_eq!(query.view().data.unwrap()[0].id, 4);

    let key = CacheKey::new(Resource::SuppliersList.name(), &Some("NCC")).unwrap();
    assert!(backoffice.queries().contains(&key));
  }

  #[tokio::test]
  async fn test_store_list_hook_reads_stores() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/stores"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": [{"id": 1, "code": "KHO01", "name": "Kho Hà Nội"}],
      })))
      .expect(1)
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let mut first = backoffice.store_list().unwrap();
    first.settled().await;
    let second = backoffice.store_list().unwrap();
    let view = second.view();
    assert!(!view.is_fetching);
    assert_eq!(view.data.unwrap()[0].name, "Kho Hà Nội");
  }

  #[tokio::test]
  async fn test_all_stocks_merges_pages_under_one_key() {
    let server = MockServer::start().await;
    let pages = [
      (0, json!([{"productId": 1, "storeId": 1, "quantity": 5}])),
      (1, json!([{"productId": 2, "storeId": 1, "quantity": 8}])),
    ];
    for (page, rows) in pages {
      Mock::given(method("GET"))
        .and(path("/api/stocks/paged"))
        .and(query_param("page", page.to_string()))
        .and(query_param("size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
          "success": true,
          "data": {"content": rows, "totalElements": 2, "totalPages": 2, "number": page, "size": 100},
        })))
        .expect(1)
        .mount(&server)
        .await;
    }

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let mut query = backoffice.all_stocks().unwrap();
    query.settled().await;
    assert_eq!(query.view().data.unwrap().len(), 2);

    let key = CacheKey::new(Resource::StocksAll.name(), &()).unwrap();
    let snapshot = backoffice.queries().snapshot::<Vec<Stock>>(&key);
    assert_eq!(snapshot.data.unwrap()[1].product_id, 2);
    assert_eq!(backoffice.queries().len(), 1);
  }

  #[tokio::test]
  async fn test_save_stock_stales_stock_listings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/stocks"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {"productId": 1, "storeId": 1, "quantity": 20},
      })))
      .mount(&server)
      .await;

    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    let all = CacheKey::new(Resource::StocksAll.name(), &()).unwrap();
    let stores = CacheKey::new(Resource::StoresList.name(), &()).unwrap();
    backoffice.queries().set_data(&all, Vec::<Stock>::new());
    backoffice.queries().set_data(&stores, Vec::<Store>::new());

    let request = StockRequest {
      product_id: 1,
      store_id: 1,
      quantity: Some(20.0),
      ..Default::default()
    };
    assert_eq!(backoffice.save_stock(&request).await.unwrap().quantity, 20.0);
    assert!(backoffice.queries().snapshot::<Vec<Stock>>(&all).is_stale);
    assert!(!backoffice.queries().snapshot::<Vec<Store>>(&stores).is_stale);
  }

  #[tokio::test]
  async fn test_policies_follow_resource_table() {
    let server = MockServer::start().await;
    let backoffice = backoffice(&server, Arc::new(MemoryTokenStore::new()));
    assert_eq!(
      backoffice.queries().policy("products.list"),
      Resource::ProductsList.policy()
    );
  }
}
