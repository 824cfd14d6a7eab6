//! Cache resources of the backoffice and their freshness policies.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::cache::{Policy, PolicyTable};
use crate::config::PolicyOverride;

const fn secs(n: u64) -> Duration {
  Duration::from_secs(n)
}

/// One cached resource. The name is the first component of every cache
/// key under it and the key of its `cache:` override in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
  ProductsSearch,
  ProductsList,
  ProductDetail,
  SuppliersSearch,
  SuppliersList,
  SupplierDetail,
  ExportSuppliers,
  CustomersSearch,
  CustomersList,
  CustomerDetail,
  ImportsSearch,
  ImportsList,
  ImportDetail,
  ExportsSearch,
  ExportsList,
  ExportDetail,
  InventoryChecksSearch,
  InventoryChecksList,
  InventoryCheckDetail,
  StoresSearch,
  StoresList,
  StoreDetail,
  UnitsSearch,
  UnitsList,
  UnitDetail,
  CategoriesSearch,
  CategoriesList,
  CategoryDetail,
  StocksAll,
  StocksByProduct,
  StocksByStore,
  Profile,
}

impl Resource {
  pub const ALL: [Resource; 32] = [
    Self::ProductsSearch,
    Self::ProductsList,
    Self::ProductDetail,
    Self::SuppliersSearch,
    Self::SuppliersList,
    Self::SupplierDetail,
    Self::ExportSuppliers,
    Self::CustomersSearch,
    Self::CustomersList,
    Self::CustomerDetail,
    Self::ImportsSearch,
    Self::ImportsList,
    Self::ImportDetail,
    Self::ExportsSearch,
    Self::ExportsList,
    Self::ExportDetail,
    Self::InventoryChecksSearch,
    Self::InventoryChecksList,
    Self::InventoryCheckDetail,
    Self::StoresSearch,
    Self::StoresList,
    Self::StoreDetail,
    Self::UnitsSearch,
    Self::UnitsList,
    Self::UnitDetail,
    Self::CategoriesSearch,
    Self::CategoriesList,
    Self::CategoryDetail,
    Self::StocksAll,
    Self::StocksByProduct,
    Self::StocksByStore,
    Self::Profile,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Self::ProductsSearch => "products.search",
      Self::ProductsList => "products.list",
      Self::ProductDetail => "products.detail",
      Self::SuppliersSearch => "suppliers.search",
      Self::SuppliersList => "suppliers.list",
      Self::SupplierDetail => "suppliers.detail",
      Self::ExportSuppliers => "suppliers.export",
      Self::CustomersSearch => "customers.search",
      Self::CustomersList => "customers.list",
      Self::CustomerDetail => "customers.detail",
      Self::ImportsSearch => "imports.search",
      Self::ImportsList => "imports.list",
      Self::ImportDetail => "imports.detail",
      Self::ExportsSearch => "exports.search",
      Self::ExportsList => "exports.list",
      Self::ExportDetail => "exports.detail",
      Self::InventoryChecksSearch => "inventory_checks.search",
      Self::InventoryChecksList => "inventory_checks.list",
      Self::InventoryCheckDetail => "inventory_checks.detail",
      Self::StoresSearch => "stores.search",
      Self::StoresList => "stores.list",
      Self::StoreDetail => "stores.detail",
      Self::UnitsSearch => "units.search",
      Self::UnitsList => "units.list",
      Self::UnitDetail => "units.detail",
      Self::CategoriesSearch => "categories.search",
      Self::CategoriesList => "categories.list",
      Self::CategoryDetail => "categories.detail",
      Self::StocksAll => "stocks.all",
      Self::StocksByProduct => "stocks.product",
      Self::StocksByStore => "stocks.store",
      Self::Profile => "profile",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|r| r.name() == name)
  }

  /// Built-in policy, before config overrides.
  ///
  /// Unpaged catalogue lists feed pickers and keep the longest window, as
  /// does the merged stock listing. Catalogue details are refetched after
  /// 30 seconds. Per-product and per-store stock moves with receipts.
  pub fn policy(&self) -> Policy {
    match self {
      Self::ProductsSearch
      | Self::SuppliersSearch
      | Self::CustomersSearch
      | Self::StoresSearch
      | Self::UnitsSearch
      | Self::CategoriesSearch => Policy::new(secs(60), secs(5 * 60), 1),
      Self::ProductsList
      | Self::SuppliersList
      | Self::CustomersList
      | Self::ExportSuppliers
      | Self::StoresList
      | Self::UnitsList
      | Self::CategoriesList
      | Self::StocksAll => Policy::new(secs(5 * 60), secs(10 * 60), 2),
      Self::ImportsSearch
      | Self::ImportsList
      | Self::ExportsSearch
      | Self::ExportsList
      | Self::InventoryChecksSearch
      | Self::InventoryChecksList
      | Self::ImportDetail
      | Self::ExportDetail
      | Self::InventoryCheckDetail
      | Self::StocksByProduct
      | Self::StocksByStore => Policy::new(secs(2 * 60), secs(5 * 60), 2),
      Self::ProductDetail
      | Self::SupplierDetail
      | Self::CustomerDetail
      | Self::StoreDetail
      | Self::UnitDetail
      | Self::CategoryDetail => Policy::new(secs(30), secs(5 * 60), 2),
      Self::Profile => Policy::new(secs(5 * 60), secs(10 * 60), 1),
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      Self::ProductsSearch => "Paged product search",
      Self::ProductsList => "All products",
      Self::ProductDetail => "One product",
      Self::SuppliersSearch => "Paged supplier search",
      Self::SuppliersList => "Suppliers by type",
      Self::SupplierDetail => "One supplier",
      Self::ExportSuppliers => "Export counterparts",
      Self::CustomersSearch => "Paged customer search",
      Self::CustomersList => "All customers",
      Self::CustomerDetail => "One customer",
      Self::ImportsSearch => "Paged import receipts",
      Self::ImportsList => "Import receipts",
      Self::ImportDetail => "One import receipt",
      Self::ExportsSearch => "Paged export receipts",
      Self::ExportsList => "Export receipts",
      Self::ExportDetail => "One export receipt",
      Self::InventoryChecksSearch => "Paged inventory checks",
      Self::InventoryChecksList => "Inventory checks",
      Self::InventoryCheckDetail => "One inventory check",
      Self::StoresSearch => "Paged store search",
      Self::StoresList => "All stores",
      Self::StoreDetail => "One store",
      Self::UnitsSearch => "Paged unit search",
      Self::UnitsList => "All units",
      Self::UnitDetail => "One unit",
      Self::CategoriesSearch => "Paged category search",
      Self::CategoriesList => "All categories",
      Self::CategoryDetail => "One category",
      Self::StocksAll => "Stock of every product in every store",
      Self::StocksByProduct => "Stock of one product per store",
      Self::StocksByStore => "Stock held by one store",
      Self::Profile => "Signed-in user's profile",
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Policy table with every resource's built-in policy and the configured
/// overrides applied. Overrides for unknown names are ignored with a warning.
pub fn policy_table(overrides: &BTreeMap<String, PolicyOverride>) -> PolicyTable {
  let mut table = PolicyTable::new(Policy::default());
  for resource in Resource::ALL {
    let policy = match overrides.get(resource.name()) {
      Some(o) => o.apply(resource.policy()),
      None => resource.policy(),
    };
    table.insert(resource.name(), policy);
  }
  for name in overrides.keys() {
    if Resource::from_name(name).is_none() {
      tracing::warn!(resource = %name, "ignoring cache override for unknown resource");
    }
  }
  table
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_names_are_unique() {
    let mut names: Vec<_> = Resource::ALL.iter().map(|r| r.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), Resource::ALL.len());
  }

  #[test]
  fn test_from_name_roundtrips_all() {
    for resource in Resource::ALL {
      assert_eq!(Resource::from_name(resource.name()), Some(resource));
    }
    assert_eq!(Resource::from_name("orders.search"), None);
  }

  #[test]
  fn test_lists_tolerate_more_staleness_than_details() {
    assert!(Resource::ProductsList.policy().stale_time > Resource::ProductDetail.policy().stale_time);
    assert!(Resource::SuppliersList.policy().stale_time > Resource::SupplierDetail.policy().stale_time);
  }

  #[test]
  fn test_store_and_stock_listings_keep_picker_window() {
    for resource in [Resource::StoresList, Resource::StocksAll] {
      let policy = resource.policy();
      assert_eq!(policy.stale_time, Duration::from_secs(300), "{}", resource);
      assert_eq!(policy.gc_time, Duration::from_secs(600), "{}", resource);
      assert_eq!(policy.retry, 2, "{}", resource);
    }
  }

  #[test]
  fn test_staleness_never_exceeds_retention() {
    for resource in Resource::ALL {
      let policy = resource.policy();
      assert!(policy.stale_time <= policy.gc_time, "{}", resource);
    }
  }

  #[test]
  fn test_overrides_apply_per_resource() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
      "imports.search".to_string(),
      PolicyOverride {
        stale_secs: Some(5),
        gc_secs: None,
        retry: Some(0),
      },
    );
    overrides.insert("orders.search".to_string(), PolicyOverride::default());

    let table = policy_table(&overrides);
    let imports = table.get("imports.search");
    assert_eq!(imports.stale_time, Duration::from_secs(5));
    assert_eq!(imports.gc_time, Duration::from_secs(300));
    assert_eq!(imports.retry, 0);
    assert_eq!(table.get("exports.search"), Resource::ExportsSearch.policy());
  }
}
