//! Domain types exchanged with the backoffice API.
//!
//! Read types tolerate missing optional fields; request types skip unset
//! fields when serialized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entities addressable by a numeric id.
pub trait Identified {
  fn id(&self) -> u64;
}

macro_rules! identified {
  ($($ty:ty),* $(,)?) => {
    $(impl Identified for $ty {
      fn id(&self) -> u64 {
        self.id
      }
    })*
  };
}

identified!(
  Product,
  Supplier,
  Customer,
  ImportReceipt,
  ExportReceipt,
  InventoryCheck,
  UserProfile,
  Store,
  Unit,
  Category
);

// ============================================================================
// Catalogue
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: u64,
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub name: String,
  pub short_description: Option<String>,
  pub image: Option<String>,
  #[serde(default)]
  pub unit_price: f64,
  pub category_name: Option<String>,
  #[serde(default)]
  pub status: String,
  pub category_id: Option<u64>,
  /// Primary supplier, kept for older backends
  pub supplier_id: Option<u64>,
  pub supplier_ids: Option<Vec<u64>>,
  pub unit_id: Option<u64>,
  pub unit_name: Option<String>,
  pub quantity: Option<f64>,
  pub stock_quantity: Option<f64>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
  pub code: String,
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub short_description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  pub unit_price: f64,
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub supplier_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub supplier_ids: Option<Vec<u64>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stock_quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
  pub id: u64,
  pub code: Option<String>,
  #[serde(default)]
  pub name: String,
  /// NCC (supplier), INTERNAL (warehouse/branch) or STAFF (sales staff)
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub phone: Option<String>,
  pub address: Option<String>,
  pub email: Option<String>,
  pub description: Option<String>,
  pub image: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPayload {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub name: String,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
}

/// Supplier as offered when picking the counterpart of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSupplier {
  pub id: u64,
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id: u64,
  pub code: Option<String>,
  pub name: Option<String>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub full_name: Option<String>,
  pub address: Option<String>,
  pub country: Option<String>,
  pub status: Option<String>,
  pub description: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

impl Customer {
  /// Best available name for listings.
  pub fn display_name(&self) -> &str {
    self
      .name
      .as_deref()
      .or(self.full_name.as_deref())
      .or(self.username.as_deref())
      .unwrap_or("")
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub username: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  pub id: u64,
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub name: String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
  pub code: String,
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Unit of measure a product is counted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
  pub id: u64,
  #[serde(default)]
  pub name: String,
  pub description: Option<String>,
  pub active: Option<bool>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPayload {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub active: Option<bool>,
}

// ============================================================================
// Stores and stock
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
  pub id: u64,
  pub code: Option<String>,
  #[serde(default)]
  pub name: String,
  pub phone: Option<String>,
  pub address: Option<String>,
  pub description: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePayload {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Quantity of one product held in one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
  pub product_id: u64,
  pub store_id: u64,
  pub store_name: Option<String>,
  pub store_code: Option<String>,
  #[serde(default)]
  pub quantity: f64,
  pub min_stock: Option<f64>,
  pub max_stock: Option<f64>,
}

/// Creates the stock row of a product in a store, or updates it if one exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
  pub product_id: u64,
  pub store_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub min_stock: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_stock: Option<f64>,
}

// ============================================================================
// Receipts (imports and exports share one status set)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
  Pending,
  Imported,
  Exported,
  Cancelled,
  Approved,
  Rejected,
  Returned,
  /// Status names added by newer backends
  #[serde(other)]
  Unknown,
}

impl ReceiptStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Imported => "IMPORTED",
      Self::Exported => "EXPORTED",
      Self::Cancelled => "CANCELLED",
      Self::Approved => "APPROVED",
      Self::Rejected => "REJECTED",
      Self::Returned => "RETURNED",
      Self::Unknown => "UNKNOWN",
    }
  }
}

impl fmt::Display for ReceiptStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReceiptStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "PENDING" => Ok(Self::Pending),
      "IMPORTED" => Ok(Self::Imported),
      "EXPORTED" => Ok(Self::Exported),
      "CANCELLED" => Ok(Self::Cancelled),
      "APPROVED" => Ok(Self::Approved),
      "REJECTED" => Ok(Self::Rejected),
      "RETURNED" => Ok(Self::Returned),
      other => Err(format!("unknown receipt status: {}", other)),
    }
  }
}

/// One product line of an import or export receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
  pub id: Option<u64>,
  pub product_id: u64,
  pub product_code: Option<String>,
  pub product_name: Option<String>,
  pub unit_name: Option<String>,
  pub store_id: Option<u64>,
  pub store_name: Option<String>,
  pub store_code: Option<String>,
  /// Import lot an export line draws from
  pub import_details_id: Option<u64>,
  #[serde(default)]
  pub quantity: f64,
  #[serde(default)]
  pub unit_price: f64,
  pub discount_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReceipt {
  pub id: u64,
  #[serde(default)]
  pub code: String,
  pub store_id: Option<u64>,
  pub store_name: Option<String>,
  pub store_code: Option<String>,
  pub supplier_id: Option<u64>,
  pub supplier_name: Option<String>,
  pub supplier_code: Option<String>,
  pub supplier_phone: Option<String>,
  pub supplier_address: Option<String>,
  pub status: ReceiptStatus,
  #[serde(default)]
  pub imports_date: String,
  pub note: Option<String>,
  pub description: Option<String>,
  #[serde(default)]
  pub total_value: f64,
  #[serde(default)]
  pub attachment_images: Vec<String>,
  #[serde(default)]
  pub items: Vec<ReceiptLine>,
  pub created_by: Option<String>,
  pub created_by_name: Option<String>,
  pub created_at: Option<String>,
  pub approved_by: Option<String>,
  pub approved_by_name: Option<String>,
  pub approved_at: Option<String>,
  pub rejected_by: Option<String>,
  pub rejected_by_name: Option<String>,
  pub rejected_at: Option<String>,
  pub imported_by: Option<String>,
  pub imported_by_name: Option<String>,
  pub imported_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
  pub id: u64,
  #[serde(default)]
  pub code: String,
  pub store_id: Option<u64>,
  pub supplier_id: Option<u64>,
  pub supplier_name: Option<String>,
  pub customer_id: Option<u64>,
  pub customer_name: Option<String>,
  pub customer_phone: Option<String>,
  pub customer_address: Option<String>,
  pub status: ReceiptStatus,
  #[serde(default)]
  pub exports_date: String,
  pub note: Option<String>,
  pub description: Option<String>,
  #[serde(default)]
  pub total_value: f64,
  #[serde(default)]
  pub attachment_images: Vec<String>,
  #[serde(default)]
  pub items: Vec<ReceiptLine>,
  pub created_by: Option<String>,
  pub created_by_name: Option<String>,
  pub created_at: Option<String>,
  pub approved_by: Option<String>,
  pub approved_by_name: Option<String>,
  pub approved_at: Option<String>,
  pub rejected_by: Option<String>,
  pub rejected_by_name: Option<String>,
  pub rejected_at: Option<String>,
  pub exported_by: Option<String>,
  pub exported_by_name: Option<String>,
  pub exported_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLineRequest {
  pub product_id: u64,
  /// Falls back to the receipt's store when unset
  #[serde(skip_serializing_if = "Option::is_none")]
  pub store_id: Option<u64>,
  pub quantity: f64,
  pub unit_price: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount_percent: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub import_details_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub store_id: u64,
  pub supplier_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub attachment_images: Vec<String>,
  pub items: Vec<ReceiptLineRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  pub store_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<u64>,
  pub customer_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub attachment_images: Vec<String>,
  pub items: Vec<ReceiptLineRequest>,
}

// ============================================================================
// Inventory checks
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryCheckStatus {
  Pending,
  Approved,
  Rejected,
  #[serde(other)]
  Unknown,
}

impl InventoryCheckStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "PENDING",
      Self::Approved => "APPROVED",
      Self::Rejected => "REJECTED",
      Self::Unknown => "UNKNOWN",
    }
  }
}

impl fmt::Display for InventoryCheckStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for InventoryCheckStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_uppercase().as_str() {
      "PENDING" => Ok(Self::Pending),
      "APPROVED" => Ok(Self::Approved),
      "REJECTED" => Ok(Self::Rejected),
      other => Err(format!("unknown inventory check status: {}", other)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckLine {
  pub id: Option<u64>,
  pub product_id: u64,
  pub product_code: Option<String>,
  pub product_name: Option<String>,
  pub unit_name: Option<String>,
  #[serde(default)]
  pub system_quantity: f64,
  #[serde(default)]
  pub actual_quantity: f64,
  #[serde(default)]
  pub difference_quantity: f64,
  #[serde(default)]
  pub unit_price: f64,
  #[serde(default)]
  pub total_value: f64,
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheck {
  pub id: u64,
  #[serde(default)]
  pub check_code: String,
  pub store_id: Option<u64>,
  pub store_name: Option<String>,
  pub store_code: Option<String>,
  pub description: Option<String>,
  pub status: InventoryCheckStatus,
  #[serde(default)]
  pub check_date: String,
  pub note: Option<String>,
  #[serde(default)]
  pub total_difference_value: f64,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
  #[serde(default)]
  pub items: Vec<InventoryCheckLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckLineRequest {
  pub product_id: u64,
  pub system_quantity: f64,
  pub actual_quantity: f64,
  pub unit_price: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub check_code: Option<String>,
  pub store_id: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub check_date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  pub items: Vec<InventoryCheckLineRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectRequest {
  pub reason: String,
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

/// `data` of the login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
  pub token: String,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: u64,
  #[serde(default)]
  pub username: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub full_name: Option<String>,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub avatar: Option<String>,
  pub address: Option<String>,
  pub province: Option<String>,
  pub district: Option<String>,
  pub ward: Option<String>,
  pub country: Option<String>,
  pub active: Option<bool>,
  #[serde(default)]
  pub roles: Vec<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub province: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub district: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ward: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
}
