//! Search parameters of the paged listings.
//!
//! Unset fields are left out of both the wire query and the cache key, so
//! `ReceiptSearch::default()` and a search with every filter cleared share
//! one cache entry.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::types::{InventoryCheckStatus, ReceiptStatus};

/// Blank filter input means "no filter".
fn non_blank(value: impl Into<String>) -> Option<String> {
  let value = value.into();
  let trimmed = value.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
  #[default]
  Date,
  Value,
}

impl FromStr for SortField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "date" => Ok(Self::Date),
      "value" => Ok(Self::Value),
      other => Err(format!("unknown sort field: {} (expected date or value)", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
  Asc,
  #[default]
  Desc,
}

impl FromStr for SortDir {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      other => Err(format!("unknown sort direction: {} (expected asc or desc)", other)),
    }
  }
}

impl fmt::Display for SortDir {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Asc => f.write_str("asc"),
      Self::Desc => f.write_str("desc"),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub from_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub to_date: Option<NaiveDate>,
}

impl ProductSearch {
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = non_blank(code);
    self
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = non_blank(name);
    self
  }

  pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
    self.from_date = from;
    self.to_date = to;
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupplierSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// NCC, INTERNAL or STAFF
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  /// `field,dir` as the backend expects, e.g. `name,asc`
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort: Option<String>,
}

impl SupplierSearch {
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = non_blank(code);
    self
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = non_blank(name);
    self
  }

  pub fn kind(mut self, kind: impl Into<String>) -> Self {
    self.kind = non_blank(kind).map(|k| k.to_uppercase());
    self
  }

  pub fn phone(mut self, phone: impl Into<String>) -> Self {
    self.phone = non_blank(phone);
    self
  }

  pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
    self.sort = non_blank(field).map(|field| format!("{},{}", field, dir));
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort: Option<String>,
}

impl CustomerSearch {
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = non_blank(code);
    self
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = non_blank(name);
    self
  }

  pub fn phone(mut self, phone: impl Into<String>) -> Self {
    self.phone = non_blank(phone);
    self
  }

  pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
    self.sort = non_blank(field).map(|field| format!("{},{}", field, dir));
    self
  }
}

/// Filters of the store search. Categories search on the same fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort: Option<String>,
}

impl StoreSearch {
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = non_blank(code);
    self
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = non_blank(name);
    self
  }

  pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
    self.sort = non_blank(field).map(|field| format!("{},{}", field, dir));
    self
  }
}

pub type CategorySearch = StoreSearch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort: Option<String>,
}

impl UnitSearch {
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = non_blank(name);
    self
  }

  pub fn sort(mut self, field: &str, dir: SortDir) -> Self {
    self.sort = non_blank(field).map(|field| format!("{},{}", field, dir));
    self
  }
}

/// Filters of the import and export receipt searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSearch {
  /// `None` lists every status
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ReceiptStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub from: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub to: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort_field: Option<SortField>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sort_dir: Option<SortDir>,
}

impl ReceiptSearch {
  pub fn status(mut self, status: Option<ReceiptStatus>) -> Self {
    self.status = status;
    self
  }

  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = non_blank(code);
    self
  }

  pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
    self.from = from;
    self.to = to;
    self
  }

  pub fn sort(mut self, field: SortField, dir: SortDir) -> Self {
    self.sort_field = Some(field);
    self.sort_dir = Some(dir);
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCheckSearch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<InventoryCheckStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub check_code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub from_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub to_date: Option<NaiveDate>,
}

impl InventoryCheckSearch {
  pub fn status(mut self, status: Option<InventoryCheckStatus>) -> Self {
    self.status = status;
    self
  }

  pub fn check_code(mut self, code: impl Into<String>) -> Self {
    self.check_code = non_blank(code);
    self
  }

  pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
    self.from_date = from;
    self.to_date = to;
    self
  }
}
