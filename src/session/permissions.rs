//! Role-based permissions for receipt and inventory-check actions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
  ImportCreate,
  ImportEdit,
  ImportDelete,
  ImportApprove,
  ImportReject,
  ImportCancel,
  ImportView,
  ExportCreate,
  ExportEdit,
  ExportDelete,
  ExportApprove,
  ExportReject,
  ExportCancel,
  ExportView,
  InventoryCheckCreate,
  InventoryCheckEdit,
  InventoryCheckDelete,
  InventoryCheckApprove,
  InventoryCheckConfirm,
  InventoryCheckView,
}

impl Permission {
  pub const ALL: [Permission; 20] = [
    Self::ImportCreate,
    Self::ImportEdit,
    Self::ImportDelete,
    Self::ImportApprove,
    Self::ImportReject,
    Self::ImportCancel,
    Self::ImportView,
    Self::ExportCreate,
    Self::ExportEdit,
    Self::ExportDelete,
    Self::ExportApprove,
    Self::ExportReject,
    Self::ExportCancel,
    Self::ExportView,
    Self::InventoryCheckCreate,
    Self::InventoryCheckEdit,
    Self::InventoryCheckDelete,
    Self::InventoryCheckApprove,
    Self::InventoryCheckConfirm,
    Self::InventoryCheckView,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ImportCreate => "IMPORT_CREATE",
      Self::ImportEdit => "IMPORT_EDIT",
      Self::ImportDelete => "IMPORT_DELETE",
      Self::ImportApprove => "IMPORT_APPROVE",
      Self::ImportReject => "IMPORT_REJECT",
      Self::ImportCancel => "IMPORT_CANCEL",
      Self::ImportView => "IMPORT_VIEW",
      Self::ExportCreate => "EXPORT_CREATE",
      Self::ExportEdit => "EXPORT_EDIT",
      Self::ExportDelete => "EXPORT_DELETE",
      Self::ExportApprove => "EXPORT_APPROVE",
      Self::ExportReject => "EXPORT_REJECT",
      Self::ExportCancel => "EXPORT_CANCEL",
      Self::ExportView => "EXPORT_VIEW",
      Self::InventoryCheckCreate => "INVENTORY_CHECK_CREATE",
      Self::InventoryCheckEdit => "INVENTORY_CHECK_EDIT",
      Self::InventoryCheckDelete => "INVENTORY_CHECK_DELETE",
      Self::InventoryCheckApprove => "INVENTORY_CHECK_APPROVE",
      Self::InventoryCheckConfirm => "INVENTORY_CHECK_CONFIRM",
      Self::InventoryCheckView => "INVENTORY_CHECK_VIEW",
    }
  }
}

impl fmt::Display for Permission {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Permissions granted to an upper-case role name. ADMIN is handled by
/// [`has_permission`] and unknown roles grant nothing.
fn role_permissions(role: &str) -> &'static [Permission] {
  use Permission::*;
  match role {
    "ADMIN" => &Permission::ALL,
    "MANAGER" => &[
      ImportCreate,
      ImportApprove,
      ImportReject,
      ImportView,
      ExportCreate,
      ExportApprove,
      ExportReject,
      ExportView,
      InventoryCheckCreate,
      InventoryCheckApprove,
      InventoryCheckView,
    ],
    "STAFF" => &[
      ImportCreate,
      ImportView,
      ExportCreate,
      ExportView,
      InventoryCheckCreate,
      InventoryCheckView,
    ],
    "USER" => &[ImportView, ExportView, InventoryCheckView],
    _ => &[],
  }
}

/// Whether any of `roles` grants `permission`. Role names are matched
/// case-insensitively.
pub fn has_permission<S: AsRef<str>>(roles: &[S], permission: Permission) -> bool {
  roles.iter().any(|role| {
    let role = role.as_ref().to_uppercase();
    role == "ADMIN" || role_permissions(&role).contains(&permission)
  })
}

/// Whether any of `roles` is one of `allowed`, ignoring case.
pub fn has_role<S: AsRef<str>, A: AsRef<str>>(roles: &[S], allowed: &[A]) -> bool {
  roles.iter().any(|role| {
    allowed
      .iter()
      .any(|candidate| role.as_ref().eq_ignore_ascii_case(candidate.as_ref()))
  })
}
