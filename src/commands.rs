/// Listable resources and name resolution for the command line

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Products,
  Suppliers,
  Customers,
  Imports,
  Exports,
  InventoryChecks,
  Stores,
  Units,
  Categories,
  Stocks,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub kind: ResourceKind,
}

/// All listable resources
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "prod", "product"],
    description: "Product catalogue",
    kind: ResourceKind::Products,
  },
  Command {
    name: "suppliers",
    aliases: &["s", "sup", "supplier", "ncc"],
    description: "Suppliers, warehouses and sales staff",
    kind: ResourceKind::Suppliers,
  },
  Command {
    name: "customers",
    aliases: &["c", "cust", "customer"],
    description: "Customers",
    kind: ResourceKind::Customers,
  },
  Command {
    name: "imports",
    aliases: &["i", "imp", "import"],
    description: "Import receipts",
    kind: ResourceKind::Imports,
  },
  Command {
    name: "exports",
    aliases: &["e", "exp", "export"],
    description: "Export receipts",
    kind: ResourceKind::Exports,
  },
  Command {
    name: "inventory-checks",
    aliases: &["checks", "check", "ic", "stocktake"],
    description: "Inventory checks",
    kind: ResourceKind::InventoryChecks,
  },
  Command {
    name: "stores",
    aliases: &["st", "store", "kho"],
    description: "Stores and warehouses",
    kind: ResourceKind::Stores,
  },
  Command {
    name: "units",
    aliases: &["u", "unit"],
    description: "Units of measure",
    kind: ResourceKind::Units,
  },
  Command {
    name: "categories",
    aliases: &["cat", "category"],
    description: "Product categories",
    kind: ResourceKind::Categories,
  },
  Command {
    name: "stocks",
    aliases: &["stock"],
    description: "Stock per product and store",
    kind: ResourceKind::Stocks,
  },
];

/// Get ranked suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve input to one resource. With several candidates, only an exact
/// name or alias wins.
pub fn resolve(input: &str) -> Result<&'static Command, String> {
  let input_lower = input.trim().to_lowercase();
  let suggestions = get_suggestions(&input_lower);
  match suggestions.as_slice() {
    [] => Err(format!(
      "unknown resource '{}', expected one of: {}",
      input,
      COMMANDS.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    )),
    [only] => Ok(only),
    [first, ..] if first.name == input_lower || first.aliases.contains(&input_lower.as_str()) => Ok(first),
    many => Err(format!(
      "ambiguous resource '{}': {}",
      input,
      many.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("imports");
    assert_eq!(suggestions[0].kind, ResourceKind::Imports);
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(resolve("imp").unwrap().kind, ResourceKind::Imports);
    assert_eq!(resolve("EXP").unwrap().kind, ResourceKind::Exports);
    assert_eq!(resolve("checks").unwrap().kind, ResourceKind::InventoryChecks);
    assert_eq!(resolve("prod").unwrap().kind, ResourceKind::Products);
    assert_eq!(resolve("kho").unwrap().kind, ResourceKind::Stores);
    assert_eq!(resolve("cat").unwrap().kind, ResourceKind::Categories);
  }

  #[test]
  fn test_exact_alias_beats_longer_alias() {
    // "stock" is also a prefix of the "stocktake" alias
    assert_eq!(resolve("stock").unwrap().kind, ResourceKind::Stocks);
    assert!(resolve("sto").unwrap_err().contains("ambiguous"));
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve("cus").unwrap().kind, ResourceKind::Customers);
    assert_eq!(resolve("inv").unwrap().kind, ResourceKind::InventoryChecks);
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("take");
    assert_eq!(suggestions[0].kind, ResourceKind::InventoryChecks);
  }

  #[test]
  fn test_ambiguous_and_unknown() {
    // "port" is contained in both imports and exports
    assert!(resolve("port").unwrap_err().contains("ambiguous"));
    assert!(resolve("orders").unwrap_err().contains("unknown"));
  }
}
