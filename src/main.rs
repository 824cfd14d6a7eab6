use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use stockroom::backoffice::client::origin_of;
use stockroom::backoffice::params::{
  CategorySearch, CustomerSearch, InventoryCheckSearch, ProductSearch, ReceiptSearch, SortDir, SortField,
  StoreSearch, SupplierSearch, UnitSearch,
};
use stockroom::backoffice::types::{
  Category, Customer, ExportReceipt, ImportReceipt, InventoryCheck, InventoryCheckStatus, Product, ReceiptStatus,
  Stock, Store, Supplier, Unit,
};
use stockroom::backoffice::{ReceiptAction, Resource};
use stockroom::commands::{self, ResourceKind, COMMANDS};
use stockroom::session::{has_permission, Permission, SqliteTokenStore, TokenStore};
use stockroom::{Backoffice, Config, PagedQuery, Query};

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "Inventory back-office client")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockroom/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Base URL of the API gateway (overrides api.url)
  #[arg(long, global = true)]
  api_url: Option<String>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print JSON instead of tables
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Log in and store the token (password from STOCKROOM_PASSWORD or stdin)
  Login {
    #[arg(short, long)]
    username: String,
  },
  /// Forget the stored token
  Logout,
  /// Show the user the stored token belongs to
  Whoami,
  /// List one page of a resource (stocks are listed whole)
  List(ListArgs),
  /// Show one record (for stocks, the id is a product id)
  Show { resource: String, id: u64 },
  /// Run a workflow action on a receipt or inventory check
  Act {
    resource: String,
    id: u64,
    /// approve, confirm, reject or cancel
    action: String,
    /// Reason, required when rejecting an inventory check
    #[arg(long)]
    reason: Option<String>,
  },
  /// List resource names, aliases and cache policies
  Resources,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
  resource: String,

  /// 1-based page number
  #[arg(long, default_value_t = 1)]
  page: u32,

  /// Rows per page (default: page_size from config)
  #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
  size: Option<u32>,

  /// Status filter; ALL or omitted lists every status
  #[arg(long)]
  status: Option<String>,

  #[arg(long)]
  code: Option<String>,

  #[arg(long)]
  name: Option<String>,

  #[arg(long)]
  phone: Option<String>,

  /// Supplier type (NCC, INTERNAL, STAFF)
  #[arg(long = "type")]
  kind: Option<String>,

  /// From date (YYYY-MM-DD)
  #[arg(long)]
  from: Option<NaiveDate>,

  /// To date (YYYY-MM-DD)
  #[arg(long)]
  to: Option<NaiveDate>,

  /// Receipt sort field (date, value)
  #[arg(long)]
  sort: Option<SortField>,

  /// Sort direction (asc, desc)
  #[arg(long)]
  dir: Option<SortDir>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = stockroom::logging::init(args.verbose)?;

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(url) = &args.api_url {
    config.api.url = url.clone();
  }
  if let Cmd::List(ListArgs { size: Some(size), .. }) = &args.command {
    config.page_size = *size;
  }

  let tokens: Arc<dyn TokenStore> = Arc::new(SqliteTokenStore::open(&origin_of(&config.api.url))?);
  let backoffice = Backoffice::new(&config, tokens)?;

  match args.command {
    Cmd::Login { username } => login(&backoffice, &username).await,
    Cmd::Logout => {
      backoffice.logout()?;
      println!("Logged out");
      Ok(())
    }
    Cmd::Whoami => whoami(&backoffice, args.json),
    Cmd::List(list_args) => list(&backoffice, list_args, args.json).await,
    Cmd::Show { resource, id } => show(&backoffice, &resource, id, args.json).await,
    Cmd::Act {
      resource,
      id,
      action,
      reason,
    } => act(&backoffice, &resource, id, &action, reason.as_deref()).await,
    Cmd::Resources => {
      print_resources();
      Ok(())
    }
  }
}

async fn login(backoffice: &Backoffice, username: &str) -> Result<()> {
  let password = match Config::get_password() {
    Ok(password) => password,
    Err(_) => prompt_password()?,
  };
  let response = backoffice.login(username, &password).await?;
  println!("Logged in as {} ({})", response.username, response.roles.join(", "));
  Ok(())
}

fn prompt_password() -> Result<String> {
  eprint!("Password: ");
  std::io::stderr().flush()?;
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  if password.is_empty() {
    return Err(eyre!("No password given"));
  }
  Ok(password)
}

fn whoami(backoffice: &Backoffice, as_json: bool) -> Result<()> {
  let Some(user) = backoffice.session() else {
    return Err(eyre!("Not logged in. Run `stockroom login --username <name>`."));
  };
  let permissions: Vec<&str> = Permission::ALL
    .iter()
    .filter(|p| has_permission(&user.roles, **p))
    .map(|p| p.as_str())
    .collect();

  if as_json {
    println!(
      "{}",
      serde_json::to_string_pretty(&json!({"user": user, "permissions": permissions}))?
    );
    return Ok(());
  }

  println!("Username:    {}", user.username);
  println!("Name:        {}", user.full_name);
  println!("Email:       {}", user.email);
  println!("Roles:       {}", user.roles.join(", "));
  if let Some(at) = user.expires_at {
    let note = if user.is_expired(Utc::now()) { " (expired)" } else { "" };
    println!("Expires:     {}{}", at.to_rfc3339(), note);
  }
  println!("Permissions: {}", permissions.join(", "));
  Ok(())
}

async fn list(backoffice: &Backoffice, args: ListArgs, as_json: bool) -> Result<()> {
  let command = commands::resolve(&args.resource).map_err(|e| eyre!(e))?;
  let page = args.page;

  match command.kind {
    ResourceKind::Products => {
      let params = ProductSearch::default()
        .code(args.code.unwrap_or_default())
        .name(args.name.unwrap_or_default())
        .between(args.from, args.to);
      print_page(backoffice.products(params)?, page, as_json).await
    }
    ResourceKind::Suppliers => {
      let mut params = SupplierSearch::default()
        .code(args.code.unwrap_or_default())
        .name(args.name.unwrap_or_default())
        .kind(args.kind.unwrap_or_default())
        .phone(args.phone.unwrap_or_default());
      if let Some(dir) = args.dir {
        params = params.sort("name", dir);
      }
      print_page(backoffice.suppliers(params)?, page, as_json).await
    }
    ResourceKind::Customers => {
      let mut params = CustomerSearch::default()
        .code(args.code.unwrap_or_default())
        .name(args.name.unwrap_or_default())
        .phone(args.phone.unwrap_or_default());
      if let Some(dir) = args.dir {
        params = params.sort("name", dir);
      }
      print_page(backoffice.customers(params)?, page, as_json).await
    }
    ResourceKind::Imports | ResourceKind::Exports => {
      let mut params = ReceiptSearch::default()
        .status(parse_status::<ReceiptStatus>(args.status.as_deref())?)
        .code(args.code.unwrap_or_default())
        .between(args.from, args.to);
      if args.sort.is_some() || args.dir.is_some() {
        params = params.sort(args.sort.unwrap_or_default(), args.dir.unwrap_or_default());
      }
      if command.kind == ResourceKind::Imports {
        print_page(backoffice.imports(params)?, page, as_json).await
      } else {
        print_page(backoffice.exports(params)?, page, as_json).await
      }
    }
    ResourceKind::InventoryChecks => {
      let params = InventoryCheckSearch::default()
        .status(parse_status::<InventoryCheckStatus>(args.status.as_deref())?)
        .check_code(args.code.unwrap_or_default())
        .between(args.from, args.to);
      print_page(backoffice.inventory_checks(params)?, page, as_json).await
    }
    ResourceKind::Stores => {
      let mut params = StoreSearch::default()
        .code(args.code.unwrap_or_default())
        .name(args.name.unwrap_or_default());
      if let Some(dir) = args.dir {
        params = params.sort("name", dir);
      }
      print_page(backoffice.stores(params)?, page, as_json).await
    }
    ResourceKind::Units => {
      let mut params = UnitSearch::default().name(args.name.unwrap_or_default());
      if let Some(dir) = args.dir {
        params = params.sort("name", dir);
      }
      print_page(backoffice.units(params)?, page, as_json).await
    }
    ResourceKind::Categories => {
      let mut params = CategorySearch::default()
        .code(args.code.unwrap_or_default())
        .name(args.name.unwrap_or_default());
      if let Some(dir) = args.dir {
        params = params.sort("name", dir);
      }
      print_page(backoffice.categories(params)?, page, as_json).await
    }
    ResourceKind::Stocks => print_rows(backoffice.all_stocks()?, as_json).await,
  }
}

/// `ALL` and an absent flag both mean no status filter.
fn parse_status<S: std::str::FromStr<Err = String>>(status: Option<&str>) -> Result<Option<S>> {
  match status {
    None => Ok(None),
    Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
    Some(s) => s.parse::<S>().map(Some).map_err(|e: String| eyre!(e)),
  }
}

async fn print_page<T, P>(mut query: PagedQuery<T, P>, page: u32, as_json: bool) -> Result<()>
where
  T: Row + Serialize + Send + Sync + 'static,
  P: Serialize + Clone + PartialEq + Send + Sync + 'static,
{
  query.set_page(page);
  query.settled().await;
  let view = query.view();
  if let Some(err) = view.error {
    return Err(eyre!("{}", err));
  }

  if as_json {
    let out = json!({
      "content": view.data(),
      "totalElements": view.total_items,
      "totalPages": view.total_pages,
      "page": view.current_page,
      "size": view.page_size,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    return Ok(());
  }

  let rows: Vec<Vec<String>> = view.data().iter().map(|row| row.cells()).collect();
  print_table(T::HEADERS, &rows);
  println!(
    "\nShowing {}-{} of {} (page {}/{})",
    view.display_start(),
    view.display_end(),
    view.total_items,
    view.current_page,
    view.total_pages
  );
  Ok(())
}

async fn show(backoffice: &Backoffice, resource: &str, id: u64, as_json: bool) -> Result<()> {
  let command = commands::resolve(resource).map_err(|e| eyre!(e))?;
  match command.kind {
    ResourceKind::Products => print_detail(backoffice.product(Some(id))?, as_json).await,
    ResourceKind::Suppliers => print_detail(backoffice.supplier(Some(id))?, as_json).await,
    ResourceKind::Customers => print_detail(backoffice.customer(Some(id))?, as_json).await,
    ResourceKind::Imports => print_detail(backoffice.import(Some(id))?, as_json).await,
    ResourceKind::Exports => print_detail(backoffice.export(Some(id))?, as_json).await,
    ResourceKind::InventoryChecks => print_detail(backoffice.inventory_check(Some(id))?, as_json).await,
    ResourceKind::Stores => print_detail(backoffice.store(Some(id))?, as_json).await,
    ResourceKind::Units => print_detail(backoffice.unit(Some(id))?, as_json).await,
    ResourceKind::Categories => print_detail(backoffice.category(Some(id))?, as_json).await,
    ResourceKind::Stocks => print_rows(backoffice.product_stocks(Some(id))?, as_json).await,
  }
}

/// Unpaged listing printed whole.
async fn print_rows<T>(mut query: Query<Vec<T>>, as_json: bool) -> Result<()>
where
  T: Row + Serialize + Send + Sync + 'static,
{
  query.settled().await;
  let view = query.view();
  if let Some(err) = view.error {
    return Err(eyre!("{}", err));
  }
  let records = view.data.unwrap_or_default();

  if as_json {
    println!("{}", serde_json::to_string_pretty(records.as_ref())?);
    return Ok(());
  }

  let rows: Vec<Vec<String>> = records.iter().map(|row| row.cells()).collect();
  print_table(T::HEADERS, &rows);
  println!("\n{} rows", rows.len());
  Ok(())
}

async fn print_detail<T>(mut query: Query<T>, as_json: bool) -> Result<()>
where
  T: Row + Serialize + Send + Sync + 'static,
{
  query.settled().await;
  let view = query.view();
  if let Some(err) = view.error {
    return Err(eyre!("{}", err));
  }
  let Some(record) = view.data else {
    return Err(eyre!("Nothing found"));
  };

  if as_json {
    println!("{}", serde_json::to_string_pretty(record.as_ref())?);
    return Ok(());
  }

  let width = T::HEADERS.iter().map(|h| h.len()).max().unwrap_or(0);
  for (header, value) in T::HEADERS.iter().zip(record.cells()) {
    println!("{:width$}  {}", header, value, width = width);
  }
  let (line_headers, lines) = record.lines();
  if !lines.is_empty() {
    println!();
    print_table(line_headers, &lines);
  }
  Ok(())
}

async fn act(backoffice: &Backoffice, resource: &str, id: u64, action: &str, reason: Option<&str>) -> Result<()> {
  let command = commands::resolve(resource).map_err(|e| eyre!(e))?;
  let action = ReceiptAction::ALL
    .into_iter()
    .find(|a| a.as_str().eq_ignore_ascii_case(action))
    .ok_or_else(|| eyre!("Unknown action '{}', expected approve, confirm, reject or cancel", action))?;

  if let Some(user) = backoffice.session() {
    if let Some(permission) = required_permission(command.kind, action) {
      if !has_permission(&user.roles, permission) {
        return Err(eyre!("{} lacks permission {}", user.username, permission));
      }
    }
  }

  let status = match command.kind {
    ResourceKind::Imports => backoffice.import_action(id, action).await?.status.to_string(),
    ResourceKind::Exports => backoffice.export_action(id, action).await?.status.to_string(),
    ResourceKind::InventoryChecks => {
      let check = match action {
        ReceiptAction::Approve => backoffice.approve_inventory_check(id).await?,
        ReceiptAction::Confirm => backoffice.confirm_inventory_check(id).await?,
        ReceiptAction::Reject => {
          let reason = reason.ok_or_else(|| eyre!("--reason is required to reject an inventory check"))?;
          backoffice.reject_inventory_check(id, reason).await?
        }
        ReceiptAction::Cancel => {
          backoffice.delete_inventory_check(id).await?;
          println!("Inventory check {} deleted", id);
          return Ok(());
        }
      };
      check.status.to_string()
    }
    _ => return Err(eyre!("{} have no workflow actions", command.name)),
  };
  println!("{} {}: {}", command.name, id, status);
  Ok(())
}

fn required_permission(kind: ResourceKind, action: ReceiptAction) -> Option<Permission> {
  use Permission::*;
  use ReceiptAction::*;
  match (kind, action) {
    (ResourceKind::Imports, Approve) => Some(ImportApprove),
    (ResourceKind::Imports, Reject) => Some(ImportReject),
    (ResourceKind::Imports, Cancel) => Some(ImportCancel),
    (ResourceKind::Exports, Approve) => Some(ExportApprove),
    (ResourceKind::Exports, Reject) => Some(ExportReject),
    (ResourceKind::Exports, Cancel) => Some(ExportCancel),
    (ResourceKind::InventoryChecks, Approve | Reject) => Some(InventoryCheckApprove),
    (ResourceKind::InventoryChecks, Confirm) => Some(InventoryCheckConfirm),
    (ResourceKind::InventoryChecks, Cancel) => Some(InventoryCheckDelete),
    _ => None,
  }
}

fn print_resources() {
  let rows: Vec<Vec<String>> = COMMANDS
    .iter()
    .map(|c| vec![c.name.to_string(), c.aliases.join(", "), c.description.to_string()])
    .collect();
  print_table(&["RESOURCE", "ALIASES", "DESCRIPTION"], &rows);
  println!();

  let rows: Vec<Vec<String>> = Resource::ALL
    .iter()
    .map(|r| {
      let policy = r.policy();
      vec![
        r.name().to_string(),
        format!("{}s", policy.stale_time.as_secs()),
        format!("{}s", policy.gc_time.as_secs()),
        policy.retry.to_string(),
        r.description().to_string(),
      ]
    })
    .collect();
  print_table(&["CACHE", "STALE", "RETAIN", "RETRY", "DESCRIPTION"], &rows);
}

fn print_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(w) = widths.get_mut(i) {
        *w = (*w).max(cell.chars().count());
      }
    }
  }

  let line = |cells: Vec<&str>| {
    let padded: Vec<String> = cells
      .iter()
      .zip(&widths)
      .map(|(cell, w)| format!("{}{}", cell, " ".repeat(w.saturating_sub(cell.chars().count()))))
      .collect();
    println!("{}", padded.join("  ").trim_end());
  };

  line(headers.iter().map(|h| h.as_ref()).collect());
  for row in rows {
    line(row.iter().map(String::as_str).collect());
  }
  if rows.is_empty() {
    println!("(no records)");
  }
}

/// Tabular rendering of a record.
trait Row {
  const HEADERS: &'static [&'static str];

  fn cells(&self) -> Vec<String>;

  /// Line items shown under a detail view.
  fn lines(&self) -> (&'static [&'static str], Vec<Vec<String>>) {
    (&[], Vec::new())
  }
}

fn opt(value: &Option<String>) -> String {
  value.clone().unwrap_or_default()
}

fn money(value: f64) -> String {
  format!("{:.0}", value)
}

fn qty(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{:.0}", value)
  } else {
    format!("{:.2}", value)
  }
}

impl Row for Product {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "NAME", "PRICE", "STOCK", "UNIT", "STATUS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.code.clone(),
      self.name.clone(),
      money(self.unit_price),
      self.stock_quantity.or(self.quantity).map(qty).unwrap_or_default(),
      opt(&self.unit_name),
      self.status.clone(),
    ]
  }
}

impl Row for Supplier {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "NAME", "TYPE", "PHONE", "ADDRESS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(&self.code),
      self.name.clone(),
      opt(&self.kind),
      opt(&self.phone),
      opt(&self.address),
    ]
  }
}

impl Row for Customer {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "NAME", "PHONE", "EMAIL", "STATUS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(&self.code),
      self.display_name().to_string(),
      opt(&self.phone),
      opt(&self.email),
      opt(&self.status),
    ]
  }
}

const RECEIPT_LINE_HEADERS: &[&str] = &["PRODUCT", "NAME", "QTY", "UNIT", "PRICE", "DISCOUNT"];

fn receipt_lines(items: &[stockroom::backoffice::types::ReceiptLine]) -> Vec<Vec<String>> {
  items
    .iter()
    .map(|line| {
      vec![
        line.product_code.clone().unwrap_or_else(|| line.product_id.to_string()),
        opt(&line.product_name),
        qty(line.quantity),
        opt(&line.unit_name),
        money(line.unit_price),
        line.discount_percent.map(|d| format!("{}%", d)).unwrap_or_default(),
      ]
    })
    .collect()
}

impl Row for ImportReceipt {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "DATE", "SUPPLIER", "STORE", "TOTAL", "STATUS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.code.clone(),
      self.imports_date.clone(),
      opt(&self.supplier_name),
      opt(&self.store_name),
      money(self.total_value),
      self.status.to_string(),
    ]
  }

  fn lines(&self) -> (&'static [&'static str], Vec<Vec<String>>) {
    (RECEIPT_LINE_HEADERS, receipt_lines(&self.items))
  }
}

impl Row for ExportReceipt {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "DATE", "CUSTOMER", "SUPPLIER", "TOTAL", "STATUS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.code.clone(),
      self.exports_date.clone(),
      opt(&self.customer_name),
      opt(&self.supplier_name),
      money(self.total_value),
      self.status.to_string(),
    ]
  }

  fn lines(&self) -> (&'static [&'static str], Vec<Vec<String>>) {
    (RECEIPT_LINE_HEADERS, receipt_lines(&self.items))
  }
}

impl Row for Store {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "NAME", "PHONE", "ADDRESS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      opt(&self.code),
      self.name.clone(),
      opt(&self.phone),
      opt(&self.address),
    ]
  }
}

impl Row for Unit {
  const HEADERS: &'static [&'static str] = &["ID", "NAME", "ACTIVE", "DESCRIPTION"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.name.clone(),
      self.active.map(|a| if a { "yes" } else { "no" }.to_string()).unwrap_or_default(),
      opt(&self.description),
    ]
  }
}

impl Row for Category {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "NAME", "DESCRIPTION"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.code.clone(),
      self.name.clone(),
      opt(&self.description),
    ]
  }
}

impl Row for Stock {
  const HEADERS: &'static [&'static str] = &["PRODUCT", "STORE", "QTY", "MIN", "MAX"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.product_id.to_string(),
      self
        .store_code
        .clone()
        .or_else(|| self.store_name.clone())
        .unwrap_or_else(|| self.store_id.to_string()),
      qty(self.quantity),
      self.min_stock.map(qty).unwrap_or_default(),
      self.max_stock.map(qty).unwrap_or_default(),
    ]
  }
}

const CHECK_LINE_HEADERS: &[&str] = &["PRODUCT", "NAME", "SYSTEM", "ACTUAL", "DIFF", "VALUE"];

impl Row for InventoryCheck {
  const HEADERS: &'static [&'static str] = &["ID", "CODE", "DATE", "STORE", "DIFFERENCE", "STATUS"];

  fn cells(&self) -> Vec<String> {
    vec![
      self.id.to_string(),
      self.check_code.clone(),
      self.check_date.clone(),
      opt(&self.store_name),
      money(self.total_difference_value),
      self.status.to_string(),
    ]
  }

  fn lines(&self) -> (&'static [&'static str], Vec<Vec<String>>) {
    let lines = self
      .items
      .iter()
      .map(|line| {
        vec![
          line.product_code.clone().unwrap_or_else(|| line.product_id.to_string()),
          opt(&line.product_name),
          qty(line.system_quantity),
          qty(line.actual_quantity),
          qty(line.difference_quantity),
          money(line.total_value),
        ]
      })
      .collect();
    (CHECK_LINE_HEADERS, lines)
  }
}
