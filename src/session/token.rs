//! Token Store: where the bearer credential lives between runs.

use color_eyre::{eyre::eyre, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::db::Database;

/// Storage key of the bearer credential.
pub const TOKEN_KEY: &str = "access_token";

/// Persistence for the bearer credential.
///
/// Reads never fail: a store that cannot be read behaves as if no token
/// were saved.
pub trait TokenStore: Send + Sync {
  fn save(&self, token: &str) -> Result<()>;

  fn get(&self) -> Option<String>;

  fn clear(&self) -> Result<()>;

  fn is_logged_in(&self) -> bool {
    self.get().is_some_and(|token| !token.is_empty())
  }
}

/// Store for contexts without persistent storage. All operations are no-ops.
pub struct NoopTokenStore;

impl TokenStore for NoopTokenStore {
  fn save(&self, _token: &str) -> Result<()> {
    Ok(()) // Discard
  }

  fn get(&self) -> Option<String> {
    None
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// Process-local store, lost on exit.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_token(token: &str) -> Self {
    Self {
      token: Mutex::new(Some(token.to_string())),
    }
  }

  fn slot(&self) -> Result<MutexGuard<'_, Option<String>>> {
    self.token.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl TokenStore for MemoryTokenStore {
  fn save(&self, token: &str) -> Result<()> {
    *self.slot()? = Some(token.to_string());
    Ok(())
  }

  fn get(&self) -> Option<String> {
    self.slot().ok().and_then(|slot| slot.clone())
  }

  fn clear(&self) -> Result<()> {
    *self.slot()? = None;
    Ok(())
  }
}

/// SQLite-backed store, scoped to the origin of the API it authenticates.
pub struct SqliteTokenStore {
  db: Mutex<Database>,
  origin: String,
}

impl SqliteTokenStore {
  /// Open the store at the default database location.
  pub fn open(origin: &str) -> Result<Self> {
    Ok(Self::new(Database::open()?, origin))
  }

  pub fn new(db: Database, origin: &str) -> Self {
    Self {
      db: Mutex::new(db),
      origin: origin.to_string(),
    }
  }

  pub fn origin(&self) -> &str {
    &self.origin
  }

  fn db(&self) -> Result<MutexGuard<'_, Database>> {
    self.db.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl TokenStore for SqliteTokenStore {
  fn save(&self, token: &str) -> Result<()> {
    self.db()?.set_item(&self.origin, TOKEN_KEY, token)
  }

  fn get(&self) -> Option<String> {
    match self.db().and_then(|db| db.get_item(&self.origin, TOKEN_KEY)) {
      Ok(token) => token,
      Err(err) => {
        warn!(origin = %self.origin, error = %err, "token store unreadable");
        None
      }
    }
  }

  fn clear(&self) -> Result<()> {
    self.db()?.remove_item(&self.origin, TOKEN_KEY)
  }
}
