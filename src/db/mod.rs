pub mod schema;

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Database connection wrapper for origin-scoped local storage
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create the database at the default location
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open or create the database at `path`
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let db = Self { conn };
    db.run_migrations()?;

    Ok(db)
  }

  /// Private database that lives as long as the connection
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    let db = Self { conn };
    db.run_migrations()?;

    Ok(db)
  }

  /// Get the default database path
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("stockroom").join("local.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    self
      .conn
      .execute_batch(schema::SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  pub fn get_item(&self, origin: &str, key: &str) -> Result<Option<String>> {
    self
      .conn
      .query_row(
        "SELECT value FROM local_storage WHERE origin = ?1 AND key = ?2",
        params![origin, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {} for {}: {}", key, origin, e))
  }

  pub fn set_item(&self, origin: &str, key: &str, value: &str) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO local_storage (origin, key, value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT (origin, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![origin, key, value],
      )
      .map_err(|e| eyre!("Failed to write {} for {}: {}", key, origin, e))?;
    Ok(())
  }

  pub fn remove_item(&self, origin: &str, key: &str) -> Result<()> {
    self
      .conn
      .execute(
        "DELETE FROM local_storage WHERE origin = ?1 AND key = ?2",
        params![origin, key],
      )
      .map_err(|e| eyre!("Failed to remove {} for {}: {}", key, origin, e))?;
    Ok(())
  }

  /// Get a reference to the connection
  pub fn conn(&self) -> &Connection {
    &self.conn
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_items_are_scoped_by_origin() {
    let db = Database::open_in_memory().unwrap();
    db.set_item("http://localhost:8080", "access_token", "a").unwrap();
    db.set_item("https://shop.example.com", "access_token", "b").unwrap();

    assert_eq!(
      db.get_item("http://localhost:8080", "access_token").unwrap().as_deref(),
      Some("a")
    );
    assert_eq!(
      db.get_item("https://shop.example.com", "access_token").unwrap().as_deref(),
      Some("b")
    );
  }

  #[test]
  fn test_set_overwrites_and_remove_deletes() {
    let db = Database::open_in_memory().unwrap();
    db.set_item("o", "k", "first").unwrap();
    db.set_item("o", "k", "second").unwrap();
    assert_eq!(db.get_item("o", "k").unwrap().as_deref(), Some("second"));

    db.remove_item("o", "k").unwrap();
    assert_eq!(db.get_item("o", "k").unwrap(), None);

    // Removing a missing key is fine
    db.remove_item("o", "k").unwrap();
  }

  #[test]
  fn test_open_at_creates_parent_directories() {
    let dir = std::env::temp_dir().join(format!("stockroom-db-{}", std::process::id()));
    let path = dir.join("nested").join("local.db");
    {
      let db = Database::open_at(&path).unwrap();
      db.set_item("o", "k", "v").unwrap();
    }
    let reopened = Database::open_at(&path).unwrap();
    assert_eq!(reopened.get_item("o", "k").unwrap().as_deref(), Some("v"));
    let _ = std::fs::remove_dir_all(&dir);
  }
}
