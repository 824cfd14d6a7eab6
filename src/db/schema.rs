//! Schema of the local database.

pub const SCHEMA: &str = r#"
-- Origin-scoped key/value store, the terminal counterpart of browser localStorage
CREATE TABLE IF NOT EXISTS local_storage (
    origin TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (origin, key)
);
"#;
