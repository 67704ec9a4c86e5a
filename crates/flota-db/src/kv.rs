// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// String-keyed persistence. The store only ever holds a handful of keys.
pub trait KeyValue {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One `kv` table row per key, stamped with the time of the last write.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open(path: &Path) -> Result<Self> {
        let in_memory = path == Path::new(":memory:");
        if !in_memory {
            validate_db_path(&path.to_string_lossy())?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        let kv = Self::with_connection(conn)?;
        if !in_memory {
            restrict_to_owner(path)?;
        }
        Ok(kv)
    }

    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().context("open in-memory database")?)
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .context("set sqlite busy timeout")?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .context("prepare kv table")?;
        Ok(Self { conn })
    }
}

impl KeyValue for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .with_context(|| format!("read key {key}"))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO kv (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert key {key}"))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", params![key])
            .with_context(|| format!("delete key {key}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: BTreeMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Reject values that SQLite would read as a URI rather than a file on disk.
pub fn validate_db_path(path: &str) -> Result<()> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        bail!("database path is empty -- set [storage].db_path or FLOTA_DB_PATH to a file path");
    }
    if trimmed == ":memory:" {
        return Ok(());
    }

    let scheme = trimmed
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()));
    if let Some(scheme) = scheme {
        bail!("database path {path:?} looks like a URI ({scheme}://) -- use a filesystem path");
    }
    if trimmed.starts_with("file:") || trimmed.contains('?') {
        bail!("database path {path:?} uses SQLite URI syntax -- drop `file:` and any `?` options");
    }
    Ok(())
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

/// The document holds plaintext passwords, so the file is owner-only.
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::fs::{Permissions, set_permissions};
    use std::os::unix::fs::PermissionsExt;

    set_permissions(path, Permissions::from_mode(0o600))
        .with_context(|| format!("make {} readable by its owner only", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KeyValue, MemoryKv, SqliteKv, validate_db_path};
    use anyhow::Result;

    fn exercise(kv: &mut dyn KeyValue) -> Result<()> {
        assert_eq!(kv.get("mantenimientos_db")?, None);
        kv.put("mantenimientos_db", "{}")?;
        kv.put("mantenimientos_db", "{\"users\":[]}")?;
        assert_eq!(kv.get("mantenimientos_db")?.as_deref(), Some("{\"users\":[]}"));
        kv.remove("mantenimientos_db")?;
        assert_eq!(kv.get("mantenimientos_db")?, None);
        Ok(())
    }

    #[test]
    fn sqlite_backend_upserts_and_removes() -> Result<()> {
        exercise(&mut SqliteKv::open_memory()?)
    }

    #[test]
    fn memory_backend_upserts_and_removes() -> Result<()> {
        exercise(&mut MemoryKv::new())
    }

    #[test]
    fn sqlite_backend_keeps_one_row_per_key() -> Result<()> {
        let mut kv = SqliteKv::open_memory()?;
        kv.put("lastSyncSuccess", "1")?;
        kv.put("lastSyncSuccess", "2")?;
        let rows: i64 = kv
            .raw_connection()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[test]
    fn uri_shaped_paths_are_rejected() {
        for bad in ["", "  ", "https://host/flota.db", "file:flota.db", "flota.db?mode=ro"] {
            assert!(validate_db_path(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in [":memory:", "/var/lib/flota/flota.db", "C:\\flota\\flota.db", "./flota.db"] {
            assert!(validate_db_path(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[cfg(unix)]
    #[test]
    fn database_file_is_owner_only() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("flota.db");
        SqliteKv::open(&path)?.put("k", "v")?;
        let mode = std::fs::metadata(&path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }
}
