//! SQLite-backed storage for one clipboard scope (C8). Ported from
//! `clipboard/storage.py`: same schema, same TOCTOU-safe exclusive file
//! creation before the connection is opened.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::core::secure_io::{secure_mkdir, SecureIoError, SECURE_FILE_MODE};

use super::types::ClipboardEntry;
use super::types::ClipboardScope;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS clipboard (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL,
    content TEXT NOT NULL,
    short_description TEXT,
    source_path TEXT,
    source_lines TEXT,
    line_count INTEGER NOT NULL,
    byte_count INTEGER NOT NULL,
    created_at REAL NOT NULL,
    modified_at REAL NOT NULL,
    created_by_agent TEXT,
    modified_by_agent TEXT,
    expires_at REAL,
    ttl_seconds INTEGER,
    UNIQUE(key)
);

CREATE INDEX IF NOT EXISTS idx_clipboard_key ON clipboard(key);
CREATE INDEX IF NOT EXISTS idx_clipboard_expires ON clipboard(expires_at) WHERE expires_at IS NOT NULL;

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);

CREATE TABLE IF NOT EXISTS clipboard_tags (
    clipboard_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (clipboard_id, tag_id),
    FOREIGN KEY (clipboard_id) REFERENCES clipboard(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_clipboard_tags_tag ON clipboard_tags(tag_id);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("key '{0}' already exists")]
    AlreadyExists(String),
    #[error("key '{0}' not found")]
    NotFound(String),
    #[error("secure I/O error: {0}")]
    SecureIo(#[from] SecureIoError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub struct ClipboardStorage {
    conn: Connection,
    scope: ClipboardScope,
}

impl ClipboardStorage {
    pub fn open(db_path: &Path, scope: ClipboardScope) -> Result<ClipboardStorage, StorageError> {
        let parent = db_path.parent().unwrap_or_else(|| Path::new("."));
        secure_mkdir(parent, true)?;

        if !db_path.exists() {
            // TOCTOU-safe exclusive creation before sqlite ever opens the file.
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(SECURE_FILE_MODE)
                .open(db_path)
                .map_err(|e| SecureIoError::Io { path: db_path.to_path_buf(), source: e })?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        let existing: Option<String> = conn
            .query_row("SELECT value FROM metadata WHERE key = 'schema_version'", [], |r| r.get(0))
            .optional()?;
        if existing.is_none() {
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
                params!["schema_version", SCHEMA_VERSION.to_string()],
            )?;
        }

        Ok(ClipboardStorage { conn, scope })
    }

    fn row_to_entry(&self, row: &rusqlite::Row) -> rusqlite::Result<ClipboardEntry> {
        let key: String = row.get("key")?;
        let tags = self.get_tags(&key).unwrap_or_default();
        Ok(ClipboardEntry {
            key,
            scope: self.scope,
            content: row.get("content")?,
            line_count: row.get::<_, i64>("line_count")? as usize,
            byte_count: row.get::<_, i64>("byte_count")? as usize,
            short_description: row.get("short_description")?,
            source_path: row.get("source_path")?,
            source_lines: row.get("source_lines")?,
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
            created_by_agent: row.get("created_by_agent")?,
            modified_by_agent: row.get("modified_by_agent")?,
            expires_at: row.get("expires_at")?,
            ttl_seconds: row.get("ttl_seconds")?,
            tags,
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<ClipboardEntry>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT * FROM clipboard WHERE key = ?1")?;
        let entry = stmt.query_row(params![key], |row| self.row_to_entry(row)).optional()?;
        Ok(entry)
    }

    pub fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let found: Option<i64> =
            self.conn.query_row("SELECT 1 FROM clipboard WHERE key = ?1", params![key], |r| r.get(0)).optional()?;
        Ok(found.is_some())
    }

    pub fn create(&self, entry: &ClipboardEntry) -> Result<(), StorageError> {
        if self.exists(&entry.key)? {
            return Err(StorageError::AlreadyExists(entry.key.clone()));
        }

        self.conn.execute(
            "INSERT INTO clipboard
               (key, content, short_description, source_path, source_lines,
                line_count, byte_count, created_at, modified_at,
                created_by_agent, modified_by_agent, expires_at, ttl_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                entry.key,
                entry.content,
                entry.short_description,
                entry.source_path,
                entry.source_lines,
                entry.line_count as i64,
                entry.byte_count as i64,
                entry.created_at,
                entry.modified_at,
                entry.created_by_agent,
                entry.modified_by_agent,
                entry.expires_at,
                entry.ttl_seconds,
            ],
        )?;

        if !entry.tags.is_empty() {
            self.set_tags(&entry.key, &entry.tags)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        key: &str,
        content: Option<&str>,
        short_description: Option<&str>,
        source_path: Option<&str>,
        source_lines: Option<&str>,
        new_key: Option<&str>,
        agent_id: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<ClipboardEntry, StorageError> {
        if self.get(key)?.is_none() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if let Some(nk) = new_key {
            if nk != key && self.exists(nk)? {
                return Err(StorageError::AlreadyExists(nk.to_string()));
            }
        }

        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(c) = content {
            let line_count = super::types::count_lines(c);
            sets.push("content = ?".into());
            values.push(Box::new(c.to_string()));
            sets.push("line_count = ?".into());
            values.push(Box::new(line_count as i64));
            sets.push("byte_count = ?".into());
            values.push(Box::new(c.len() as i64));
        }
        if let Some(d) = short_description {
            sets.push("short_description = ?".into());
            values.push(Box::new(d.to_string()));
        }
        if let Some(p) = source_path {
            sets.push("source_path = ?".into());
            values.push(Box::new(p.to_string()));
        }
        if let Some(l) = source_lines {
            sets.push("source_lines = ?".into());
            values.push(Box::new(l.to_string()));
        }
        if let Some(nk) = new_key {
            sets.push("key = ?".into());
            values.push(Box::new(nk.to_string()));
        }
        if let Some(ttl) = ttl_seconds {
            sets.push("ttl_seconds = ?".into());
            values.push(Box::new(ttl));
            sets.push("expires_at = ?".into());
            values.push(Box::new(super::types::now_unix() + ttl as f64));
        }
        sets.push("modified_at = ?".into());
        values.push(Box::new(super::types::now_unix()));
        sets.push("modified_by_agent = ?".into());
        values.push(Box::new(agent_id.map(str::to_string)));

        values.push(Box::new(key.to_string()));

        let sql = format!("UPDATE clipboard SET {} WHERE key = ?", sets.join(", "));
        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        self.conn.execute(&sql, param_refs.as_slice())?;

        let lookup_key = new_key.unwrap_or(key);
        self.get(lookup_key)?.ok_or_else(|| StorageError::NotFound(lookup_key.to_string()))
    }

    pub fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let n = self.conn.execute("DELETE FROM clipboard WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }

    pub fn clear(&self) -> Result<usize, StorageError> {
        let n = self.conn.execute("DELETE FROM clipboard", [])?;
        Ok(n)
    }

    pub fn list_all(&self) -> Result<Vec<ClipboardEntry>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT * FROM clipboard ORDER BY modified_at DESC")?;
        let rows = stmt.query_map([], |row| self.row_to_entry(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn count_expired(&self, now: f64) -> Result<usize, StorageError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM clipboard WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now],
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }

    pub fn get_expired(&self, now: f64) -> Result<Vec<ClipboardEntry>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM clipboard WHERE expires_at IS NOT NULL AND expires_at <= ?1 ORDER BY expires_at")?;
        let rows = stmt.query_map(params![now], |row| self.row_to_entry(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    pub fn set_tags(&self, key: &str, tags: &[String]) -> Result<(), StorageError> {
        let clipboard_id: i64 = self
            .conn
            .query_row("SELECT id FROM clipboard WHERE key = ?1", params![key], |r| r.get(0))
            .optional()?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        self.conn.execute("DELETE FROM clipboard_tags WHERE clipboard_id = ?1", params![clipboard_id])?;

        for tag_name in tags {
            self.conn.execute(
                "INSERT OR IGNORE INTO tags (name, created_at) VALUES (?1, ?2)",
                params![tag_name, super::types::now_unix()],
            )?;
            let tag_id: i64 = self.conn.query_row("SELECT id FROM tags WHERE name = ?1", params![tag_name], |r| r.get(0))?;
            self.conn.execute(
                "INSERT INTO clipboard_tags (clipboard_id, tag_id) VALUES (?1, ?2)",
                params![clipboard_id, tag_id],
            )?;
        }
        Ok(())
    }

    pub fn get_tags(&self, key: &str) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN clipboard_tags ct ON ct.tag_id = t.id
             JOIN clipboard c ON c.id = ct.clipboard_id
             WHERE c.key = ?1
             ORDER BY t.name",
        )?;
        let rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }
}

/// Project-scope DB path: `<cwd>/.nexus3/clipboard.db`.
pub fn project_db_path(cwd: &Path) -> PathBuf {
    cwd.join(".nexus3").join("clipboard.db")
}

/// System-scope DB path: `<home>/.nexus3/clipboard.db`.
pub fn system_db_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".nexus3").join("clipboard.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::types::{ClipboardEntry, FromContentOptions};
    use tempfile::tempdir;

    fn entry(key: &str, content: &str) -> ClipboardEntry {
        ClipboardEntry::from_content(key.into(), ClipboardScope::Project, content.into(), FromContentOptions::default())
    }

    #[test]
    fn create_get_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = ClipboardStorage::open(&dir.path().join("c.db"), ClipboardScope::Project).unwrap();
        storage.create(&entry("k1", "hello\n")).unwrap();
        let got = storage.get("k1").unwrap().unwrap();
        assert_eq!(got.content, "hello\n");
        assert_eq!(got.line_count, 1);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let dir = tempdir().unwrap();
        let storage = ClipboardStorage::open(&dir.path().join("c.db"), ClipboardScope::Project).unwrap();
        storage.create(&entry("k1", "a")).unwrap();
        assert!(matches!(storage.create(&entry("k1", "b")), Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn update_content_recomputes_counts() {
        let dir = tempdir().unwrap();
        let storage = ClipboardStorage::open(&dir.path().join("c.db"), ClipboardScope::Project).unwrap();
        storage.create(&entry("k1", "one\n")).unwrap();
        let updated = storage.update("k1", Some("one\ntwo\n"), None, None, None, None, Some("agent-x"), None).unwrap();
        assert_eq!(updated.line_count, 2);
        assert_eq!(updated.modified_by_agent.as_deref(), Some("agent-x"));
    }

    #[test]
    fn tags_round_trip_and_cascade_on_delete() {
        let dir = tempdir().unwrap();
        let storage = ClipboardStorage::open(&dir.path().join("c.db"), ClipboardScope::Project).unwrap();
        let mut e = entry("k1", "x");
        e.tags = vec!["a".into(), "b".into()];
        storage.create(&e).unwrap();
        assert_eq!(storage.get_tags("k1").unwrap(), vec!["a".to_string(), "b".to_string()]);
        storage.delete("k1").unwrap();
        assert!(storage.get("k1").unwrap().is_none());
    }

    #[test]
    fn expired_entries_are_found_not_deleted() {
        let dir = tempdir().unwrap();
        let storage = ClipboardStorage::open(&dir.path().join("c.db"), ClipboardScope::Project).unwrap();
        let mut e = entry("k1", "x");
        e.expires_at = Some(1.0);
        storage.create(&e).unwrap();
        assert_eq!(storage.count_expired(super::super::types::now_unix()).unwrap(), 1);
        assert!(storage.get("k1").unwrap().is_some());
    }

    #[test]
    fn db_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.db");
        ClipboardStorage::open(&path, ClipboardScope::System).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SECURE_FILE_MODE);
    }
}
