//! Coordinates clipboard storage, permissions, and scope resolution (C9).
//! Ported from `clipboard/manager.py`.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use super::storage::{project_db_path, system_db_path, ClipboardStorage, StorageError};
use super::types::{
    now_unix, ClipboardEntry, ClipboardPermissions, ClipboardScope, FromContentOptions,
    MAX_ENTRY_SIZE_BYTES, WARN_ENTRY_SIZE_BYTES,
};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no {0} permission for {1} clipboard")]
    PermissionDenied(&'static str, &'static str),
    #[error("key '{0}' already exists in {1} scope. Use update to modify or choose a different key.")]
    AlreadyExists(String, &'static str),
    #[error("key '{0}' not found in {1} scope")]
    NotFound(String, &'static str),
    #[error("content size ({size} bytes) exceeds maximum ({max} bytes)")]
    TooLarge { size: usize, max: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Per-scope default TTLs, in seconds. `None` leaves entries permanent by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardTtlConfig {
    pub agent: Option<i64>,
    pub project: Option<i64>,
    pub system: Option<i64>,
}

pub struct ClipboardManager {
    agent_id: String,
    cwd: PathBuf,
    home_dir: PathBuf,
    permissions: ClipboardPermissions,
    ttl_config: ClipboardTtlConfig,
    agent_clipboard: HashMap<String, ClipboardEntry>,
    project_storage: Option<ClipboardStorage>,
    system_storage: Option<ClipboardStorage>,
}

impl ClipboardManager {
    pub fn new(
        agent_id: String,
        cwd: PathBuf,
        permissions: Option<ClipboardPermissions>,
        home_dir: Option<PathBuf>,
        ttl_config: ClipboardTtlConfig,
    ) -> ClipboardManager {
        ClipboardManager {
            agent_id,
            cwd,
            home_dir: home_dir.unwrap_or_else(|| dirs_home()),
            permissions: permissions.unwrap_or(ClipboardPermissions::SANDBOXED),
            ttl_config,
            agent_clipboard: HashMap::new(),
            project_storage: None,
            system_storage: None,
        }
    }

    fn project_storage(&mut self) -> Result<&ClipboardStorage, ClipboardError> {
        if self.project_storage.is_none() {
            let path = project_db_path(&self.cwd);
            self.project_storage = Some(ClipboardStorage::open(&path, ClipboardScope::Project)?);
        }
        Ok(self.project_storage.as_ref().unwrap())
    }

    fn system_storage(&mut self) -> Result<&ClipboardStorage, ClipboardError> {
        if self.system_storage.is_none() {
            let path = system_db_path(&self.home_dir);
            self.system_storage = Some(ClipboardStorage::open(&path, ClipboardScope::System)?);
        }
        Ok(self.system_storage.as_ref().unwrap())
    }

    fn check_read(&self, scope: ClipboardScope) -> Result<(), ClipboardError> {
        if self.permissions.can_read(scope) {
            Ok(())
        } else {
            Err(ClipboardError::PermissionDenied("read", scope.as_str()))
        }
    }

    fn check_write(&self, scope: ClipboardScope) -> Result<(), ClipboardError> {
        if self.permissions.can_write(scope) {
            Ok(())
        } else {
            Err(ClipboardError::PermissionDenied("write", scope.as_str()))
        }
    }

    fn validate_size(content: &str) -> Result<Option<String>, ClipboardError> {
        let size = content.len();
        if size > MAX_ENTRY_SIZE_BYTES {
            return Err(ClipboardError::TooLarge { size, max: MAX_ENTRY_SIZE_BYTES });
        }
        if size > WARN_ENTRY_SIZE_BYTES {
            return Ok(Some(format!("Warning: Large clipboard entry ({size} bytes)")));
        }
        Ok(None)
    }

    fn ttl_for_scope(&self, scope: ClipboardScope) -> Option<i64> {
        match scope {
            ClipboardScope::Agent => self.ttl_config.agent,
            ClipboardScope::Project => self.ttl_config.project,
            ClipboardScope::System => self.ttl_config.system,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn copy(
        &mut self,
        key: String,
        content: String,
        scope: ClipboardScope,
        short_description: Option<String>,
        source_path: Option<String>,
        source_lines: Option<String>,
        tags: Vec<String>,
        ttl_seconds: Option<i64>,
    ) -> Result<(ClipboardEntry, Option<String>), ClipboardError> {
        self.check_write(scope)?;
        let warning = Self::validate_size(&content)?;
        let ttl_seconds = ttl_seconds.or_else(|| self.ttl_for_scope(scope));

        let entry = ClipboardEntry::from_content(
            key.clone(),
            scope,
            content,
            FromContentOptions {
                short_description,
                source_path,
                source_lines,
                agent_id: Some(self.agent_id.clone()),
                ttl_seconds,
                tags,
            },
        );

        match scope {
            ClipboardScope::Agent => {
                if self.agent_clipboard.contains_key(&key) {
                    return Err(ClipboardError::AlreadyExists(key, "agent"));
                }
                self.agent_clipboard.insert(key, entry.clone());
            }
            ClipboardScope::Project => {
                let storage = self.project_storage()?;
                storage.create(&entry).map_err(|e| match e {
                    StorageError::AlreadyExists(k) => ClipboardError::AlreadyExists(k, "project"),
                    other => ClipboardError::Storage(other),
                })?;
            }
            ClipboardScope::System => {
                let storage = self.system_storage()?;
                storage.create(&entry).map_err(|e| match e {
                    StorageError::AlreadyExists(k) => ClipboardError::AlreadyExists(k, "system"),
                    other => ClipboardError::Storage(other),
                })?;
            }
        }

        Ok((entry, warning))
    }

    fn get_from_scope(&mut self, key: &str, scope: ClipboardScope) -> Result<Option<ClipboardEntry>, ClipboardError> {
        match scope {
            ClipboardScope::Agent => Ok(self.agent_clipboard.get(key).cloned()),
            ClipboardScope::Project => Ok(self.project_storage()?.get(key)?),
            ClipboardScope::System => Ok(self.system_storage()?.get(key)?),
        }
    }

    /// Look up `key`. With `scope` given, searches only that scope (after a
    /// permission check); otherwise searches agent -> project -> system.
    pub fn get(&mut self, key: &str, scope: Option<ClipboardScope>) -> Result<Option<ClipboardEntry>, ClipboardError> {
        if let Some(s) = scope {
            self.check_read(s)?;
            return self.get_from_scope(key, s);
        }

        for s in ClipboardScope::ALL {
            if self.permissions.can_read(s) {
                if let Some(e) = self.get_from_scope(key, s)? {
                    return Ok(Some(e));
                }
            }
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        key: &str,
        scope: ClipboardScope,
        content: Option<String>,
        short_description: Option<String>,
        source_path: Option<String>,
        source_lines: Option<String>,
        new_key: Option<String>,
        ttl_seconds: Option<i64>,
    ) -> Result<(ClipboardEntry, Option<String>), ClipboardError> {
        self.check_write(scope)?;

        let warning = match &content {
            Some(c) => Self::validate_size(c)?,
            None => None,
        };

        match scope {
            ClipboardScope::Agent => {
                if !self.agent_clipboard.contains_key(key) {
                    return Err(ClipboardError::NotFound(key.to_string(), "agent"));
                }
                if let Some(nk) = &new_key {
                    if nk != key && self.agent_clipboard.contains_key(nk) {
                        return Err(ClipboardError::AlreadyExists(nk.clone(), "agent"));
                    }
                }

                let mut entry = self.agent_clipboard.remove(key).unwrap();
                if let Some(c) = content {
                    entry.line_count = super::types::count_lines(&c);
                    entry.byte_count = c.len();
                    entry.content = c;
                }
                if let Some(d) = short_description {
                    entry.short_description = Some(d);
                }
                if let Some(p) = source_path {
                    entry.source_path = Some(p);
                }
                if let Some(l) = source_lines {
                    entry.source_lines = Some(l);
                }
                if let Some(ttl) = ttl_seconds {
                    entry.ttl_seconds = Some(ttl);
                    entry.expires_at = Some(now_unix() + ttl as f64);
                }
                entry.modified_at = now_unix();
                entry.modified_by_agent = Some(self.agent_id.clone());
                if let Some(nk) = new_key {
                    if nk != *key {
                        entry.key = nk.clone();
                        self.agent_clipboard.insert(nk, entry.clone());
                        return Ok((entry, warning));
                    }
                }
                self.agent_clipboard.insert(key.to_string(), entry.clone());
                Ok((entry, warning))
            }
            ClipboardScope::Project => {
                let storage = self.project_storage()?;
                let entry = storage
                    .update(
                        key,
                        content.as_deref(),
                        short_description.as_deref(),
                        source_path.as_deref(),
                        source_lines.as_deref(),
                        new_key.as_deref(),
                        Some(&self.agent_id),
                        ttl_seconds,
                    )
                    .map_err(|e| match e {
                        StorageError::NotFound(k) => ClipboardError::NotFound(k, "project"),
                        StorageError::AlreadyExists(k) => ClipboardError::AlreadyExists(k, "project"),
                        other => ClipboardError::Storage(other),
                    })?;
                Ok((entry, warning))
            }
            ClipboardScope::System => {
                let storage = self.system_storage()?;
                let entry = storage
                    .update(
                        key,
                        content.as_deref(),
                        short_description.as_deref(),
                        source_path.as_deref(),
                        source_lines.as_deref(),
                        new_key.as_deref(),
                        Some(&self.agent_id),
                        ttl_seconds,
                    )
                    .map_err(|e| match e {
                        StorageError::NotFound(k) => ClipboardError::NotFound(k, "system"),
                        StorageError::AlreadyExists(k) => ClipboardError::AlreadyExists(k, "system"),
                        other => ClipboardError::Storage(other),
                    })?;
                Ok((entry, warning))
            }
        }
    }

    pub fn delete(&mut self, key: &str, scope: ClipboardScope) -> Result<bool, ClipboardError> {
        self.check_write(scope)?;
        match scope {
            ClipboardScope::Agent => Ok(self.agent_clipboard.remove(key).is_some()),
            ClipboardScope::Project => Ok(self.project_storage()?.delete(key)?),
            ClipboardScope::System => Ok(self.system_storage()?.delete(key)?),
        }
    }

    pub fn clear(&mut self, scope: ClipboardScope) -> Result<usize, ClipboardError> {
        self.check_write(scope)?;
        match scope {
            ClipboardScope::Agent => {
                let n = self.agent_clipboard.len();
                self.agent_clipboard.clear();
                Ok(n)
            }
            ClipboardScope::Project => Ok(self.project_storage()?.clear()?),
            ClipboardScope::System => Ok(self.system_storage()?.clear()?),
        }
    }

    /// List entries, optionally restricted to one scope and filtered by tags.
    /// `tags` requires ALL listed tags present (AND); `any_tags` requires ANY (OR).
    pub fn list_entries(
        &mut self,
        scope: Option<ClipboardScope>,
        tags: &[String],
        any_tags: &[String],
        include_expired: bool,
    ) -> Result<Vec<ClipboardEntry>, ClipboardError> {
        let scopes: Vec<ClipboardScope> = scope.map(|s| vec![s]).unwrap_or_else(|| ClipboardScope::ALL.to_vec());
        let mut entries = Vec::new();

        for s in scopes {
            if !self.permissions.can_read(s) {
                continue;
            }
            match s {
                ClipboardScope::Agent => entries.extend(self.agent_clipboard.values().cloned()),
                ClipboardScope::Project => entries.extend(self.project_storage()?.list_all()?),
                ClipboardScope::System => entries.extend(self.system_storage()?.list_all()?),
            }
        }

        if !tags.is_empty() {
            entries.retain(|e| tags.iter().all(|t| e.tags.contains(t)));
        }
        if !any_tags.is_empty() {
            entries.retain(|e| any_tags.iter().any(|t| e.tags.contains(t)));
        }
        if !include_expired {
            entries.retain(|e| !e.is_expired());
        }

        entries.sort_by(|a, b| b.modified_at.partial_cmp(&a.modified_at).unwrap_or(std::cmp::Ordering::Equal));
        Ok(entries)
    }

    pub fn count_expired(&mut self, scope: Option<ClipboardScope>) -> Result<usize, ClipboardError> {
        let now = now_unix();
        let scopes: Vec<ClipboardScope> = scope.map(|s| vec![s]).unwrap_or_else(|| ClipboardScope::ALL.to_vec());
        let mut count = 0;

        for s in scopes {
            if !self.permissions.can_read(s) {
                continue;
            }
            match s {
                ClipboardScope::Agent => {
                    count += self.agent_clipboard.values().filter(|e| e.expires_at.is_some_and(|x| x <= now)).count()
                }
                ClipboardScope::Project => count += self.project_storage()?.count_expired(now)?,
                ClipboardScope::System => count += self.system_storage()?.count_expired(now)?,
            }
        }
        Ok(count)
    }

    pub fn get_expired(&mut self, scope: Option<ClipboardScope>) -> Result<Vec<ClipboardEntry>, ClipboardError> {
        let now = now_unix();
        let scopes: Vec<ClipboardScope> = scope.map(|s| vec![s]).unwrap_or_else(|| ClipboardScope::ALL.to_vec());
        let mut expired = Vec::new();

        for s in scopes {
            if !self.permissions.can_read(s) {
                continue;
            }
            match s {
                ClipboardScope::Agent => {
                    expired.extend(self.agent_clipboard.values().filter(|e| e.expires_at.is_some_and(|x| x <= now)).cloned())
                }
                ClipboardScope::Project => expired.extend(self.project_storage()?.get_expired(now)?),
                ClipboardScope::System => expired.extend(self.system_storage()?.get_expired(now)?),
            }
        }
        Ok(expired)
    }

    /// Case-insensitive substring search across keys, descriptions and
    /// content of readable entries, optionally narrowed to entries carrying
    /// all of `tags`.
    pub fn search(
        &mut self,
        query: &str,
        scope: Option<ClipboardScope>,
        search_content: bool,
        search_keys: bool,
        search_descriptions: bool,
        tags: &[String],
    ) -> Result<Vec<ClipboardEntry>, ClipboardError> {
        let entries = self.list_entries(scope, &[], &[], true)?;
        let query_lower = query.to_lowercase();

        let results = entries
            .into_iter()
            .filter(|e| tags.is_empty() || tags.iter().all(|t| e.tags.contains(t)))
            .filter(|e| {
                (search_keys && e.key.to_lowercase().contains(&query_lower))
                    || (search_descriptions
                        && e.short_description.as_deref().map(|d| d.to_lowercase().contains(&query_lower)).unwrap_or(false))
                    || (search_content && e.content.to_lowercase().contains(&query_lower))
            })
            .collect();
        Ok(results)
    }

    pub fn add_tags(&mut self, key: &str, scope: ClipboardScope, tags: Vec<String>) -> Result<ClipboardEntry, ClipboardError> {
        self.check_write(scope)?;
        let mut entry = self
            .get_from_scope(key, scope)?
            .ok_or_else(|| ClipboardError::NotFound(key.to_string(), scope.as_str()))?;

        for t in tags {
            if !entry.tags.contains(&t) {
                entry.tags.push(t);
            }
        }
        entry.tags.sort();
        entry.modified_at = now_unix();
        entry.modified_by_agent = Some(self.agent_id.clone());
        self.persist_tags(key, scope, &entry)?;
        Ok(entry)
    }

    pub fn remove_tags(&mut self, key: &str, scope: ClipboardScope, tags: &[String]) -> Result<ClipboardEntry, ClipboardError> {
        self.check_write(scope)?;
        let mut entry = self
            .get_from_scope(key, scope)?
            .ok_or_else(|| ClipboardError::NotFound(key.to_string(), scope.as_str()))?;

        entry.tags.retain(|t| !tags.contains(t));
        entry.modified_at = now_unix();
        entry.modified_by_agent = Some(self.agent_id.clone());
        self.persist_tags(key, scope, &entry)?;
        Ok(entry)
    }

    fn persist_tags(&mut self, key: &str, scope: ClipboardScope, entry: &ClipboardEntry) -> Result<(), ClipboardError> {
        match scope {
            ClipboardScope::Agent => {
                self.agent_clipboard.insert(key.to_string(), entry.clone());
            }
            ClipboardScope::Project => self.project_storage()?.set_tags(key, &entry.tags)?,
            ClipboardScope::System => self.system_storage()?.set_tags(key, &entry.tags)?,
        }
        Ok(())
    }

    pub fn list_tags(&mut self, scope: Option<ClipboardScope>) -> Result<Vec<String>, ClipboardError> {
        let entries = self.list_entries(scope, &[], &[], true)?;
        let mut tags: Vec<String> = entries.into_iter().flat_map(|e| e.tags).collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Snapshot agent-scope entries, e.g. for session persistence.
    pub fn agent_entries(&self) -> HashMap<String, ClipboardEntry> {
        self.agent_clipboard.clone()
    }

    /// Restore agent-scope entries from a prior snapshot.
    pub fn restore_agent_entries(&mut self, entries: HashMap<String, ClipboardEntry>) {
        self.agent_clipboard = entries;
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(cwd: PathBuf, home: PathBuf, perms: ClipboardPermissions) -> ClipboardManager {
        ClipboardManager::new("agent-1".into(), cwd, Some(perms), Some(home), ClipboardTtlConfig::default())
    }

    #[test]
    fn agent_scope_copy_and_get_roundtrip() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::SANDBOXED);
        m.copy("k1".into(), "hello".into(), ClipboardScope::Agent, None, None, None, vec![], None).unwrap();
        let got = m.get("k1", None).unwrap().unwrap();
        assert_eq!(got.content, "hello");
    }

    #[test]
    fn sandboxed_denies_project_write() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::SANDBOXED);
        let err = m.copy("k1".into(), "x".into(), ClipboardScope::Project, None, None, None, vec![], None).unwrap_err();
        assert!(matches!(err, ClipboardError::PermissionDenied("write", "project")));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::YOLO);
        let huge = "x".repeat(MAX_ENTRY_SIZE_BYTES + 1);
        let err = m.copy("k1".into(), huge, ClipboardScope::Agent, None, None, None, vec![], None).unwrap_err();
        assert!(matches!(err, ClipboardError::TooLarge { .. }));
    }

    #[test]
    fn get_searches_agent_before_project() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::YOLO);
        m.copy("k1".into(), "agent-val".into(), ClipboardScope::Agent, None, None, None, vec![], None).unwrap();
        m.copy("k1".into(), "project-val".into(), ClipboardScope::Project, None, None, None, vec![], None).unwrap();
        let got = m.get("k1", None).unwrap().unwrap();
        assert_eq!(got.content, "agent-val");
    }

    #[test]
    fn search_matches_key_description_and_content() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::YOLO);
        m.copy("alpha".into(), "nothing relevant".into(), ClipboardScope::Agent, Some("a widget".into()), None, None, vec![], None)
            .unwrap();
        let results = m.search("widget", None, true, true, true, &[]).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn add_and_remove_tags() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path().into(), dir.path().into(), ClipboardPermissions::YOLO);
        m.copy("k1".into(), "x".into(), ClipboardScope::Agent, None, None, None, vec![], None).unwrap();
        let e = m.add_tags("k1", ClipboardScope::Agent, vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(e.tags, vec!["a".to_string(), "b".to_string()]);
        let e = m.remove_tags("k1", ClipboardScope::Agent, &["a".to_string()]).unwrap();
        assert_eq!(e.tags, vec!["b".to_string()]);
    }
}
