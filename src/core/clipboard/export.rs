//! Clipboard JSON export/import (§6.2). Not present in the original Python
//! sources verbatim, but named by spec.md §6.2's wire format; grounded on
//! the same entry fields as [`super::types::ClipboardEntry`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::manager::{ClipboardError, ClipboardManager};
use super::types::{now_unix, ClipboardEntry, ClipboardScope, FromContentOptions};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    Skip,
    Overwrite,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub key: String,
    pub scope: String,
    pub content: String,
    pub line_count: usize,
    pub byte_count: usize,
    pub short_description: Option<String>,
    pub source_path: Option<String>,
    pub source_lines: Option<String>,
    pub created_at: f64,
    pub modified_at: f64,
    pub created_by_agent: Option<String>,
    pub modified_by_agent: Option<String>,
    pub expires_at: Option<f64>,
    pub ttl_seconds: Option<i64>,
    pub tags: Vec<String>,
}

impl From<&ClipboardEntry> for ExportedEntry {
    fn from(e: &ClipboardEntry) -> Self {
        ExportedEntry {
            key: e.key.clone(),
            scope: e.scope.as_str().to_string(),
            content: e.content.clone(),
            line_count: e.line_count,
            byte_count: e.byte_count,
            short_description: e.short_description.clone(),
            source_path: e.source_path.clone(),
            source_lines: e.source_lines.clone(),
            created_at: e.created_at,
            modified_at: e.modified_at,
            created_by_agent: e.created_by_agent.clone(),
            modified_by_agent: e.modified_by_agent.clone(),
            expires_at: e.expires_at,
            ttl_seconds: e.ttl_seconds,
            tags: e.tags.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: String,
    pub entry_count: usize,
    pub entries: Vec<ExportedEntry>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export schema version: {0}")]
    UnsupportedVersion(String),
    #[error("unrecognized scope in import record: {0}")]
    UnknownScope(String),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Build the canonical export document for `entries`. `exported_at` is an
/// RFC3339-ish local timestamp string supplied by the caller, since this
/// module has no wall-clock formatting dependency of its own.
pub fn export_entries(entries: &[ClipboardEntry], exported_at: String) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        exported_at,
        entry_count: entries.len(),
        entries: entries.iter().map(ExportedEntry::from).collect(),
    }
}

fn parse_scope(s: &str) -> Result<ClipboardScope, ExportError> {
    match s {
        "agent" => Ok(ClipboardScope::Agent),
        "project" => Ok(ClipboardScope::Project),
        "system" => Ok(ClipboardScope::System),
        other => Err(ExportError::UnknownScope(other.to_string())),
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub overwritten: usize,
}

/// Import `doc` into `target_scope`, ignoring the `scope` field recorded on
/// each entry (spec.md §6.2: "Each entry's target scope comes from the
/// `scope` command-line argument, not the record"). `dry_run` only counts
/// what would happen.
pub fn import_entries(
    manager: &mut ClipboardManager,
    doc: &ExportDocument,
    target_scope: ClipboardScope,
    conflict: ConflictPolicy,
    dry_run: bool,
) -> Result<ImportReport, ExportError> {
    if doc.version != EXPORT_VERSION {
        return Err(ExportError::UnsupportedVersion(doc.version.clone()));
    }

    let mut report = ImportReport::default();

    for record in &doc.entries {
        let exists = manager.get(&record.key, Some(target_scope))?.is_some();

        if exists && conflict == ConflictPolicy::Skip {
            report.skipped += 1;
            continue;
        }

        if dry_run {
            if exists {
                report.overwritten += 1;
            } else {
                report.imported += 1;
            }
            continue;
        }

        if exists {
            manager.delete(&record.key, target_scope)?;
            report.overwritten += 1;
        } else {
            report.imported += 1;
        }

        manager.copy(
            record.key.clone(),
            record.content.clone(),
            target_scope,
            record.short_description.clone(),
            record.source_path.clone(),
            record.source_lines.clone(),
            record.tags.clone(),
            record.ttl_seconds,
        )?;
    }

    Ok(report)
}

/// Validate that every record names a recognized scope before attempting
/// any mutation (fail fast rather than partially importing).
pub fn validate_scopes(doc: &ExportDocument) -> Result<(), ExportError> {
    for record in &doc.entries {
        parse_scope(&record.scope)?;
    }
    Ok(())
}

pub fn entry_from_export(record: &ExportedEntry, scope: ClipboardScope) -> ClipboardEntry {
    let mut entry = ClipboardEntry::from_content(
        record.key.clone(),
        scope,
        record.content.clone(),
        FromContentOptions {
            short_description: record.short_description.clone(),
            source_path: record.source_path.clone(),
            source_lines: record.source_lines.clone(),
            agent_id: record.created_by_agent.clone(),
            ttl_seconds: record.ttl_seconds,
            tags: record.tags.clone(),
        },
    );
    entry.created_at = record.created_at;
    entry.modified_at = record.modified_at;
    entry.modified_by_agent = record.modified_by_agent.clone();
    entry.expires_at = record.expires_at;
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::manager::ClipboardTtlConfig;
    use crate::core::clipboard::types::ClipboardPermissions;
    use tempfile::tempdir;

    fn manager(dir: &std::path::Path) -> ClipboardManager {
        ClipboardManager::new(
            "agent".into(),
            dir.into(),
            Some(ClipboardPermissions::YOLO),
            Some(dir.into()),
            ClipboardTtlConfig::default(),
        )
    }

    #[test]
    fn export_then_import_round_trips() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path());
        m.copy("k1".into(), "hello".into(), ClipboardScope::Agent, None, None, None, vec![], None).unwrap();
        let entries = m.list_entries(None, &[], &[], true).unwrap();
        let doc = export_entries(&entries, "2026-01-01T00:00:00Z".into());
        assert_eq!(doc.entry_count, 1);

        m.clear(ClipboardScope::Agent).unwrap();
        let report = import_entries(&mut m, &doc, ClipboardScope::Agent, ConflictPolicy::Overwrite, false).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(m.get("k1", Some(ClipboardScope::Agent)).unwrap().unwrap().content, "hello");
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let doc = ExportDocument { version: "2.0".into(), exported_at: "x".into(), entry_count: 0, entries: vec![] };
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path());
        let err = import_entries(&mut m, &doc, ClipboardScope::Agent, ConflictPolicy::Skip, false).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedVersion(_)));
    }

    #[test]
    fn skip_policy_keeps_existing_entry() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path());
        m.copy("k1".into(), "original".into(), ClipboardScope::Agent, None, None, None, vec![], None).unwrap();
        let doc = ExportDocument {
            version: EXPORT_VERSION.into(),
            exported_at: "x".into(),
            entry_count: 1,
            entries: vec![ExportedEntry {
                key: "k1".into(),
                scope: "agent".into(),
                content: "incoming".into(),
                line_count: 1,
                byte_count: 8,
                short_description: None,
                source_path: None,
                source_lines: None,
                created_at: now_unix(),
                modified_at: now_unix(),
                created_by_agent: None,
                modified_by_agent: None,
                expires_at: None,
                ttl_seconds: None,
                tags: vec![],
            }],
        };
        let report = import_entries(&mut m, &doc, ClipboardScope::Agent, ConflictPolicy::Skip, false).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(m.get("k1", Some(ClipboardScope::Agent)).unwrap().unwrap().content, "original");
    }

    #[test]
    fn dry_run_does_not_mutate() {
        let dir = tempdir().unwrap();
        let mut m = manager(dir.path());
        let doc = ExportDocument {
            version: EXPORT_VERSION.into(),
            exported_at: "x".into(),
            entry_count: 1,
            entries: vec![ExportedEntry {
                key: "k1".into(),
                scope: "agent".into(),
                content: "x".into(),
                line_count: 1,
                byte_count: 1,
                short_description: None,
                source_path: None,
                source_lines: None,
                created_at: now_unix(),
                modified_at: now_unix(),
                created_by_agent: None,
                modified_by_agent: None,
                expires_at: None,
                ttl_seconds: None,
                tags: vec![],
            }],
        };
        let report = import_entries(&mut m, &doc, ClipboardScope::Agent, ConflictPolicy::Overwrite, true).unwrap();
        assert_eq!(report.imported, 1);
        assert!(m.get("k1", Some(ClipboardScope::Agent)).unwrap().is_none());
    }
}
