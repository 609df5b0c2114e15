//! Clipboard system types (C7). Ported from `clipboard/types.py`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, matching the original's `time.time()` floats.
pub fn now_unix() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardScope {
    /// In-memory, session-only.
    Agent,
    /// `<agent_cwd>/.nexus3/clipboard.db`.
    Project,
    /// `~/.nexus3/clipboard.db`.
    System,
}

impl ClipboardScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ClipboardScope::Agent => "agent",
            ClipboardScope::Project => "project",
            ClipboardScope::System => "system",
        }
    }

    pub const ALL: [ClipboardScope; 3] = [ClipboardScope::Agent, ClipboardScope::Project, ClipboardScope::System];
}

/// How to insert clipboard content into a target file (used by the paste skill).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    AfterLine,
    BeforeLine,
    ReplaceLines,
    AtMarkerReplace,
    AtMarkerAfter,
    AtMarkerBefore,
    Append,
    Prepend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardTag {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardEntry {
    pub key: String,
    pub scope: ClipboardScope,
    pub content: String,
    pub line_count: usize,
    pub byte_count: usize,
    pub short_description: Option<String>,
    pub source_path: Option<String>,
    /// e.g. "50-150".
    pub source_lines: Option<String>,
    pub created_at: f64,
    pub modified_at: f64,
    pub created_by_agent: Option<String>,
    pub modified_by_agent: Option<String>,
    /// `None` means permanent.
    pub expires_at: Option<f64>,
    pub ttl_seconds: Option<i64>,
    pub tags: Vec<String>,
}

pub fn count_lines(content: &str) -> usize {
    content.matches('\n').count() + usize::from(!content.is_empty() && !content.ends_with('\n'))
}

#[derive(Default)]
pub struct FromContentOptions {
    pub short_description: Option<String>,
    pub source_path: Option<String>,
    pub source_lines: Option<String>,
    pub agent_id: Option<String>,
    pub ttl_seconds: Option<i64>,
    pub tags: Vec<String>,
}

impl ClipboardEntry {
    /// Build an entry from raw content, computing line/byte counts and timestamps.
    pub fn from_content(key: String, scope: ClipboardScope, content: String, opts: FromContentOptions) -> ClipboardEntry {
        let now = now_unix();
        let expires_at = opts.ttl_seconds.map(|ttl| now + ttl as f64);
        ClipboardEntry {
            line_count: count_lines(&content),
            byte_count: content.len(),
            key,
            scope,
            created_at: now,
            modified_at: now,
            created_by_agent: opts.agent_id.clone(),
            modified_by_agent: opts.agent_id,
            expires_at,
            ttl_seconds: opts.ttl_seconds,
            tags: opts.tags,
            short_description: opts.short_description,
            source_path: opts.source_path,
            source_lines: opts.source_lines,
            content,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_unix() >= exp,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardPermissions {
    pub agent_scope: bool,
    pub project_read: bool,
    pub project_write: bool,
    pub system_read: bool,
    pub system_write: bool,
}

impl ClipboardPermissions {
    pub fn can_read(&self, scope: ClipboardScope) -> bool {
        match scope {
            ClipboardScope::Agent => self.agent_scope,
            ClipboardScope::Project => self.project_read,
            ClipboardScope::System => self.system_read,
        }
    }

    pub fn can_write(&self, scope: ClipboardScope) -> bool {
        match scope {
            ClipboardScope::Agent => self.agent_scope,
            ClipboardScope::Project => self.project_write,
            ClipboardScope::System => self.system_write,
        }
    }

    pub const YOLO: ClipboardPermissions = ClipboardPermissions {
        agent_scope: true,
        project_read: true,
        project_write: true,
        system_read: true,
        system_write: true,
    };

    pub const TRUSTED: ClipboardPermissions = ClipboardPermissions {
        agent_scope: true,
        project_read: true,
        project_write: true,
        system_read: true,
        system_write: false,
    };

    pub const SANDBOXED: ClipboardPermissions = ClipboardPermissions {
        agent_scope: true,
        project_read: false,
        project_write: false,
        system_read: false,
        system_write: false,
    };

    /// Resolve a named preset. The legacy `"worker"` name is an alias for
    /// `sandboxed`; any other unrecognized name falls back to `sandboxed`
    /// rather than granting broader access by default.
    pub fn from_preset_name(name: &str) -> ClipboardPermissions {
        match name {
            "yolo" => ClipboardPermissions::YOLO,
            "trusted" => ClipboardPermissions::TRUSTED,
            "sandboxed" | "worker" => ClipboardPermissions::SANDBOXED,
            _ => ClipboardPermissions::SANDBOXED,
        }
    }
}

/// Hard limit: entries larger than this are rejected outright.
pub const MAX_ENTRY_SIZE_BYTES: usize = 1024 * 1024;
/// Entries larger than this are accepted but surface a warning.
pub const WARN_ENTRY_SIZE_BYTES: usize = 100 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_count_matches_original_semantics() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\n"), 1);
        assert_eq!(count_lines("a\nb"), 2);
        assert_eq!(count_lines("a\nb\n"), 2);
    }

    #[test]
    fn unknown_preset_falls_back_to_sandboxed() {
        assert_eq!(ClipboardPermissions::from_preset_name("bogus"), ClipboardPermissions::SANDBOXED);
        assert_eq!(ClipboardPermissions::from_preset_name("worker"), ClipboardPermissions::SANDBOXED);
    }

    #[test]
    fn permissions_distinguish_scopes() {
        let p = ClipboardPermissions::TRUSTED;
        assert!(p.can_read(ClipboardScope::System));
        assert!(!p.can_write(ClipboardScope::System));
        assert!(p.can_write(ClipboardScope::Project));
    }

    #[test]
    fn expiry_uses_inclusive_comparison() {
        let mut entry = ClipboardEntry::from_content(
            "k".into(),
            ClipboardScope::Agent,
            "x".into(),
            FromContentOptions::default(),
        );
        entry.expires_at = Some(now_unix() - 1.0);
        assert!(entry.is_expired());
        entry.expires_at = None;
        assert!(!entry.is_expired());
    }
}
