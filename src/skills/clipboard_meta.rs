//! clipboard_list, clipboard_search, clipboard_tag, clipboard_export,
//! clipboard_import (spec.md §4.8, §6.2).

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::clipboard::export::{self, ConflictPolicy, ExportDocument};
use crate::core::clipboard::injection::format_entry_detail;
use crate::core::clipboard::types::{ClipboardEntry, ClipboardScope};
use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::parse_args;

fn parse_scope(s: &str) -> Result<ClipboardScope, SkillError> {
    match s {
        "agent" => Ok(ClipboardScope::Agent),
        "project" => Ok(ClipboardScope::Project),
        "system" => Ok(ClipboardScope::System),
        other => Err(SkillError::validation(format!("unrecognized scope: {other}"))),
    }
}

fn entry_summary(e: &ClipboardEntry) -> Value {
    json!({
        "key": e.key,
        "scope": e.scope.as_str(),
        "short_description": e.short_description,
        "source_path": e.source_path,
        "source_lines": e.source_lines,
        "line_count": e.line_count,
        "byte_count": e.byte_count,
        "created_at": e.created_at,
        "modified_at": e.modified_at,
        "expires_at": e.expires_at,
        "tags": e.tags,
        "expired": e.is_expired(),
    })
}

#[derive(Deserialize)]
struct ClipboardListArgs {
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    any_tags: Vec<String>,
    #[serde(default)]
    include_expired: bool,
    /// When true, each entry also carries a `detail` field: the same
    /// human-readable rendering `format_entry_detail` produces, with a
    /// truncated content preview.
    #[serde(default)]
    verbose: bool,
}

pub struct ClipboardListSkill;

#[async_trait]
impl Skill for ClipboardListSkill {
    fn name(&self) -> &str {
        "clipboard_list"
    }

    fn description(&self) -> &str {
        "List clipboard entries, optionally restricted to a scope and filtered by tags."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "tags": {"type": "array", "items": {"type": "string"}, "description": "entry must carry all of these tags"},
                "any_tags": {"type": "array", "items": {"type": "string"}, "description": "entry must carry at least one of these tags"},
                "include_expired": {"type": "boolean", "default": false},
                "verbose": {"type": "boolean", "default": false, "description": "include a human-readable detail rendering (source, relative-time, content preview) per entry"}
            }
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_list(services, args).await)
    }
}

async fn run_list(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardListArgs = parse_args(args)?;
    let scope = args.scope.as_deref().map(parse_scope).transpose()?;

    let entries = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        clipboard.list_entries(scope, &args.tags, &args.any_tags, args.include_expired)?
    };

    let rendered = entries.iter().map(|e| {
        let mut summary = entry_summary(e);
        if args.verbose {
            summary["detail"] = json!(format_entry_detail(e, true));
        }
        summary
    });

    Ok(SkillResult::ok(json!({
        "count": entries.len(),
        "entries": rendered.collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
struct ClipboardSearchArgs {
    query: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default = "default_true")]
    search_content: bool,
    #[serde(default = "default_true")]
    search_keys: bool,
    #[serde(default = "default_true")]
    search_descriptions: bool,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

pub struct ClipboardSearchSkill;

#[async_trait]
impl Skill for ClipboardSearchSkill {
    fn name(&self) -> &str {
        "clipboard_search"
    }

    fn description(&self) -> &str {
        "Case-insensitive substring search across readable clipboard entries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "search_content": {"type": "boolean", "default": true},
                "search_keys": {"type": "boolean", "default": true},
                "search_descriptions": {"type": "boolean", "default": true},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_search(services, args).await)
    }
}

async fn run_search(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardSearchArgs = parse_args(args)?;
    let scope = args.scope.as_deref().map(parse_scope).transpose()?;

    let entries = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        clipboard.search(
            &args.query,
            scope,
            args.search_content,
            args.search_keys,
            args.search_descriptions,
            &args.tags,
        )?
    };

    Ok(SkillResult::ok(json!({
        "count": entries.len(),
        "entries": entries.iter().map(entry_summary).collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum TagOp {
    Add,
    Remove,
    List,
}

#[derive(Deserialize)]
struct ClipboardTagArgs {
    op: TagOp,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub struct ClipboardTagSkill;

#[async_trait]
impl Skill for ClipboardTagSkill {
    fn name(&self) -> &str {
        "clipboard_tag"
    }

    fn description(&self) -> &str {
        "Add, remove, or list tags on clipboard entries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "op": {"type": "string", "enum": ["add", "remove", "list"]},
                "key": {"type": "string", "description": "required for add/remove"},
                "scope": {"type": "string", "enum": ["agent", "project", "system"], "description": "required for add/remove"},
                "tags": {"type": "array", "items": {"type": "string"}, "description": "required for add/remove"}
            },
            "required": ["op"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_tag(services, args).await)
    }
}

async fn run_tag(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardTagArgs = parse_args(args)?;

    match args.op {
        TagOp::List => {
            let scope = args.scope.as_deref().map(parse_scope).transpose()?;
            let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
            let tags = clipboard.list_tags(scope)?;
            Ok(SkillResult::ok(json!({"tags": tags})))
        }
        TagOp::Add => {
            let key = args.key.ok_or_else(|| SkillError::validation("key is required for op=add"))?;
            let scope = parse_scope(args.scope.as_deref().ok_or_else(|| SkillError::validation("scope is required for op=add"))?)?;
            let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
            let entry = clipboard.add_tags(&key, scope, args.tags)?;
            Ok(SkillResult::ok(json!({"key": entry.key, "tags": entry.tags})))
        }
        TagOp::Remove => {
            let key = args.key.ok_or_else(|| SkillError::validation("key is required for op=remove"))?;
            let scope = parse_scope(args.scope.as_deref().ok_or_else(|| SkillError::validation("scope is required for op=remove"))?)?;
            let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
            let entry = clipboard.remove_tags(&key, scope, &args.tags)?;
            Ok(SkillResult::ok(json!({"key": entry.key, "tags": entry.tags})))
        }
    }
}

#[derive(Deserialize)]
struct ClipboardExportArgs {
    path: PathBuf,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

pub struct ClipboardExportSkill;

#[async_trait]
impl Skill for ClipboardExportSkill {
    fn name(&self) -> &str {
        "clipboard_export"
    }

    fn description(&self) -> &str {
        "Export clipboard entries to a JSON document on disk."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_export(services, args).await)
    }
}

async fn run_export(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardExportArgs = parse_args(args)?;
    let scope = args.scope.as_deref().map(parse_scope).transpose()?;
    let resolved = super::common::check_path(services, "clipboard_export", &args.path, false, false)?;

    let entries = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        clipboard.list_entries(scope, &args.tags, &[], true)?
    };

    let exported_at = chrono::Utc::now().to_rfc3339();
    let doc = export::export_entries(&entries, exported_at);
    let body = serde_json::to_string_pretty(&doc).map_err(|e| SkillError::io(e.to_string()))?;

    super::common::write_atomic(&resolved, &body, crate::core::secure_io::LineEnding::Lf)?;

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "entry_count": doc.entry_count,
    })))
}

#[derive(Deserialize)]
struct ClipboardImportArgs {
    path: PathBuf,
    scope: String,
    #[serde(default)]
    overwrite: bool,
    #[serde(default)]
    dry_run: bool,
}

pub struct ClipboardImportSkill;

#[async_trait]
impl Skill for ClipboardImportSkill {
    fn name(&self) -> &str {
        "clipboard_import"
    }

    fn description(&self) -> &str {
        "Import a previously exported clipboard JSON document into one scope."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "overwrite": {"type": "boolean", "default": false, "description": "overwrite existing keys instead of skipping them"},
                "dry_run": {"type": "boolean", "default": false}
            },
            "required": ["path", "scope"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_import(services, args).await)
    }
}

async fn run_import(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardImportArgs = parse_args(args)?;
    let scope = parse_scope(&args.scope)?;
    let resolved = super::common::check_path(services, "clipboard_import", &args.path, true, false)?;

    let raw = super::common::read_text(&resolved)?;
    let doc: ExportDocument = serde_json::from_str(&raw).map_err(|e| SkillError::schema(format!("invalid export document: {e}")))?;
    export::validate_scopes(&doc)?;

    let conflict = if args.overwrite { ConflictPolicy::Overwrite } else { ConflictPolicy::Skip };

    let report = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        export::import_entries(&mut clipboard, &doc, scope, conflict, args.dry_run)?
    };

    Ok(SkillResult::ok(json!({
        "imported": report.imported,
        "skipped": report.skipped,
        "overwritten": report.overwritten,
        "dry_run": args.dry_run,
    })))
}
