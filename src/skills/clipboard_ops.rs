//! copy / cut / paste (spec.md §4.8): line-range extraction into the
//! clipboard and insertion back into target files.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::clipboard::types::ClipboardScope;
use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::{check_path, normalize_to_lf, parse_args, read_text, write_atomic};

fn parse_scope(s: &str) -> Result<ClipboardScope, SkillError> {
    match s {
        "agent" => Ok(ClipboardScope::Agent),
        "project" => Ok(ClipboardScope::Project),
        "system" => Ok(ClipboardScope::System),
        other => Err(SkillError::validation(format!("unrecognized scope: {other}"))),
    }
}

/// Extract an inclusive 1-based `[start_line, end_line]` range from `lines`,
/// defaulting to the whole file and clamping `end_line` to the line count.
fn resolve_range(total: usize, start_line: Option<usize>, end_line: Option<usize>) -> Result<(usize, usize), SkillError> {
    let start = start_line.unwrap_or(1);
    if start < 1 {
        return Err(SkillError::validation("start_line must be >= 1"));
    }
    if start > total && total > 0 {
        return Err(SkillError::validation(format!("start_line {start} exceeds file length {total}")));
    }
    let end = end_line.unwrap_or(total).min(total.max(start));
    if end < start {
        return Err(SkillError::validation("end_line must be >= start_line"));
    }
    Ok((start, end))
}

#[derive(Deserialize)]
struct CopyArgs {
    source_path: PathBuf,
    key: String,
    scope: String,
    #[serde(default)]
    start_line: Option<usize>,
    #[serde(default)]
    end_line: Option<usize>,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    ttl_seconds: Option<i64>,
}

pub struct CopySkill;

#[async_trait]
impl Skill for CopySkill {
    fn name(&self) -> &str {
        "copy"
    }

    fn description(&self) -> &str {
        "Copy a line range from a file into the clipboard store."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source_path": {"type": "string"},
                "key": {"type": "string"},
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "start_line": {"type": "integer", "minimum": 1},
                "end_line": {"type": "integer", "minimum": 1},
                "short_description": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}},
                "ttl_seconds": {"type": "integer"}
            },
            "required": ["source_path", "key", "scope"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_copy(services, args).await)
    }
}

/// Shared copy logic for `copy` and `cut`: read, extract, store. Returns the
/// full normalized lines, the extracted range, and the new clipboard key.
async fn do_copy(services: &Services, args: &CopyArgs, tool_name: &str) -> Result<(Vec<String>, (usize, usize), String), SkillError> {
    let scope = parse_scope(&args.scope)?;
    let resolved = check_path(services, tool_name, &args.source_path, true, false)?;

    let raw = read_text(&resolved)?;
    let (normalized, _ending) = normalize_to_lf(&raw);
    let lines: Vec<String> = if normalized.is_empty() { vec![] } else { normalized.lines().map(String::from).collect() };
    let total = lines.len();

    let (start, end) = resolve_range(total, args.start_line, args.end_line)?;
    let extracted = lines[start.saturating_sub(1)..end].join("\n");

    let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
    let (_entry, warning) = clipboard.copy(
        args.key.clone(),
        extracted,
        scope,
        args.short_description.clone(),
        Some(resolved.display().to_string()),
        Some(format!("{start}-{end}")),
        args.tags.clone(),
        args.ttl_seconds,
    )?;
    drop(clipboard);

    if let Some(w) = warning {
        return Ok((lines, (start, end), w));
    }
    Ok((lines, (start, end), String::new()))
}

async fn run_copy(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: CopyArgs = parse_args(args)?;
    let (_lines, (start, end), warning) = do_copy(services, &args, "copy").await?;

    let mut result = SkillResult::ok(json!({
        "key": args.key,
        "scope": args.scope,
        "source_lines": format!("{start}-{end}"),
    }));
    if !warning.is_empty() {
        result.warnings.push(warning);
    }
    Ok(result)
}

#[derive(Deserialize)]
struct CutArgs {
    #[serde(flatten)]
    copy: CopyArgs,
}

pub struct CutSkill;

#[async_trait]
impl Skill for CutSkill {
    fn name(&self) -> &str {
        "cut"
    }

    fn description(&self) -> &str {
        "Copy a line range into the clipboard, then remove it from the source file."
    }

    fn parameters(&self) -> Value {
        CopySkill.parameters()
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_cut(services, args).await)
    }
}

async fn run_cut(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: CutArgs = parse_args(args)?;
    let args = args.copy;
    let scope = parse_scope(&args.scope)?;
    let resolved = check_path(services, "cut", &args.source_path, true, false)?;

    let (lines, (start, end), warning) = do_copy(services, &args, "cut").await?;

    let raw = read_text(&resolved)?;
    let (_normalized, ending) = normalize_to_lf(&raw);

    let mut remaining: Vec<String> = Vec::with_capacity(lines.len());
    remaining.extend(lines[..start.saturating_sub(1)].iter().cloned());
    remaining.extend(lines[end..].iter().cloned());

    let mut new_text = remaining.join("\n");
    if !remaining.is_empty() {
        new_text.push('\n');
    }

    if let Err(write_err) = write_atomic(&resolved, &new_text, ending) {
        // Best-effort rollback of the clipboard entry just created.
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        let _ = clipboard.delete(&args.key, scope);
        return Err(write_err);
    }

    let mut result = SkillResult::ok(json!({
        "key": args.key,
        "scope": args.scope,
        "source_lines": format!("{start}-{end}"),
        "path": resolved.display().to_string(),
    }));
    if !warning.is_empty() {
        result.warnings.push(warning);
    }
    Ok(result)
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum InsertionModeArg {
    AfterLine,
    BeforeLine,
    ReplaceLines,
    AtMarkerReplace,
    AtMarkerAfter,
    AtMarkerBefore,
    Append,
    Prepend,
}

#[derive(Deserialize)]
struct PasteArgs {
    key: String,
    target: PathBuf,
    mode: InsertionModeArg,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    line_number: Option<usize>,
    #[serde(default)]
    start_line: Option<usize>,
    #[serde(default)]
    end_line: Option<usize>,
    #[serde(default)]
    marker: Option<String>,
    #[serde(default)]
    create_if_missing: bool,
}

pub struct PasteSkill;

#[async_trait]
impl Skill for PasteSkill {
    fn name(&self) -> &str {
        "paste"
    }

    fn description(&self) -> &str {
        "Insert a clipboard entry's content into a target file at a line, marker, or file boundary."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string"},
                "target": {"type": "string"},
                "mode": {"type": "string", "enum": [
                    "after_line", "before_line", "replace_lines",
                    "at_marker_replace", "at_marker_after", "at_marker_before",
                    "append", "prepend"
                ]},
                "scope": {"type": "string", "enum": ["agent", "project", "system"]},
                "line_number": {"type": "integer", "minimum": 1},
                "start_line": {"type": "integer", "minimum": 1},
                "end_line": {"type": "integer", "minimum": 1},
                "marker": {"type": "string"},
                "create_if_missing": {"type": "boolean", "default": false}
            },
            "required": ["key", "target", "mode"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_paste(services, args).await)
    }
}

async fn run_paste(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: PasteArgs = parse_args(args)?;
    let scope = args.scope.as_deref().map(parse_scope).transpose()?;

    let entry = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        clipboard.get(&args.key, scope)?
    };
    let entry = entry.ok_or_else(|| SkillError::not_found(format!("clipboard key not found: {}", args.key)))?;
    if entry.is_expired() {
        return Err(SkillError::not_found(format!("clipboard key '{}' has expired", args.key)));
    }

    match args.mode {
        InsertionModeArg::AfterLine | InsertionModeArg::BeforeLine => {
            if args.line_number.unwrap_or(0) < 1 {
                return Err(SkillError::validation("line_number must be >= 1 for this mode"));
            }
        }
        InsertionModeArg::ReplaceLines => {
            let start = args.start_line.unwrap_or(0);
            let end = args.end_line.unwrap_or(0);
            if end < start {
                return Err(SkillError::validation("end_line must be >= start_line"));
            }
        }
        InsertionModeArg::AtMarkerReplace | InsertionModeArg::AtMarkerAfter | InsertionModeArg::AtMarkerBefore => {
            if args.marker.as_deref().unwrap_or("").is_empty() {
                return Err(SkillError::validation("marker must be non-empty for this mode"));
            }
        }
        InsertionModeArg::Append | InsertionModeArg::Prepend => {}
    }

    // must_exist is relaxed for Append/Prepend with create_if_missing.
    let allow_missing =
        args.create_if_missing && matches!(args.mode, InsertionModeArg::Append | InsertionModeArg::Prepend);
    let resolved = check_path(services, "paste", &args.target, !allow_missing, false)?;

    let (raw, ending) = if resolved.exists() {
        let raw = read_text(&resolved)?;
        let (normalized, ending) = normalize_to_lf(&raw);
        (normalized, ending)
    } else {
        (String::new(), crate::core::secure_io::LineEnding::Lf)
    };

    let mut lines: Vec<String> = if raw.is_empty() { vec![] } else { raw.lines().map(String::from).collect() };
    let total = lines.len();
    let pasted: Vec<String> = entry.content.lines().map(String::from).collect();

    match args.mode {
        InsertionModeArg::Append => {
            lines.extend(pasted);
        }
        InsertionModeArg::Prepend => {
            let mut new_lines = pasted;
            new_lines.extend(lines);
            lines = new_lines;
        }
        InsertionModeArg::AfterLine => {
            let n = args.line_number.unwrap();
            if n > total {
                return Err(SkillError::validation(format!("line_number {n} exceeds file length {total}")));
            }
            lines.splice(n..n, pasted);
        }
        InsertionModeArg::BeforeLine => {
            let n = args.line_number.unwrap();
            if n > total + 1 {
                return Err(SkillError::validation(format!("line_number {n} exceeds file length+1 {}", total + 1)));
            }
            lines.splice(n.saturating_sub(1)..n.saturating_sub(1), pasted);
        }
        InsertionModeArg::ReplaceLines => {
            let start = args.start_line.unwrap();
            let end = args.end_line.unwrap();
            if start > total || end > total {
                return Err(SkillError::validation(format!("range {start}-{end} exceeds file length {total}")));
            }
            lines.splice(start - 1..end, pasted);
        }
        InsertionModeArg::AtMarkerReplace => {
            let marker = args.marker.as_deref().unwrap();
            let idx = lines
                .iter()
                .position(|l| l.contains(marker))
                .ok_or_else(|| SkillError::not_found(format!("marker not found: {marker}")))?;
            let replaced_line = lines[idx].replacen(marker, &entry.content, 1);
            let mut new_block: Vec<String> = replaced_line.lines().map(String::from).collect();
            if new_block.is_empty() {
                new_block.push(String::new());
            }
            lines.splice(idx..idx + 1, new_block);
        }
        InsertionModeArg::AtMarkerAfter => {
            let marker = args.marker.as_deref().unwrap();
            let idx = lines
                .iter()
                .position(|l| l.contains(marker))
                .ok_or_else(|| SkillError::not_found(format!("marker not found: {marker}")))?;
            lines.splice(idx + 1..idx + 1, pasted);
        }
        InsertionModeArg::AtMarkerBefore => {
            let marker = args.marker.as_deref().unwrap();
            let idx = lines
                .iter()
                .position(|l| l.contains(marker))
                .ok_or_else(|| SkillError::not_found(format!("marker not found: {marker}")))?;
            lines.splice(idx..idx, pasted);
        }
    }

    let mut new_text = lines.join("\n");
    if !lines.is_empty() {
        new_text.push('\n');
    }

    write_atomic(&resolved, &new_text, ending)?;

    Ok(SkillResult::ok(json!({
        "key": args.key,
        "path": resolved.display().to_string(),
        "mode": format!("{:?}", args.mode),
        "new_line_count": lines.len(),
    })))
}
