//! edit_lines and regex_replace (spec.md §4.10).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::{check_path, normalize_to_lf, parse_args, read_text, write_atomic};

/// Wall-clock budget for a single substitution pass, guarding against
/// catastrophic backtracking on hostile patterns.
const REGEX_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct EditLinesArgs {
    path: PathBuf,
    start: usize,
    #[serde(default)]
    end: Option<usize>,
    new_content: String,
}

pub struct EditLinesSkill;

#[async_trait]
impl Skill for EditLinesSkill {
    fn name(&self) -> &str {
        "edit_lines"
    }

    fn description(&self) -> &str {
        "Replace an inclusive 1-based line range with new content, preserving the file's original line ending."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "start": {"type": "integer", "minimum": 1},
                "end": {"type": "integer", "minimum": 1},
                "new_content": {"type": "string"}
            },
            "required": ["path", "start", "new_content"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_edit_lines(services, args).await)
    }
}

async fn run_edit_lines(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: EditLinesArgs = parse_args(args)?;
    let resolved = check_path(services, "edit_lines", &args.path, true, false)?;

    let raw = read_text(&resolved)?;
    let (normalized, ending) = normalize_to_lf(&raw);
    let lines: Vec<&str> = if normalized.is_empty() { vec![] } else { normalized.lines().collect() };
    let total = lines.len();

    let end = args.end.unwrap_or(args.start);
    if args.start < 1 {
        return Err(SkillError::validation("start must be >= 1"));
    }
    if end < args.start {
        return Err(SkillError::validation("end must be >= start"));
    }
    if args.start > total || end > total {
        return Err(SkillError::validation(format!("range {}-{} exceeds file length {}", args.start, end, total)));
    }

    let mut result: Vec<&str> = Vec::with_capacity(total);
    result.extend(&lines[..args.start - 1]);
    let new_lines: Vec<&str> = args.new_content.lines().collect();
    result.extend(new_lines.iter().copied());
    result.extend(&lines[end..]);

    let mut new_text = result.join("\n");
    if normalized.ends_with('\n') || normalized.is_empty() {
        new_text.push('\n');
    }

    write_atomic(&resolved, &new_text, ending)?;

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "replaced_range": [args.start, end],
        "new_line_count": result.len(),
    })))
}

#[derive(Deserialize)]
struct RegexReplaceArgs {
    path: PathBuf,
    pattern: String,
    replacement: String,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    case_insensitive: bool,
    #[serde(default)]
    multiline: bool,
    #[serde(default)]
    dry_run: bool,
}

pub struct RegexReplaceSkill;

#[async_trait]
impl Skill for RegexReplaceSkill {
    fn name(&self) -> &str {
        "regex_replace"
    }

    fn description(&self) -> &str {
        "Regex-substitute within a file, honoring a replacement cap and a wall-clock deadline."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "pattern": {"type": "string"},
                "replacement": {"type": "string"},
                "count": {"type": "integer", "minimum": 0, "default": 0, "description": "0 means unlimited, capped at 10000"},
                "case_insensitive": {"type": "boolean", "default": false},
                "multiline": {"type": "boolean", "default": false},
                "dry_run": {"type": "boolean", "default": false}
            },
            "required": ["path", "pattern", "replacement"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_regex_replace(services, args).await)
    }
}

async fn run_regex_replace(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: RegexReplaceArgs = parse_args(args)?;
    let resolved = check_path(services, "regex_replace", &args.path, true, false)?;

    let pattern = format!(
        "(?{}{}){}",
        if args.case_insensitive { "i" } else { "" },
        if args.multiline { "m" } else { "" },
        args.pattern
    );
    let re = Regex::new(&pattern).map_err(|e| SkillError::validation(format!("invalid pattern: {e}")))?;

    let raw = read_text(&resolved)?;
    let (normalized, ending) = normalize_to_lf(&raw);

    let max_replacements = services.config.skills.max_regex_replacements;
    let deadline = Instant::now();
    let total_matches = re.find_iter(&normalized).take(max_replacements + 1).count();
    if deadline.elapsed() > REGEX_DEADLINE {
        return Err(SkillError::subprocess("regex_replace exceeded its wall-clock deadline"));
    }
    if args.count == 0 && total_matches > max_replacements {
        return Err(SkillError::size(format!(
            "{total_matches}+ replacements exceeds the default cap of {max_replacements}; pass an explicit count to override"
        )));
    }

    let limit = if args.count > 0 { args.count } else { total_matches };
    let mut replaced = 0usize;
    let new_text = re.replacen(&normalized, limit, |caps: &regex::Captures| {
        replaced += 1;
        expand_backreferences(&args.replacement, caps)
    });

    if deadline.elapsed() > REGEX_DEADLINE {
        return Err(SkillError::subprocess("regex_replace exceeded its wall-clock deadline"));
    }

    if args.dry_run {
        return Ok(SkillResult::ok(json!({
            "path": resolved.display().to_string(),
            "replacements": replaced,
            "dry_run": true,
        })));
    }

    write_atomic(&resolved, &new_text, ending)?;

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "replacements": replaced,
    })))
}

/// Expand `$1`/`${name}`-style backreferences against a capture, falling
/// back to the literal template on a malformed reference (mirrors `regex`'s
/// own expansion rules).
fn expand_backreferences(template: &str, caps: &regex::Captures) -> String {
    let mut out = String::new();
    caps.expand(template, &mut out);
    out
}
