//! read_file, tail, grep, glob (spec.md §4.10). Bounded-memory streaming
//! reads and a sandboxed, C2-re-checked glob.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use async_trait::async_trait;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::{check_path, parse_args};

/// Per-file read cap: files larger than this are rejected outright (spec.md §9).
pub const READ_CAP_BYTES: u64 = 10 * 1024 * 1024;
/// Per-file cap for grep candidates, tracked separately from the read cap.
pub const GREP_CAP_BYTES: u64 = 10 * 1024 * 1024;
/// Cap on bytes written into a skill's textual output.
pub const OUTPUT_CAP_BYTES: usize = 1024 * 1024;
/// Default line limit for a read with no explicit `limit`.
pub const DEFAULT_LINE_LIMIT: usize = 10_000;

fn cap_output(mut s: String) -> (String, bool) {
    if s.len() > OUTPUT_CAP_BYTES {
        s.truncate(OUTPUT_CAP_BYTES);
        (s, true)
    } else {
        (s, false)
    }
}

#[derive(Deserialize)]
struct ReadFileArgs {
    path: PathBuf,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

pub struct ReadFileSkill;

#[async_trait]
impl Skill for ReadFileSkill {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's lines, honoring an offset and limit, with numbered output when either is set."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer", "minimum": 1},
                "limit": {"type": "integer", "minimum": 1}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_read_file(services, args).await)
    }
}

async fn run_read_file(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ReadFileArgs = parse_args(args)?;
    if let Some(o) = args.offset {
        if o < 1 {
            return Err(SkillError::validation("offset must be >= 1"));
        }
    }

    let resolved = check_path(services, "read_file", &args.path, true, false)?;
    let metadata = tokio::fs::metadata(&resolved).await?;
    let read_cap = services.config.skills.read_cap_bytes;
    if metadata.len() > read_cap {
        return Err(SkillError::size(format!(
            "file is {} bytes, exceeding the {}-byte read cap",
            metadata.len(),
            read_cap
        )));
    }

    let numbered = args.offset.is_some() || args.limit.is_some();
    let offset = args.offset.unwrap_or(1);
    let limit = args.limit.unwrap_or(DEFAULT_LINE_LIMIT);

    let resolved_for_blocking = resolved.clone();
    let (lines, total_read) = tokio::task::spawn_blocking(move || -> std::io::Result<(Vec<String>, usize)> {
        let file = std::fs::File::open(&resolved_for_blocking)?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut count = 0usize;
        for (i, line) in reader.lines().enumerate() {
            let lineno = i + 1;
            if lineno < offset {
                continue;
            }
            if count >= limit {
                break;
            }
            lines.push(line?);
            count += 1;
        }
        Ok((lines, count))
    })
    .await
    .map_err(|e| SkillError::io(e.to_string()))??;

    let body = if numbered {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| format!("{:>6}\t{}", offset + i, l))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        lines.join("\n")
    };
    let (body, truncated) = cap_output(body);

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "content": body,
        "lines_read": total_read,
        "output_truncated": truncated,
    })))
}

#[derive(Deserialize)]
struct TailArgs {
    path: PathBuf,
    #[serde(default = "default_tail_lines")]
    lines: usize,
}

fn default_tail_lines() -> usize {
    10
}

pub struct TailSkill;

#[async_trait]
impl Skill for TailSkill {
    fn name(&self) -> &str {
        "tail"
    }

    fn description(&self) -> &str {
        "Return the last N lines of a file using a bounded-memory ring buffer."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "lines": {"type": "integer", "minimum": 1, "default": 10}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_tail(services, args).await)
    }
}

async fn run_tail(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: TailArgs = parse_args(args)?;
    let resolved = check_path(services, "tail", &args.path, true, false)?;
    let metadata = tokio::fs::metadata(&resolved).await?;
    let read_cap = services.config.skills.read_cap_bytes;
    if metadata.len() > read_cap {
        return Err(SkillError::size(format!("file exceeds the {}-byte read cap", read_cap)));
    }

    let n = args.lines;
    let resolved_for_blocking = resolved.clone();
    let ring = tokio::task::spawn_blocking(move || -> std::io::Result<VecDeque<String>> {
        let file = std::fs::File::open(&resolved_for_blocking)?;
        let reader = BufReader::new(file);
        let mut ring: VecDeque<String> = VecDeque::with_capacity(n);
        for line in reader.lines() {
            let line = line?;
            if ring.len() == n {
                ring.pop_front();
            }
            ring.push_back(line);
        }
        Ok(ring)
    })
    .await
    .map_err(|e| SkillError::io(e.to_string()))??;

    let body = ring.into_iter().collect::<Vec<_>>().join("\n");
    let (body, truncated) = cap_output(body);

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "content": body,
        "output_truncated": truncated,
    })))
}

#[derive(Deserialize)]
struct GrepArgs {
    pattern: String,
    path: PathBuf,
    #[serde(default = "default_max_matches")]
    max_matches: usize,
    #[serde(default)]
    context: usize,
}

fn default_max_matches() -> usize {
    1000
}

pub struct GrepSkill;

#[async_trait]
impl Skill for GrepSkill {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Stream-search a file for a regex pattern, with a bounded match count and optional context window."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string"},
                "max_matches": {"type": "integer", "minimum": 1, "default": 1000},
                "context": {"type": "integer", "minimum": 0, "default": 0}
            },
            "required": ["pattern", "path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_grep(services, args).await)
    }
}

async fn run_grep(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: GrepArgs = parse_args(args)?;
    let resolved = check_path(services, "grep", &args.path, true, false)?;
    let metadata = tokio::fs::metadata(&resolved).await?;
    let grep_cap = services.config.skills.grep_cap_bytes;
    if metadata.len() > grep_cap {
        return Err(SkillError::size(format!("file exceeds the {}-byte grep cap", grep_cap)));
    }

    let matcher = grep_regex::RegexMatcher::new(&args.pattern).map_err(|e| SkillError::validation(e.to_string()))?;

    let resolved_for_blocking = resolved.clone();
    let max_matches = args.max_matches;
    let context = args.context;
    let matches = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<Value>> {
        let content = std::fs::read_to_string(&resolved_for_blocking)?;
        let lines: Vec<&str> = content.lines().collect();
        let mut matched_lines: Vec<u64> = Vec::new();

        grep_searcher::Searcher::new()
            .search_slice(
                &matcher,
                content.as_bytes(),
                grep_searcher::sinks::UTF8(|line_number, _line| {
                    matched_lines.push(line_number);
                    Ok(matched_lines.len() < max_matches)
                }),
            )
            .map_err(std::io::Error::other)?;

        let mut out = Vec::with_capacity(matched_lines.len());
        for line_number in matched_lines {
            let i = (line_number - 1) as usize;
            let Some(line) = lines.get(i) else { continue };
            let start = i.saturating_sub(context);
            let end = (i + context + 1).min(lines.len());
            out.push(json!({
                "line_number": line_number,
                "line": line,
                "context_before": lines[start..i],
                "context_after": lines[i + 1..end],
            }));
        }
        Ok(out)
    })
    .await
    .map_err(|e| SkillError::io(e.to_string()))??;

    Ok(SkillResult::ok(json!({
        "path": resolved.display().to_string(),
        "match_count": matches.len(),
        "matches": matches,
    })))
}

#[derive(Deserialize)]
struct GlobArgs {
    pattern: String,
    #[serde(default)]
    base: Option<PathBuf>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default = "default_max_results")]
    max_results: usize,
}

fn default_max_results() -> usize {
    1000
}

pub struct GlobSkill;

#[async_trait]
impl Skill for GlobSkill {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Walk a gitignore-aware file tree under base matching pattern, re-checking every candidate against the path policy."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "base": {"type": "string"},
                "exclude": {"type": "array", "items": {"type": "string"}},
                "max_results": {"type": "integer", "minimum": 1, "default": 1000}
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_glob(services, args).await)
    }
}

async fn run_glob(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: GlobArgs = parse_args(args)?;
    let base = args.base.clone().unwrap_or_else(|| services.cwd.clone());
    let base_resolved = check_path(services, "glob", &base, true, true)?;

    let glob = globset::Glob::new(&args.pattern).map_err(|e| SkillError::validation(e.to_string()))?.compile_matcher();
    let engine = services.path_engine_for("glob");

    let base_for_blocking = base_resolved.clone();
    let exclude = args.exclude.clone();
    let candidates = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, SkillError> {
        let walker = crate::infra::walk::FileWalker::new(&exclude).map_err(|e| SkillError::validation(e.to_string()))?;
        Ok(walker.walk_files(&base_for_blocking))
    })
    .await
    .map_err(|e| SkillError::io(e.to_string()))??;

    let matched: Vec<PathBuf> = candidates
        .into_par_iter()
        .filter(|p| {
            let rel = p.strip_prefix(&base_resolved).unwrap_or(p);
            glob.is_match(rel)
        })
        .collect();

    // Re-check every candidate through C2 before inclusion, per spec.md §4.10.
    let mut results: Vec<String> = matched
        .into_iter()
        .filter(|p| engine.check_access(p, true, false).allowed)
        .map(|p| p.display().to_string())
        .collect();
    results.sort();
    let truncated = results.len() > args.max_results;
    results.truncate(args.max_results);

    Ok(SkillResult::ok(json!({
        "base": base_resolved.display().to_string(),
        "matches": results,
        "truncated": truncated,
    })))
}
