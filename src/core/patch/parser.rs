//! Parser for unified diff format (C4). Byte-level, line-oriented parse of
//! unified diff / git-extended diff text into [`PatchFile`]s. Ported from
//! `patch/parser.py`: same header grammar, same blank-context-line
//! tolerance, same malformed-header skip policy.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Hunk, PatchFile};

static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$").unwrap());
static UNIFIED_OLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--- (.+?)(?:\t.*)?$").unwrap());
static UNIFIED_NEW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\+\+ (.+?)(?:\t.*)?$").unwrap());
static GIT_DIFF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap());

fn strip_path_prefix(path: &str) -> &str {
    if let Some(rest) = path.strip_prefix("a/").or_else(|| path.strip_prefix("b/")) {
        rest
    } else {
        path
    }
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let caps = HUNK_HEADER_RE.captures(line)?;
    let old_start: usize = caps[1].parse().ok()?;
    let old_count: usize = caps.get(2).map(|m| m.as_str().parse().unwrap_or(1)).unwrap_or(1);
    let new_start: usize = caps[3].parse().ok()?;
    let new_count: usize = caps.get(4).map(|m| m.as_str().parse().unwrap_or(1)).unwrap_or(1);
    let context = caps[5].trim().to_string();
    Some(Hunk { old_start, old_count, new_start, new_count, lines: vec![], context })
}

/// Parse one file's diff section starting at `lines[start_idx]`. Returns the
/// parsed file (or `None` if the section had no identifiable path) and the
/// index to resume parsing from.
fn parse_single_file(lines: &[&str], start_idx: usize) -> (Option<PatchFile>, usize) {
    let n = lines.len();
    let mut idx = start_idx;
    if idx >= n {
        return (None, idx);
    }

    let mut old_path = String::new();
    let mut new_path = String::new();

    if lines[idx].starts_with("diff --git") {
        if let Some(caps) = GIT_DIFF_RE.captures(lines[idx]) {
            old_path = caps[1].to_string();
            new_path = caps[2].to_string();
        }
        idx += 1;
        while idx < n {
            let line = lines[idx];
            if line.starts_with("---") || line.starts_with("@@") {
                break;
            }
            idx += 1;
        }
    }

    if idx < n && lines[idx].starts_with("---") {
        if let Some(caps) = UNIFIED_OLD_RE.captures(lines[idx]) {
            old_path = strip_path_prefix(&caps[1]).to_string();
        }
        idx += 1;
    }
    if idx < n && lines[idx].starts_with("+++") {
        if let Some(caps) = UNIFIED_NEW_RE.captures(lines[idx]) {
            new_path = strip_path_prefix(&caps[1]).to_string();
        }
        idx += 1;
    }

    if old_path.is_empty() && new_path.is_empty() {
        return (None, start_idx + 1);
    }

    let is_new_file = old_path == "/dev/null";
    let is_deleted = new_path == "/dev/null";
    if is_new_file {
        old_path = new_path.clone();
    }
    if is_deleted {
        new_path = old_path.clone();
    }

    let mut patch_file = PatchFile { old_path, new_path, hunks: vec![], is_new_file, is_deleted };

    while idx < n {
        let line = lines[idx];
        let is_new_file_header = line.starts_with("---") && idx + 1 < n && lines[idx + 1].starts_with("+++");
        if line.starts_with("diff --git") || is_new_file_header {
            break;
        }

        if line.starts_with("@@") {
            let Some(mut hunk) = parse_hunk_header(line) else {
                idx += 1;
                continue;
            };
            idx += 1;

            while idx < n {
                let line = lines[idx];
                if line.starts_with("@@") || line.starts_with("diff --git") {
                    break;
                }
                if line.starts_with("---") && idx + 1 < n && lines[idx + 1].starts_with("+++") {
                    break;
                }
                if line.starts_with("\\ No newline at end of file") {
                    idx += 1;
                    continue;
                }

                if let Some(prefix) = line.chars().next().filter(|c| matches!(c, ' ' | '-' | '+')) {
                    hunk.lines.push((prefix, line[1..].to_string()));
                } else if line.is_empty() {
                    hunk.lines.push((' ', String::new()));
                }
                idx += 1;
            }

            patch_file.hunks.push(hunk);
        } else {
            idx += 1;
        }
    }

    (Some(patch_file), idx)
}

/// Parse unified diff text into structured [`PatchFile`]s. Handles standard
/// and git-extended headers, `/dev/null` new/delete markers, and LLM-style
/// omitted leading space on blank context lines. Returns an empty list if
/// `text` cannot be parsed as a diff at all.
pub fn parse_unified_diff(text: &str) -> Vec<PatchFile> {
    if text.trim().is_empty() {
        return vec![];
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut result = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        if line.is_empty() || !(line.starts_with("diff --git") || line.starts_with("---")) {
            idx += 1;
            continue;
        }

        let (patch_file, next_idx) = parse_single_file(&lines, idx);
        idx = next_idx;
        if let Some(pf) = patch_file {
            if !pf.hunks.is_empty() || pf.is_new_file || pf.is_deleted {
                result.push(pf);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_file_single_hunk() {
        let text = "--- a/file.py\n+++ b/file.py\n@@ -1,3 +1,4 @@\n context\n-removed\n+added\n more context\n";
        let files = parse_unified_diff(text);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path(), "file.py");
        assert_eq!(files[0].hunks.len(), 1);
        assert_eq!(files[0].hunks[0].lines.len(), 4);
    }

    #[test]
    fn new_file_via_dev_null() {
        let text = "--- /dev/null\n+++ b/new.py\n@@ -0,0 +1,2 @@\n+line one\n+line two\n";
        let files = parse_unified_diff(text);
        assert_eq!(files.len(), 1);
        assert!(files[0].is_new_file);
        assert_eq!(files[0].path(), "new.py");
    }

    #[test]
    fn blank_context_line_without_space_is_tolerated() {
        let text = "--- a/f.py\n+++ b/f.py\n@@ -1,3 +1,3 @@\n first\n\n last\n";
        let files = parse_unified_diff(text);
        assert_eq!(files[0].hunks[0].lines[1], (' ', String::new()));
    }

    #[test]
    fn malformed_hunk_header_is_skipped_not_fatal() {
        let text = "--- a/f.py\n+++ b/f.py\n@@ garbage @@\n@@ -1,1 +1,1 @@\n-old\n+new\n";
        let files = parse_unified_diff(text);
        assert_eq!(files[0].hunks.len(), 1);
    }

    #[test]
    fn default_counts_when_omitted() {
        let text = "--- a/f.py\n+++ b/f.py\n@@ -1 +1,2 @@\n ctx\n+added\n";
        let files = parse_unified_diff(text);
        assert_eq!(files[0].hunks[0].old_count, 1);
        assert_eq!(files[0].hunks[0].new_count, 2);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(parse_unified_diff("").is_empty());
        assert!(parse_unified_diff("   \n  ").is_empty());
    }
}
