//! Patch application with configurable strictness (C6). Ported from
//! `patch/applier.py`: strict/tolerant exact-position matching, fuzzy
//! windowed search using a similarity ratio, atomic whole-patch rollback
//! on first hunk failure.

use similar::TextDiff;

use super::types::{Hunk, PatchFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Exact context/removal match required.
    Strict,
    /// Allow trailing-whitespace differences in context/removal lines.
    Tolerant,
    /// Fall back to a windowed similarity search when the exact position fails.
    Fuzzy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub success: bool,
    pub new_content: String,
    pub applied_hunks: Vec<usize>,
    pub failed_hunks: Vec<(usize, String)>,
    pub warnings: Vec<String>,
}

fn normalize_line(line: &str) -> &str {
    line.trim_end()
}

fn lines_match(a: &str, b: &str, mode: ApplyMode) -> bool {
    match mode {
        ApplyMode::Strict => a == b,
        ApplyMode::Tolerant | ApplyMode::Fuzzy => normalize_line(a) == normalize_line(b),
    }
}

fn similarity_ratio(a: &str, b: &str) -> f64 {
    TextDiff::from_lines(a, b).ratio() as f64
}

/// Search a ±50-line window around `start_hint` for the best fuzzy match of
/// `hunk_context`. Returns `(position, ratio)` if the best ratio clears
/// `threshold`.
fn find_fuzzy_match(
    lines: &[&str],
    hunk_context: &[String],
    start_hint: usize,
    threshold: f64,
) -> Option<(usize, f64)> {
    if hunk_context.is_empty() {
        return Some((start_hint, 1.0));
    }

    let hunk_text = hunk_context.join("\n");
    let mut best_pos: Option<usize> = None;
    let mut best_ratio = 0.0_f64;

    let search_start = start_hint.saturating_sub(50);
    let search_end = (start_hint + hunk_context.len() + 50).min(lines.len());
    if search_end < hunk_context.len() {
        return None;
    }
    let last_start = search_end - hunk_context.len();

    for pos in search_start..=last_start {
        let window = &lines[pos..pos + hunk_context.len()];
        let window_text = window.join("\n");
        let ratio = similarity_ratio(&hunk_text, &window_text);
        if ratio > best_ratio {
            best_ratio = ratio;
            best_pos = Some(pos);
        }
    }

    if best_ratio >= threshold { best_pos.map(|p| (p, best_ratio)) } else { None }
}

fn verify_match(lines: &[&str], expected: &[String], pos: usize, mode: ApplyMode) -> bool {
    if pos + expected.len() > lines.len() {
        return false;
    }
    expected.iter().enumerate().all(|(i, exp)| lines_match(lines[pos + i], exp, mode))
}

/// Build the replacement section for a hunk applied at `pos`, returning the
/// new line vector plus counts of additions/removals performed.
fn perform_replacement(lines: &[&str], hunk: &Hunk, pos: usize) -> (Vec<String>, usize, usize) {
    let mut new_section = Vec::new();
    let mut file_idx = pos;
    let mut additions = 0;
    let mut removals = 0;

    for (prefix, content) in &hunk.lines {
        match prefix {
            ' ' => {
                if file_idx < lines.len() {
                    new_section.push(lines[file_idx].to_string());
                } else {
                    new_section.push(content.clone());
                }
                file_idx += 1;
            }
            '-' => {
                file_idx += 1;
                removals += 1;
            }
            '+' => {
                new_section.push(content.clone());
                additions += 1;
            }
            _ => {}
        }
    }

    let original_span = hunk.old_count;
    let mut result: Vec<String> = lines[..pos].iter().map(|s| s.to_string()).collect();
    result.extend(new_section);
    let tail_start = (pos + original_span).min(lines.len());
    result.extend(lines[tail_start..].iter().map(|s| s.to_string()));

    (result, additions, removals)
}

/// Apply a single hunk. Returns `(new_lines, new_offset, error, warning)`;
/// on error the caller must discard `new_lines` and roll back the whole patch.
fn apply_hunk(
    lines: &[String],
    hunk: &Hunk,
    offset: i64,
    mode: ApplyMode,
    fuzzy_threshold: f64,
) -> (Vec<String>, i64, Option<String>, Option<String>) {
    let target_pos = hunk.old_start as i64 - 1 + offset;

    let context_and_removals: Vec<String> = hunk
        .lines
        .iter()
        .filter(|(p, _)| *p == ' ' || *p == '-')
        .map(|(_, c)| c.clone())
        .collect();

    if hunk.old_start == 0 && hunk.old_count == 0 {
        let additions: Vec<String> = hunk.lines.iter().filter(|(p, _)| *p == '+').map(|(_, c)| c.clone()).collect();
        let new_offset = offset + additions.len() as i64;
        let mut result = additions;
        result.extend(lines.iter().cloned());
        return (result, new_offset, None, None);
    }

    if target_pos < 0 {
        return (lines.to_vec(), offset, Some(format!("context mismatch at line {}", target_pos + 1)), None);
    }
    let target_pos = target_pos as usize;

    let borrowed: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let mut match_pos = target_pos;
    let mut fuzzy_warning = None;

    match mode {
        ApplyMode::Strict | ApplyMode::Tolerant => {
            if !verify_match(&borrowed, &context_and_removals, target_pos, mode) {
                return (lines.to_vec(), offset, Some(format!("context mismatch at line {}", target_pos + 1)), None);
            }
        }
        ApplyMode::Fuzzy => {
            let Some((pos, similarity)) = find_fuzzy_match(&borrowed, &context_and_removals, target_pos, fuzzy_threshold)
            else {
                return (
                    lines.to_vec(),
                    offset,
                    Some(format!("no fuzzy match found (threshold {fuzzy_threshold})")),
                    None,
                );
            };
            match_pos = pos;
            if match_pos != target_pos {
                fuzzy_warning = Some(format!("fuzzy match ({:.0}% similarity at line {})", similarity * 100.0, match_pos + 1));
            }
        }
    }

    let (result_lines, additions, removals) = perform_replacement(&borrowed, hunk, match_pos);
    let new_offset = offset + additions as i64 - removals as i64;
    (result_lines, new_offset, None, fuzzy_warning)
}

/// Apply `patch` to `content`. On any hunk failure, rolls back atomically
/// and returns the original content with `success: false`.
pub fn apply_patch(content: &str, patch: &PatchFile, mode: ApplyMode, fuzzy_threshold: f64) -> ApplyResult {
    let lines: Vec<String> = if content.is_empty() { vec![] } else { content.lines().map(String::from).collect() };

    if patch.hunks.is_empty() {
        return ApplyResult { success: true, new_content: content.to_string(), ..Default::default() };
    }

    let mut applied_hunks = Vec::new();
    let mut warnings = Vec::new();
    let mut current_lines = lines;
    let mut offset: i64 = 0;

    for (i, hunk) in patch.hunks.iter().enumerate() {
        let (new_lines, new_offset, error, warning) = apply_hunk(&current_lines, hunk, offset, mode, fuzzy_threshold);

        if let Some(err) = error {
            return ApplyResult {
                success: false,
                new_content: content.to_string(),
                applied_hunks,
                failed_hunks: vec![(i, err)],
                warnings,
            };
        }

        if let Some(w) = warning {
            warnings.push(format!("Hunk {} applied via {}", i + 1, w));
        }

        current_lines = new_lines;
        offset = new_offset;
        applied_hunks.push(i);
    }

    let new_content = if current_lines.is_empty() {
        String::new()
    } else {
        let mut joined = current_lines.join("\n");
        if content.ends_with('\n') {
            joined.push('\n');
        }
        joined
    };

    ApplyResult { success: true, new_content, applied_hunks, failed_hunks: vec![], warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk(old_start: usize, old_count: usize, new_start: usize, new_count: usize, lines: Vec<(char, &str)>) -> Hunk {
        Hunk {
            old_start,
            old_count,
            new_start,
            new_count,
            lines: lines.into_iter().map(|(p, s)| (p, s.to_string())).collect(),
            context: String::new(),
        }
    }

    fn patch(hunks: Vec<Hunk>) -> PatchFile {
        PatchFile { old_path: "f.py".into(), new_path: "f.py".into(), hunks, is_new_file: false, is_deleted: false }
    }

    #[test]
    fn strict_apply_simple_replacement() {
        let p = patch(vec![hunk(1, 2, 1, 2, vec![(' ', "line1"), ('-', "line2"), ('+', "new_line")])]);
        let result = apply_patch("line1\nline2\n", &p, ApplyMode::Strict, 0.8);
        assert!(result.success);
        assert_eq!(result.new_content, "line1\nnew_line\n");
    }

    #[test]
    fn strict_fails_on_context_mismatch_and_rolls_back() {
        let p = patch(vec![hunk(1, 1, 1, 1, vec![(' ', "wrong")])]);
        let original = "actual\n";
        let result = apply_patch(original, &p, ApplyMode::Strict, 0.8);
        assert!(!result.success);
        assert_eq!(result.new_content, original);
        assert_eq!(result.failed_hunks.len(), 1);
    }

    #[test]
    fn tolerant_allows_trailing_whitespace_difference() {
        let p = patch(vec![hunk(1, 1, 1, 1, vec![(' ', "line"), ('+', "added")])]);
        let result = apply_patch("line   \n", &p, ApplyMode::Tolerant, 0.8);
        assert!(result.success);
    }

    #[test]
    fn new_file_hunk_prepends_additions() {
        let p = patch(vec![hunk(0, 0, 1, 2, vec![('+', "a"), ('+', "b")])]);
        let result = apply_patch("", &p, ApplyMode::Strict, 0.8);
        assert!(result.success);
        assert_eq!(result.new_content, "a\nb");
    }

    #[test]
    fn fuzzy_finds_shifted_context() {
        let content = "pad1\npad2\npad3\nfoo\nbar\n";
        let p = patch(vec![hunk(1, 2, 1, 2, vec![(' ', "foo"), ('-', "bar"), ('+', "baz")])]);
        let result = apply_patch(content, &p, ApplyMode::Fuzzy, 0.8);
        assert!(result.success);
        assert!(result.new_content.contains("baz"));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn no_hunks_is_a_noop_success() {
        let p = patch(vec![]);
        let result = apply_patch("unchanged\n", &p, ApplyMode::Strict, 0.8);
        assert!(result.success);
        assert_eq!(result.new_content, "unchanged\n");
    }

    #[test]
    fn preserves_no_trailing_newline() {
        let p = patch(vec![hunk(1, 1, 1, 1, vec![('-', "only"), ('+', "replaced")])]);
        let result = apply_patch("only", &p, ApplyMode::Strict, 0.8);
        assert!(result.success);
        assert_eq!(result.new_content, "replaced");
    }
}
