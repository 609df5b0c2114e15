//! Patch validation against target file content (C5). Ported from
//! `patch/validator.py`: recompute hunk counts, check context/removal lines
//! against the real file, auto-fix header mismatches and trailing
//! whitespace, leave hard mismatches as errors.

use std::collections::HashMap;

use super::types::{Hunk, PatchFile};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub fixed_patch: Option<PatchFile>,
}

fn normalize_line(line: &str) -> &str {
    line.trim_end()
}

fn file_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return vec![];
    }
    content.lines().collect()
}

/// Recompute counts from the hunk's line list; `None` if the header already matched.
fn validate_hunk_counts(hunk: &Hunk) -> (bool, Option<String>, Option<Hunk>) {
    let (actual_old, actual_new) = hunk.compute_counts();
    if actual_old == hunk.old_count && actual_new == hunk.new_count {
        return (true, None, None);
    }

    let fixed = hunk.with_recomputed_counts();
    let msg = format!(
        "Hunk at line {}: line count mismatch. Header claims -{},+{} but actual is -{},+{}",
        hunk.old_start, hunk.old_count, hunk.new_count, actual_old, actual_new
    );
    (false, Some(msg), Some(fixed))
}

fn validate_context_lines(hunk: &Hunk, lines: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut file_line_idx = hunk.old_start.saturating_sub(1);

    for (prefix, patch_line) in &hunk.lines {
        if *prefix == '+' {
            continue;
        }

        if file_line_idx >= lines.len() {
            errors.push(format!(
                "Hunk at line {}: references line {} but file only has {} lines",
                hunk.old_start,
                file_line_idx + 1,
                lines.len()
            ));
            file_line_idx += 1;
            continue;
        }

        let file_line = lines[file_line_idx];
        let patch_normalized = normalize_line(patch_line);
        let file_normalized = normalize_line(file_line);

        if patch_normalized != file_normalized {
            if *prefix == ' ' {
                errors.push(format!(
                    "Context mismatch at line {}: expected {:?} but found {:?}",
                    file_line_idx + 1,
                    patch_line,
                    file_line
                ));
            } else {
                errors.push(format!(
                    "Removal mismatch at line {}: expected {:?} but found {:?}",
                    file_line_idx + 1,
                    patch_line,
                    file_line
                ));
            }
        } else if patch_line != file_line {
            warnings.push(format!(
                "Whitespace difference at line {}: trailing whitespace differs",
                file_line_idx + 1
            ));
        }

        file_line_idx += 1;
    }

    (errors, warnings)
}

fn fix_trailing_whitespace(hunk: &Hunk, lines: &[&str]) -> Hunk {
    let mut file_line_idx = hunk.old_start.saturating_sub(1);
    let mut new_lines = Vec::with_capacity(hunk.lines.len());

    for (prefix, patch_line) in &hunk.lines {
        if *prefix == '+' {
            new_lines.push((*prefix, patch_line.clone()));
            continue;
        }

        if file_line_idx < lines.len() {
            let file_line = lines[file_line_idx];
            if normalize_line(patch_line) == normalize_line(file_line) {
                new_lines.push((*prefix, file_line.to_string()));
            } else {
                new_lines.push((*prefix, patch_line.clone()));
            }
        } else {
            new_lines.push((*prefix, patch_line.clone()));
        }
        file_line_idx += 1;
    }

    Hunk { lines: new_lines, ..hunk.clone() }
}

/// Validate `patch` against `target_content`. Recomputes mismatched hunk
/// headers and normalizes whitespace-only differences into a `fixed_patch`
/// when no hard errors remain; hard context/removal mismatches stay errors.
pub fn validate_patch(patch: &PatchFile, target_content: &str) -> ValidationResult {
    let mut all_errors = Vec::new();
    let mut all_warnings = Vec::new();
    let lines = file_lines(target_content);

    let mut needs_fix = false;
    let mut fixed_hunks = Vec::with_capacity(patch.hunks.len());

    for hunk in &patch.hunks {
        let (count_valid, count_error, fixed_hunk) = validate_hunk_counts(hunk);
        let mut current_hunk = if !count_valid {
            all_warnings.push(count_error.unwrap_or_else(|| "Line count mismatch".to_string()));
            needs_fix = true;
            fixed_hunk.unwrap_or_else(|| hunk.clone())
        } else {
            hunk.clone()
        };

        let (context_errors, context_warnings) = validate_context_lines(&current_hunk, &lines);
        let has_errors = !context_errors.is_empty();
        all_errors.extend(context_errors);
        all_warnings.extend(context_warnings.clone());

        if !context_warnings.is_empty() && !has_errors {
            current_hunk = fix_trailing_whitespace(&current_hunk, &lines);
            needs_fix = true;
        }

        fixed_hunks.push(current_hunk);
    }

    let fixed_patch = if needs_fix && all_errors.is_empty() {
        Some(PatchFile {
            old_path: patch.old_path.clone(),
            new_path: patch.new_path.clone(),
            hunks: fixed_hunks,
            is_new_file: patch.is_new_file,
            is_deleted: patch.is_deleted,
        })
    } else {
        None
    };

    ValidationResult { valid: all_errors.is_empty(), errors: all_errors, warnings: all_warnings, fixed_patch }
}

/// Validate each patch against its target's content, obtained via `get_content`.
/// `get_content` returning `Err` is treated as "target file not found" unless
/// the patch is marked `is_new_file`.
pub fn validate_patch_set<F>(patches: &[PatchFile], mut get_content: F) -> HashMap<String, ValidationResult>
where
    F: FnMut(&str) -> Result<String, std::io::Error>,
{
    let mut results = HashMap::new();

    for patch in patches {
        let path = patch.path().to_string();
        if patch.is_new_file {
            results.insert(path, ValidationResult { valid: true, ..Default::default() });
            continue;
        }

        match get_content(patch.path()) {
            Ok(content) => {
                results.insert(path.clone(), validate_patch(patch, &content));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                results.insert(
                    path.clone(),
                    ValidationResult {
                        valid: false,
                        errors: vec![format!("Target file not found: {}", path)],
                        warnings: vec![],
                        fixed_patch: None,
                    },
                );
            }
            Err(e) => {
                results.insert(
                    path.clone(),
                    ValidationResult {
                        valid: false,
                        errors: vec![format!("Target file not found: {} ({})", path, e)],
                        warnings: vec![],
                        fixed_patch: None,
                    },
                );
            }
        }
    }

    results
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

    #[test]
    fn valid_patch_matches_content() {
        let patch = PatchFile {
            old_path: "test.py".into(),
            new_path: "test.py".into(),
            hunks: vec![hunk(1, 2, 1, 3, vec![(' ', "line1"), ('-', "line2"), ('+', "new1"), ('+', "new2")])],
            is_new_file: false,
            is_deleted: false,
        };
        let result = validate_patch(&patch, "line1\nline2\n");
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn mismatched_count_is_warned_and_fixed() {
        let patch = PatchFile {
            old_path: "t.py".into(),
            new_path: "t.py".into(),
            hunks: vec![hunk(1, 99, 1, 99, vec![(' ', "a"), ('-', "b"), ('+', "c")])],
            is_new_file: false,
            is_deleted: false,
        };
        let result = validate_patch(&patch, "a\nb\n");
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        let fixed = result.fixed_patch.unwrap();
        assert_eq!(fixed.hunks[0].old_count, 2);
        assert_eq!(fixed.hunks[0].new_count, 2);
    }

    #[test]
    fn context_mismatch_is_hard_error() {
        let patch = PatchFile {
            old_path: "t.py".into(),
            new_path: "t.py".into(),
            hunks: vec![hunk(1, 1, 1, 1, vec![(' ', "expected")])],
            is_new_file: false,
            is_deleted: false,
        };
        let result = validate_patch(&patch, "actual\n");
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.fixed_patch.is_none());
    }

    #[test]
    fn trailing_whitespace_only_is_fixed_not_errored() {
        let patch = PatchFile {
            old_path: "t.py".into(),
            new_path: "t.py".into(),
            hunks: vec![hunk(1, 1, 1, 1, vec![(' ', "line")])],
            is_new_file: false,
            is_deleted: false,
        };
        let result = validate_patch(&patch, "line   \n");
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        let fixed = result.fixed_patch.unwrap();
        assert_eq!(fixed.hunks[0].lines[0].1, "line   ");
    }

    #[test]
    fn removal_past_end_of_file_is_error() {
        let patch = PatchFile {
            old_path: "t.py".into(),
            new_path: "t.py".into(),
            hunks: vec![hunk(5, 1, 5, 0, vec![('-', "gone")])],
            is_new_file: false,
            is_deleted: false,
        };
        let result = validate_patch(&patch, "one\n");
        assert!(!result.valid);
        assert!(result.errors[0].contains("only has"));
    }

    #[test]
    fn new_file_patch_skips_content_validation() {
        let patch = PatchFile {
            old_path: "new.py".into(),
            new_path: "new.py".into(),
            hunks: vec![],
            is_new_file: true,
            is_deleted: false,
        };
        let results = validate_patch_set(&[patch], |_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"))
        });
        assert!(results["new.py"].valid);
    }

    #[test]
    fn missing_target_file_is_reported() {
        let patch = PatchFile {
            old_path: "gone.py".into(),
            new_path: "gone.py".into(),
            hunks: vec![hunk(1, 1, 1, 1, vec![(' ', "x")])],
            is_new_file: false,
            is_deleted: false,
        };
        let results = validate_patch_set(&[patch], |_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "nope"))
        });
        assert!(!results["gone.py"].valid);
        assert!(results["gone.py"].errors[0].contains("not found"));
    }
}
