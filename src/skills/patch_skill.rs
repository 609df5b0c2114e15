//! patch (spec.md §4.9), composing the parse/validate/apply core (C4-C6).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::patch::{apply_patch, parse_unified_diff, validate_patch, ApplyMode, PatchFile};
use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::{check_path, normalize_to_lf, parse_args, read_text, write_atomic};

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum PatchMode {
    Strict,
    Tolerant,
    Fuzzy,
}

impl From<PatchMode> for ApplyMode {
    fn from(m: PatchMode) -> Self {
        match m {
            PatchMode::Strict => ApplyMode::Strict,
            PatchMode::Tolerant => ApplyMode::Tolerant,
            PatchMode::Fuzzy => ApplyMode::Fuzzy,
        }
    }
}

fn default_mode() -> PatchMode {
    PatchMode::Strict
}

#[derive(Deserialize)]
struct PatchArgs {
    target: PathBuf,
    #[serde(default)]
    diff: Option<String>,
    #[serde(default)]
    diff_file: Option<PathBuf>,
    #[serde(default = "default_mode")]
    mode: PatchMode,
    /// Falls back to `services.config.patch.fuzzy_threshold` when omitted.
    #[serde(default)]
    fuzzy_threshold: Option<f64>,
    #[serde(default)]
    dry_run: bool,
}

pub struct PatchSkill;

#[async_trait]
impl Skill for PatchSkill {
    fn name(&self) -> &str {
        "patch"
    }

    fn description(&self) -> &str {
        "Apply a unified diff to a target file, parsing, validating, and applying in strict, tolerant, or fuzzy mode."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": {"type": "string"},
                "diff": {"type": "string", "description": "inline unified diff text; exactly one of diff/diff_file required"},
                "diff_file": {"type": "string", "description": "path to a unified diff file; exactly one of diff/diff_file required"},
                "mode": {"type": "string", "enum": ["strict", "tolerant", "fuzzy"], "default": "strict"},
                "fuzzy_threshold": {"type": "number", "minimum": 0.5, "maximum": 1.0, "description": "defaults to the configured patch.fuzzy_threshold (normally 0.8) when omitted"},
                "dry_run": {"type": "boolean", "default": false}
            },
            "required": ["target"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_patch(services, args).await)
    }
}

fn basename(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}

/// Select the `PatchFile` whose basename on `path()`/`old_path`/`new_path`
/// matches the target's basename (spec.md §4.9 step 2).
fn select_patch_file<'a>(files: &'a [PatchFile], target_basename: &str) -> Option<&'a PatchFile> {
    files.iter().find(|f| {
        basename(Path::new(f.path())) == target_basename
            || basename(Path::new(&f.old_path)) == target_basename
            || basename(Path::new(&f.new_path)) == target_basename
    })
}

async fn run_patch(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: PatchArgs = parse_args(args)?;

    let diff_text = match (&args.diff, &args.diff_file) {
        (Some(_), Some(_)) => return Err(SkillError::validation("exactly one of diff/diff_file must be given")),
        (None, None) => return Err(SkillError::validation("exactly one of diff/diff_file must be given")),
        (Some(inline), None) => inline.clone(),
        (None, Some(path)) => {
            let resolved = check_path(services, "patch", path, true, false)?;
            read_text(&resolved)?
        }
    };

    let fuzzy_threshold = args.fuzzy_threshold.unwrap_or(services.config.patch.fuzzy_threshold);
    if !(0.5..=1.0).contains(&fuzzy_threshold) {
        return Err(SkillError::validation("fuzzy_threshold must be in [0.5, 1.0]"));
    }

    let target = check_path(services, "patch", &args.target, true, false)?;
    let target_basename = basename(&target);

    let files = parse_unified_diff(&diff_text);
    if files.is_empty() {
        return Err(SkillError::validation("diff contained no parseable file sections"));
    }

    let mut warnings = Vec::new();
    if files.len() > 1 {
        warnings.push(format!(
            "diff contained {} file sections; only the section matching '{}' was applied",
            files.len(),
            target_basename
        ));
    }

    let patch_file = select_patch_file(&files, &target_basename)
        .ok_or_else(|| SkillError::not_found(format!("no diff section matches target basename '{target_basename}'")))?;

    let raw = read_text(&target)?;
    let (normalized, ending) = normalize_to_lf(&raw);

    let validation = validate_patch(patch_file, &normalized);
    warnings.extend(validation.warnings.clone());

    let mode: ApplyMode = args.mode.into();

    if matches!(mode, ApplyMode::Strict) && !validation.valid {
        return Err(SkillError::validation(format!(
            "strict validation failed: {}",
            validation.errors.join("; ")
        )));
    }

    let effective_patch = validation.fixed_patch.as_ref().unwrap_or(patch_file);

    if args.dry_run {
        let result = apply_patch(&normalized, effective_patch, mode, fuzzy_threshold);
        if result.success {
            return Ok(SkillResult::ok_with_warnings(
                json!({
                    "path": target.display().to_string(),
                    "dry_run": true,
                    "message": "Dry run: patch would apply cleanly",
                }),
                warnings,
            ));
        }
        return Err(SkillError::validation(format!(
            "Dry run: patch would fail: {}",
            result.failed_hunks.iter().map(|(i, e)| format!("hunk {i}: {e}")).collect::<Vec<_>>().join("; ")
        )));
    }

    let result = apply_patch(&normalized, effective_patch, mode, fuzzy_threshold);
    if !result.success {
        return Err(SkillError::conflict(format!(
            "patch application failed: applied hunks {:?}, failed hunks {:?}",
            result.applied_hunks,
            result.failed_hunks.iter().map(|(i, e)| format!("{i}: {e}")).collect::<Vec<_>>()
        )));
    }
    warnings.extend(result.warnings.clone());

    write_atomic(&target, &result.new_content, ending)?;

    Ok(SkillResult::ok_with_warnings(
        json!({
            "path": target.display().to_string(),
            "applied_hunks": result.applied_hunks.len(),
        }),
        warnings,
    ))
}
