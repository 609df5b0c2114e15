//! Path-decision engine (C2): the sole authority for whether a path may be
//! read, written, or executed. Ported from `core/path_decision.py`.

use std::path::{Path, PathBuf};

/// Closed set of reasons a [`PathDecision`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDecisionReason {
    Unrestricted,
    WithinAllowed,
    CwdDefault,
    Blocked,
    OutsideAllowed,
    NoAllowedPaths,
    ResolutionFailed,
    PathNotFound,
    NotADirectory,
}

impl PathDecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PathDecisionReason::Unrestricted => "unrestricted",
            PathDecisionReason::WithinAllowed => "within_allowed",
            PathDecisionReason::CwdDefault => "cwd_default",
            PathDecisionReason::Blocked => "blocked",
            PathDecisionReason::OutsideAllowed => "outside_allowed",
            PathDecisionReason::NoAllowedPaths => "no_allowed_paths",
            PathDecisionReason::ResolutionFailed => "resolution_failed",
            PathDecisionReason::PathNotFound => "path_not_found",
            PathDecisionReason::NotADirectory => "not_a_directory",
        }
    }
}

/// Result of asking the engine whether a path may be accessed.
///
/// Denied decisions never carry a resolved path — only the original input
/// and a reason, so a denial message cannot leak where symlinks resolved to.
#[derive(Debug, Clone)]
pub struct PathDecision {
    pub allowed: bool,
    pub resolved_path: Option<PathBuf>,
    pub reason: PathDecisionReason,
    pub reason_detail: String,
    pub original_path: PathBuf,
    pub matched_rule: Option<PathBuf>,
}

impl PathDecision {
    fn denied(original: &Path, reason: PathDecisionReason, detail: impl Into<String>) -> Self {
        Self {
            allowed: false,
            resolved_path: None,
            reason,
            reason_detail: detail.into(),
            original_path: original.to_path_buf(),
            matched_rule: None,
        }
    }

    fn allowed(
        original: &Path,
        resolved: PathBuf,
        reason: PathDecisionReason,
        detail: impl Into<String>,
        matched_rule: Option<PathBuf>,
    ) -> Self {
        Self {
            allowed: true,
            resolved_path: Some(resolved),
            reason,
            reason_detail: detail.into(),
            original_path: original.to_path_buf(),
            matched_rule,
        }
    }

    /// Convenience for call sites that want a hard error on denial.
    pub fn raise_if_denied(&self) -> Result<(), String> {
        if self.allowed {
            Ok(())
        } else {
            Err(format!(
                "Path access denied ({}): {}",
                self.reason.as_str(),
                self.reason_detail
            ))
        }
    }
}

impl std::fmt::Display for PathDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.allowed {
            write!(
                f,
                "allowed({}): {}",
                self.reason.as_str(),
                self.resolved_path.as_ref().unwrap().display()
            )
        } else {
            write!(f, "denied({}): {}", self.reason.as_str(), self.reason_detail)
        }
    }
}

/// `allowed_paths`: `None` = unrestricted, `Some(vec![])` = deny all,
/// `Some(paths)` = restrict to descendants of `paths`.
pub struct PathDecisionEngine {
    allowed_paths: Option<Vec<PathBuf>>,
    blocked_paths: Vec<PathBuf>,
    cwd: PathBuf,
}

impl PathDecisionEngine {
    pub fn new(allowed_paths: Option<Vec<PathBuf>>, blocked_paths: Vec<PathBuf>, cwd: PathBuf) -> Self {
        Self { allowed_paths, blocked_paths, cwd }
    }

    pub fn allowed_paths(&self) -> Option<&[PathBuf]> {
        self.allowed_paths.as_deref()
    }

    pub fn blocked_paths(&self) -> &[PathBuf] {
        &self.blocked_paths
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed_paths.is_none()
    }

    /// Expand `~`, join relative paths against `cwd`, canonicalize (follows
    /// symlinks), then apply deny-list, allow-list, and existence checks in
    /// that order.
    pub fn check_access(&self, path: &Path, must_exist: bool, must_be_dir: bool) -> PathDecision {
        let expanded = expand_home(path);
        let joined = if expanded.is_absolute() { expanded } else { self.cwd.join(&expanded) };

        let resolved = match joined.canonicalize() {
            Ok(p) => p,
            Err(_) => {
                // Fall back to a lexical normalization so non-existent
                // targets (e.g. a file about to be created) can still be
                // checked against allow/deny lists.
                match lexical_normalize(&joined) {
                    Some(p) => p,
                    None => {
                        return PathDecision::denied(
                            path,
                            PathDecisionReason::ResolutionFailed,
                            "path could not be resolved",
                        );
                    }
                }
            }
        };

        for blocked in &self.blocked_paths {
            let Ok(blocked_resolved) = blocked.canonicalize().or_else(|_| {
                lexical_normalize(blocked).ok_or(std::io::Error::other("unresolvable"))
            }) else {
                continue;
            };
            if is_descendant(&resolved, &blocked_resolved) {
                return PathDecision::denied(
                    path,
                    PathDecisionReason::Blocked,
                    "path is within a blocked directory",
                );
            }
        }

        let mut matched_rule = None;
        if let Some(allowed) = &self.allowed_paths {
            if allowed.is_empty() {
                return PathDecision::denied(
                    path,
                    PathDecisionReason::NoAllowedPaths,
                    "no allowed paths configured",
                );
            }
            let mut found = false;
            for candidate in allowed {
                let Ok(candidate_resolved) = candidate.canonicalize().or_else(|_| {
                    lexical_normalize(candidate).ok_or(std::io::Error::other("unresolvable"))
                }) else {
                    continue;
                };
                if is_descendant(&resolved, &candidate_resolved) {
                    found = true;
                    matched_rule = Some(candidate.clone());
                    break;
                }
            }
            if !found {
                return PathDecision::denied(
                    path,
                    PathDecisionReason::OutsideAllowed,
                    "path is outside all allowed directories",
                );
            }
        }

        if must_exist && !resolved.exists() {
            return PathDecision::denied(path, PathDecisionReason::PathNotFound, "path does not exist");
        }
        if must_be_dir && resolved.exists() && !resolved.is_dir() {
            return PathDecision::denied(path, PathDecisionReason::NotADirectory, "path exists but is not a directory");
        }

        let reason = if self.allowed_paths.is_some() {
            PathDecisionReason::WithinAllowed
        } else {
            PathDecisionReason::Unrestricted
        };
        PathDecision::allowed(path, resolved, reason, "access granted", matched_rule)
    }

    /// `check_access(path, must_exist=true, must_be_dir=true)`, with the
    /// extra rule that an empty/absent `path` succeeds immediately bearing
    /// the engine's own `cwd`.
    pub fn check_cwd(&self, path: Option<&Path>) -> PathDecision {
        match path {
            None => PathDecision::allowed(
                Path::new(""),
                self.cwd.clone(),
                PathDecisionReason::CwdDefault,
                "defaulted to engine cwd",
                None,
            ),
            Some(p) if p.as_os_str().is_empty() => PathDecision::allowed(
                p,
                self.cwd.clone(),
                PathDecisionReason::CwdDefault,
                "defaulted to engine cwd",
                None,
            ),
            Some(p) => self.check_access(p, true, true),
        }
    }

    pub fn explain_config(&self) -> String {
        match &self.allowed_paths {
            None => format!("unrestricted; cwd={}; {} blocked", self.cwd.display(), self.blocked_paths.len()),
            Some(paths) if paths.is_empty() => "deny-all (no allowed paths)".to_string(),
            Some(paths) => format!(
                "restricted to {} path(s); cwd={}; {} blocked",
                paths.len(),
                self.cwd.display(),
                self.blocked_paths.len()
            ),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&s).into_owned())
}

/// Expand `~` and join `path` against `cwd` if relative, without
/// canonicalizing or touching the filesystem. For CLI-facing rendering
/// of a user-supplied path before any access decision is made; the
/// security check in [`PathDecisionEngine::check_access`] always
/// re-resolves and canonicalizes independently of this helper.
pub fn normalize_path(path: &Path, cwd: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(&expanded)
    }
}

/// Canonicalize without requiring existence: resolve `.`/`..` against the
/// already-absolute `path`. Used only as a fallback for not-yet-existing
/// targets (e.g. a file about to be created by `write_atomic`); once the
/// file exists, subsequent checks use the real `canonicalize`.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

fn is_descendant(path: &Path, base: &Path) -> bool {
    path == base || path.starts_with(base)
}

/// Format `path` for human display: relative to `cwd` if underneath it,
/// else `~`-relative if underneath `home`, else the absolute path.
/// Never used for security decisions — those always operate on the fully
/// resolved path from [`PathDecisionEngine::check_access`].
pub fn display_path(path: &Path, cwd: &Path, home: Option<&Path>) -> String {
    if let Ok(rel) = path.strip_prefix(cwd) {
        if rel.as_os_str().is_empty() {
            return ".".to_string();
        }
        return rel.display().to_string();
    }
    if let Some(home) = home {
        if let Ok(rel) = path.strip_prefix(home) {
            return format!("~/{}", rel.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unrestricted_allows_anything_not_blocked() {
        let dir = tempdir().unwrap();
        let engine = PathDecisionEngine::new(None, vec![], dir.path().to_path_buf());
        let target = dir.path().join("file.txt");
        std::fs::write(&target, "x").unwrap();
        let d = engine.check_access(&target, false, false);
        assert!(d.allowed);
        assert_eq!(d.reason, PathDecisionReason::Unrestricted);
    }

    #[test]
    fn empty_allowed_paths_denies_all() {
        let dir = tempdir().unwrap();
        let engine = PathDecisionEngine::new(Some(vec![]), vec![], dir.path().to_path_buf());
        let d = engine.check_access(&dir.path().join("x"), false, false);
        assert!(!d.allowed);
        assert_eq!(d.reason, PathDecisionReason::NoAllowedPaths);
        assert!(d.resolved_path.is_none());
    }

    #[test]
    fn blocked_precedes_allowed() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let engine = PathDecisionEngine::new(
            Some(vec![dir.path().to_path_buf()]),
            vec![sub.clone()],
            dir.path().to_path_buf(),
        );
        let target = sub.join("f.txt");
        std::fs::write(&target, "x").unwrap();
        let d = engine.check_access(&target, false, false);
        assert!(!d.allowed);
        assert_eq!(d.reason, PathDecisionReason::Blocked);
    }

    #[test]
    fn outside_allowed_is_denied() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let engine = PathDecisionEngine::new(
            Some(vec![dir.path().to_path_buf()]),
            vec![],
            dir.path().to_path_buf(),
        );
        let d = engine.check_access(other.path(), false, false);
        assert!(!d.allowed);
        assert_eq!(d.reason, PathDecisionReason::OutsideAllowed);
    }

    #[test]
    fn check_cwd_defaults_on_empty() {
        let dir = tempdir().unwrap();
        let engine = PathDecisionEngine::new(None, vec![], dir.path().to_path_buf());
        let d = engine.check_cwd(None);
        assert!(d.allowed);
        assert_eq!(d.reason, PathDecisionReason::CwdDefault);
        assert_eq!(d.resolved_path.unwrap(), dir.path());
    }

    #[test]
    fn symlink_escape_is_not_allowed() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let allowed_root = dir.path().join("allowed");
        std::fs::create_dir(&allowed_root).unwrap();
        let link = allowed_root.join("escape");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let engine = PathDecisionEngine::new(
            Some(vec![allowed_root.clone()]),
            vec![],
            dir.path().to_path_buf(),
        );
        let d = engine.check_access(&link, false, false);
        assert!(!d.allowed);
        assert_eq!(d.reason, PathDecisionReason::OutsideAllowed);
    }
}
