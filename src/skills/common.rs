//! Shared helpers for the C11 skill surface: argument decoding, path checks
//! via C2, and line-ending-preserving read/write via C1.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::secure_io::{self, LineEnding};
use crate::error::SkillError;
use crate::services::Services;

pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, SkillError> {
    serde_json::from_value(args).map_err(|e| SkillError::validation(format!("invalid arguments: {e}")))
}

/// Resolve `path` for `tool_name` through the path-decision engine, requiring
/// existence/directory-ness per the flags, denying with the engine's reason
/// on failure. Never surfaces the resolved path of a denial.
pub fn check_path(services: &Services, tool_name: &str, path: &Path, must_exist: bool, must_be_dir: bool) -> Result<PathBuf, SkillError> {
    let engine = services.path_engine_for(tool_name);
    let decision = engine.check_access(path, must_exist, must_be_dir);
    if !decision.allowed {
        return Err(SkillError::path_security(format!(
            "{}: {}",
            decision.reason.as_str(),
            decision.reason_detail
        )));
    }
    Ok(decision.resolved_path.expect("allowed decision always carries a resolved path"))
}

pub fn read_text(path: &Path) -> Result<String, SkillError> {
    Ok(secure_io::read_text(path)?)
}

pub fn write_atomic(path: &Path, content: &str, ending: LineEnding) -> Result<(), SkillError> {
    let bytes = restore_line_ending(content, ending);
    secure_io::write_bytes_atomic(path, bytes.as_bytes()).map_err(SkillError::from)
}

/// Reassemble `content` (always LF-normalized internally) using `ending`.
pub fn restore_line_ending(content: &str, ending: LineEnding) -> String {
    match ending {
        LineEnding::Lf => content.to_string(),
        LineEnding::Crlf => content.replace('\n', "\r\n"),
        LineEnding::Cr => content.replace('\n', "\r"),
    }
}

/// Normalize CRLF/CR to LF for line-oriented slicing, returning the detected
/// original ending alongside.
pub fn normalize_to_lf(raw: &str) -> (String, LineEnding) {
    let ending = secure_io::detect_line_ending(raw);
    let normalized = match ending {
        LineEnding::Lf => raw.to_string(),
        LineEnding::Crlf => raw.replace("\r\n", "\n"),
        LineEnding::Cr => raw.replace('\r', "\n"),
    };
    (normalized, ending)
}
