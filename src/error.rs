//! Workspace error taxonomy (§7) and the skill result envelope (§3, §6.4).
//!
//! Every internal layer raises its own `thiserror` error; the skill layer
//! converts whatever comes back into a [`SkillError`] carrying one of the
//! closed-set `kind`s from spec §7, then into the public [`SkillResult`]
//! envelope that never lets an error escape as an exception past the
//! boundary.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::clipboard::manager::ClipboardError;
use crate::core::clipboard::export::ExportError;
use crate::core::secure_io::SecureIoError;

/// Closed set of error kinds from spec.md §7. Not exhaustively matched by
/// callers — carried mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PathSecurity,
    Validation,
    NotFound,
    Conflict,
    Permission,
    Size,
    Schema,
    Io,
    Subprocess,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SkillError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SkillError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        SkillError { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    pub fn path_security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PathSecurity, message)
    }

    pub fn size(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Size, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn subprocess(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Subprocess, message)
    }
}

impl From<std::io::Error> for SkillError {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            std::io::ErrorKind::AlreadyExists => ErrorKind::Conflict,
            _ => ErrorKind::Io,
        };
        SkillError::new(kind, e.to_string())
    }
}

impl From<SecureIoError> for SkillError {
    fn from(e: SecureIoError) -> Self {
        let kind = match &e {
            SecureIoError::AlreadyExists(_) => ErrorKind::Conflict,
            SecureIoError::NotFound(_) => ErrorKind::NotFound,
            SecureIoError::PermissionDenied(_) => ErrorKind::Permission,
            SecureIoError::Io { .. } => ErrorKind::Io,
        };
        SkillError::new(kind, e.to_string())
    }
}

impl From<ClipboardError> for SkillError {
    fn from(e: ClipboardError) -> Self {
        let kind = match &e {
            ClipboardError::PermissionDenied(..) => ErrorKind::Permission,
            ClipboardError::AlreadyExists(..) => ErrorKind::Conflict,
            ClipboardError::NotFound(..) => ErrorKind::NotFound,
            ClipboardError::TooLarge { .. } => ErrorKind::Size,
            ClipboardError::Storage(_) => ErrorKind::Io,
        };
        SkillError::new(kind, e.to_string())
    }
}

impl From<ExportError> for SkillError {
    fn from(e: ExportError) -> Self {
        let kind = match &e {
            ExportError::UnsupportedVersion(_) => ErrorKind::Schema,
            ExportError::UnknownScope(_) => ErrorKind::Validation,
            ExportError::Clipboard(ClipboardError::PermissionDenied(..)) => ErrorKind::Permission,
            ExportError::Clipboard(ClipboardError::AlreadyExists(..)) => ErrorKind::Conflict,
            ExportError::Clipboard(ClipboardError::NotFound(..)) => ErrorKind::NotFound,
            ExportError::Clipboard(ClipboardError::TooLarge { .. }) => ErrorKind::Size,
            ExportError::Clipboard(ClipboardError::Storage(_)) => ErrorKind::Io,
        };
        SkillError::new(kind, e.to_string())
    }
}

/// The public call-shape result (§6.4): `Result { output?, error?, success }`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SkillResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SkillResult {
    pub fn ok(output: Value) -> Self {
        SkillResult { success: true, output: Some(output), error: None, warnings: vec![] }
    }

    pub fn ok_with_warnings(output: Value, warnings: Vec<String>) -> Self {
        SkillResult { success: true, output: Some(output), error: None, warnings }
    }

    pub fn err(e: impl std::fmt::Display) -> Self {
        SkillResult { success: false, output: None, error: Some(e.to_string()), warnings: vec![] }
    }
}

impl From<SkillError> for SkillResult {
    fn from(e: SkillError) -> Self {
        SkillResult::err(e)
    }
}

pub type SkillOutcome = Result<SkillResult, SkillError>;

/// Collapse a [`SkillOutcome`] into the envelope that always reaches the
/// caller, converting any `Err` into an `error` result rather than letting
/// it propagate past the skill boundary.
pub fn finish(outcome: SkillOutcome) -> SkillResult {
    match outcome {
        Ok(r) => r,
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_never_panics_on_conversion() {
        let r: SkillResult = finish(Err(SkillError::not_found("missing key 'x'")));
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("missing key 'x'"));
    }
}
