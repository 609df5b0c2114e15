//! Secure, atomic file I/O primitives (C1).
//!
//! Owner-only directory/file creation and atomic temp-file-then-rename
//! writes, ported from the original `core/secure_io.py` TOCTOU-safe
//! patterns and generalized to bytes so CRLF/CR line endings survive
//! round-trips untouched.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Owner-only directory mode: 0o700.
pub const SECURE_DIR_MODE: u32 = 0o700;
/// Owner-only file mode: 0o600.
pub const SECURE_FILE_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum SecureIoError {
    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("not found: {0}")]
    NotFound(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> SecureIoError {
    match source.kind() {
        std::io::ErrorKind::AlreadyExists => SecureIoError::AlreadyExists(path.to_path_buf()),
        std::io::ErrorKind::NotFound => SecureIoError::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => SecureIoError::PermissionDenied(path.to_path_buf()),
        _ => SecureIoError::Io { path: path.to_path_buf(), source },
    }
}

/// Line ending style detected in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
    Cr,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

/// Create `path` (and, if `parents`, every missing ancestor) with owner-only
/// permissions. Re-applies the mode even when the directory already existed,
/// matching `secure_mkdir`'s "always ensure correct permissions" contract.
pub fn secure_mkdir(path: &Path, parents: bool) -> Result<(), SecureIoError> {
    if parents {
        let mut ancestors: Vec<&Path> = path.ancestors().collect();
        ancestors.reverse();
        for parent in ancestors {
            if parent.as_os_str().is_empty() {
                continue;
            }
            if !parent.exists() {
                fs::create_dir(parent).map_err(|e| io_err(parent, e))?;
                fs::set_permissions(parent, fs::Permissions::from_mode(SECURE_DIR_MODE))
                    .map_err(|e| io_err(parent, e))?;
            }
        }
    }

    if !path.exists() {
        fs::create_dir(path).map_err(|e| io_err(path, e))?;
    }
    fs::set_permissions(path, fs::Permissions::from_mode(SECURE_DIR_MODE))
        .map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Atomically create a new file with owner-only permissions. Fails with
/// `AlreadyExists` if the path is already present (O_CREAT|O_EXCL semantics).
/// Content is fsynced before the descriptor is closed.
pub fn create_new_secure(path: &Path, content: &[u8]) -> Result<(), SecureIoError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(SECURE_FILE_MODE)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    file.write_all(content).map_err(|e| io_err(path, e))?;
    file.sync_all().map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Write `content` to `path`, atomically. If `path` does not exist, behaves
/// like [`create_new_secure`]. If it exists, writes to a sibling `.tmp` file
/// and renames over the target, re-applying the secure mode afterward. The
/// temp file is removed on any error path.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), SecureIoError> {
    if !path.exists() {
        return create_new_secure(path, content);
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let write_result = (|| -> Result<(), SecureIoError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(SECURE_FILE_MODE)
            .open(&tmp_path)
            .map_err(|e| io_err(&tmp_path, e))?;
        file.write_all(content).map_err(|e| io_err(&tmp_path, e))?;
        file.sync_all().map_err(|e| io_err(&tmp_path, e))?;
        drop(file);
        fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
        fs::set_permissions(path, fs::Permissions::from_mode(SECURE_FILE_MODE))
            .map_err(|e| io_err(path, e))?;
        Ok(())
    })();

    if write_result.is_err() && tmp_path.exists() {
        let _ = fs::remove_file(&tmp_path);
    }
    write_result
}

/// Bytes-exact alias of [`write_atomic`]; kept distinct at the call site so
/// binary-line-ending-preserving callers read clearly.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), SecureIoError> {
    write_atomic(path, bytes)
}

/// Read `path` as UTF-8, replacing invalid byte sequences with U+FFFD.
pub fn read_text(path: &Path) -> Result<String, SecureIoError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Detect the dominant line ending in `text`: CRLF if any CRLF sequence is
/// present, else CR if any bare CR, else LF. Empty input is LF.
pub fn detect_line_ending(text: &str) -> LineEnding {
    let bytes = text.as_bytes();
    let mut i = 0;
    let mut saw_bare_cr = false;
    while i < bytes.len() {
        if bytes[i] == b'\r' {
            if bytes.get(i + 1) == Some(&b'\n') {
                return LineEnding::Crlf;
            }
            saw_bare_cr = true;
        }
        i += 1;
    }
    if saw_bare_cr { LineEnding::Cr } else { LineEnding::Lf }
}

pub fn ensure_secure_file(path: &Path) -> Result<(), SecureIoError> {
    if !path.exists() {
        return Err(SecureIoError::NotFound(path.to_path_buf()));
    }
    fs::set_permissions(path, fs::Permissions::from_mode(SECURE_FILE_MODE))
        .map_err(|e| io_err(path, e))
}

pub fn ensure_secure_dir(path: &Path) -> Result<(), SecureIoError> {
    if !path.exists() {
        return Err(SecureIoError::NotFound(path.to_path_buf()));
    }
    fs::set_permissions(path, fs::Permissions::from_mode(SECURE_DIR_MODE))
        .map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mkdir_sets_owner_only_mode() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        secure_mkdir(&target, true).unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SECURE_DIR_MODE);
        let mode = fs::metadata(dir.path().join("a")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SECURE_DIR_MODE);
    }

    #[test]
    fn create_new_secure_rejects_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        create_new_secure(&path, b"hello").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, SECURE_FILE_MODE);
        assert!(matches!(
            create_new_secure(&path, b"again"),
            Err(SecureIoError::AlreadyExists(_))
        ));
    }

    #[test]
    fn write_atomic_no_tmp_sibling_survives_after_success() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!dir.path().join("f.txt.tmp").exists());
    }

    #[test]
    fn detects_line_endings() {
        assert_eq!(detect_line_ending(""), LineEnding::Lf);
        assert_eq!(detect_line_ending("a\nb\n"), LineEnding::Lf);
        assert_eq!(detect_line_ending("a\r\nb\r\n"), LineEnding::Crlf);
        assert_eq!(detect_line_ending("a\rb\r"), LineEnding::Cr);
    }
}
