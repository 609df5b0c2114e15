//! Straightforward filesystem wrappers behind C2 checks (spec.md §4.10):
//! mkdir, rename, copy_file, file_info, append_file.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::{check_path, parse_args};

#[derive(Deserialize)]
struct MkdirArgs {
    path: PathBuf,
    #[serde(default)]
    parents: bool,
}

pub struct MkdirSkill;

#[async_trait]
impl Skill for MkdirSkill {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn description(&self) -> &str {
        "Create a directory, optionally creating missing parents, with owner-only permissions."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "parents": {"type": "boolean", "default": false}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run(services, args).await)
    }
}

async fn run(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: MkdirArgs = parse_args(args)?;
    let resolved = check_path(services, "mkdir", &args.path, false, false)?;
    let resolved2 = resolved.clone();
    tokio::task::spawn_blocking(move || crate::core::secure_io::secure_mkdir(&resolved2, args.parents))
        .await
        .map_err(|e| SkillError::io(e.to_string()))??;
    Ok(SkillResult::ok(json!({"path": resolved.display().to_string(), "created": true})))
}

#[derive(Deserialize)]
struct RenameArgs {
    from: PathBuf,
    to: PathBuf,
    #[serde(default)]
    overwrite: bool,
}

pub struct RenameSkill;

#[async_trait]
impl Skill for RenameSkill {
    fn name(&self) -> &str {
        "rename"
    }

    fn description(&self) -> &str {
        "Rename or move a file or directory within allowed paths."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": {"type": "string"},
                "to": {"type": "string"},
                "overwrite": {"type": "boolean", "default": false}
            },
            "required": ["from", "to"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_rename(services, args).await)
    }
}

async fn run_rename(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: RenameArgs = parse_args(args)?;
    let from = check_path(services, "rename", &args.from, true, false)?;
    let to = check_path(services, "rename", &args.to, false, false)?;

    if to.exists() && !args.overwrite {
        return Err(SkillError::conflict(format!("rename target already exists: {}", to.display())));
    }

    tokio::fs::rename(&from, &to).await?;
    Ok(SkillResult::ok(json!({"from": from.display().to_string(), "to": to.display().to_string()})))
}

#[derive(Deserialize)]
struct CopyFileArgs {
    from: PathBuf,
    to: PathBuf,
    #[serde(default)]
    overwrite: bool,
}

pub struct CopyFileSkill;

#[async_trait]
impl Skill for CopyFileSkill {
    fn name(&self) -> &str {
        "copy_file"
    }

    fn description(&self) -> &str {
        "Copy a file to a new path within allowed paths."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": {"type": "string"},
                "to": {"type": "string"},
                "overwrite": {"type": "boolean", "default": false}
            },
            "required": ["from", "to"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_copy_file(services, args).await)
    }
}

async fn run_copy_file(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: CopyFileArgs = parse_args(args)?;
    let from = check_path(services, "copy_file", &args.from, true, false)?;
    let to = check_path(services, "copy_file", &args.to, false, false)?;

    if to.exists() && !args.overwrite {
        return Err(SkillError::conflict(format!("copy target already exists: {}", to.display())));
    }

    let bytes_copied = tokio::fs::copy(&from, &to).await?;
    Ok(SkillResult::ok(json!({
        "from": from.display().to_string(),
        "to": to.display().to_string(),
        "bytes_copied": bytes_copied
    })))
}

#[derive(Deserialize)]
struct FileInfoArgs {
    path: PathBuf,
    #[serde(default)]
    hash: bool,
}

pub struct FileInfoSkill;

#[async_trait]
impl Skill for FileInfoSkill {
    fn name(&self) -> &str {
        "file_info"
    }

    fn description(&self) -> &str {
        "Report size, modification time, and type for a path, with an optional content hash."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "hash": {"type": "boolean", "default": false, "description": "include a blake3 content hash (files only)"}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_file_info(services, args).await)
    }
}

async fn run_file_info(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: FileInfoArgs = parse_args(args)?;
    let resolved = check_path(services, "file_info", &args.path, true, false)?;
    let metadata = tokio::fs::metadata(&resolved).await?;

    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64());

    let mut output = json!({
        "path": resolved.display().to_string(),
        "is_dir": metadata.is_dir(),
        "is_file": metadata.is_file(),
        "is_symlink": tokio::fs::symlink_metadata(&resolved).await.map(|m| m.file_type().is_symlink()).unwrap_or(false),
        "size_bytes": metadata.len(),
        "modified_at": modified,
    });

    if args.hash && metadata.is_file() {
        let resolved_for_hash = resolved.clone();
        let digest = tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&resolved_for_hash)?;
            Ok::<_, std::io::Error>(blake3::hash(&bytes).to_hex().to_string())
        })
        .await
        .map_err(|e| SkillError::io(e.to_string()))??;
        output["blake3"] = json!(digest);
    }

    Ok(SkillResult::ok(output))
}

#[derive(Deserialize)]
struct AppendFileArgs {
    path: PathBuf,
    content: String,
    #[serde(default = "default_true")]
    newline: bool,
}

fn default_true() -> bool {
    true
}

pub struct AppendFileSkill;

#[async_trait]
impl Skill for AppendFileSkill {
    fn name(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append content to a file, inspecting only the last byte to decide whether a newline separator is needed."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"},
                "newline": {"type": "boolean", "default": true}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_append(services, args).await)
    }
}

async fn run_append(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: AppendFileArgs = parse_args(args)?;
    // append_file creates the target if missing, so must_exist is false.
    let resolved = check_path(services, "append_file", &args.path, false, false)?;
    let content_len = args.content.len();

    let resolved_for_blocking = resolved.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        use std::fs::OpenOptions;
        use std::io::{Read, Seek, SeekFrom, Write};

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&resolved_for_blocking)?;

        let needs_newline = if args.newline {
            let len = file.metadata()?.len();
            if len == 0 {
                false
            } else {
                let mut last_byte = [0u8; 1];
                file.seek(SeekFrom::End(-1))?;
                file.read_exact(&mut last_byte)?;
                last_byte[0] != b'\n'
            }
        } else {
            false
        };

        if needs_newline {
            file.write_all(b"\n")?;
        }
        file.write_all(args.content.as_bytes())?;
        Ok(())
    })
    .await
    .map_err(|e| SkillError::io(e.to_string()))??;

    Ok(SkillResult::ok(json!({"path": resolved.display().to_string(), "appended_bytes": content_len})))
}
