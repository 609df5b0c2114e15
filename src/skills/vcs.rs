//! Filtered command skill for VCS access (spec.md §4.11): tokenize first,
//! validate the token list against a trust state, then spawn in its own
//! process group so a timeout can kill the whole tree (C12).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::core::process::{terminate_process_tree, GRACEFUL_TIMEOUT};
use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::read::OUTPUT_CAP_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsState {
    Sandboxed,
    Trusted,
    Yolo,
}

impl VcsState {
    pub fn from_name(name: &str) -> Option<VcsState> {
        match name {
            "sandboxed" => Some(VcsState::Sandboxed),
            "trusted" => Some(VcsState::Trusted),
            "yolo" => Some(VcsState::Yolo),
            _ => None,
        }
    }
}

/// Read-only subcommands permitted in `Sandboxed` state.
const SANDBOXED_SUBCOMMANDS: &[&str] =
    &["status", "log", "show", "diff", "branch", "remote", "rev-parse", "ls-files", "blame", "describe"];

/// Long/short flags rejected for every subcommand regardless of state,
/// outside of `Yolo`.
const GLOBAL_DANGEROUS_FLAGS: &[&str] = &["--force", "-f"];

static PER_SUBCOMMAND_DANGEROUS_FLAGS: LazyLock<HashMap<&'static str, &'static [&'static str]>> = LazyLock::new(|| {
    HashMap::from([
        ("push", &["--force", "--force-with-lease", "-f", "--delete"][..]),
        ("reset", &["--hard"][..]),
        ("checkout", &["--force", "-f"][..]),
        ("clean", &["-f", "-d", "-x", "-fd", "-fx", "-fdx"][..]),
        ("branch", &["-D", "-d"][..]),
        ("rebase", &["--force-rebase"][..]),
        ("tag", &["-d", "--delete", "-f", "--force"][..]),
        ("gc", &["--prune", "--aggressive"][..]),
    ])
});

/// Split `cmd` into shell-like tokens: whitespace-separated, honoring single
/// and double quotes and backslash escapes. No globbing, no variable
/// expansion, no pipelines — this is a token list, not a shell.
fn tokenize(cmd: &str) -> Result<Vec<String>, SkillError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = cmd.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                    current.push(next);
                }
            }
            '"' => {
                in_token = true;
                while let Some(next) = chars.next() {
                    if next == '"' {
                        break;
                    }
                    if next == '\\' {
                        if let Some(&escaped) = chars.peek() {
                            if matches!(escaped, '"' | '\\' | '$' | '`') {
                                current.push(escaped);
                                chars.next();
                                continue;
                            }
                        }
                    }
                    current.push(next);
                }
            }
            '\\' => {
                in_token = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }

    if tokens.is_empty() {
        return Err(SkillError::validation("empty command"));
    }
    Ok(tokens)
}

/// Split a short-flag group like `-fd` into its individual characters for
/// per-character dangerous-flag checking (spec.md §4.11).
fn short_flag_chars(token: &str) -> Vec<String> {
    token
        .strip_prefix('-')
        .filter(|rest| !rest.starts_with('-'))
        .map(|rest| rest.chars().map(|c| format!("-{c}")).collect())
        .unwrap_or_default()
}

fn validate_tokens(tokens: &[String], state: VcsState) -> Result<(), SkillError> {
    if matches!(state, VcsState::Yolo) {
        return Ok(());
    }

    let subcommand = tokens.first().map(String::as_str).unwrap_or_default();

    if matches!(state, VcsState::Sandboxed) && !SANDBOXED_SUBCOMMANDS.contains(&subcommand) {
        return Err(SkillError::permission(format!(
            "'{subcommand}' is not in the read-only command set allowed in sandboxed state"
        )));
    }

    let subcommand_dangerous: &[&str] = PER_SUBCOMMAND_DANGEROUS_FLAGS.get(subcommand).copied().unwrap_or(&[]);

    for token in &tokens[1..] {
        if token.starts_with("--") {
            if GLOBAL_DANGEROUS_FLAGS.contains(&token.as_str()) || subcommand_dangerous.contains(&token.as_str()) {
                return Err(SkillError::permission(format!("dangerous flag rejected: {token}")));
            }
        } else if token.starts_with('-') && token.len() > 1 {
            for flag in short_flag_chars(token) {
                if GLOBAL_DANGEROUS_FLAGS.contains(&flag.as_str()) || subcommand_dangerous.contains(&flag.as_str()) {
                    return Err(SkillError::permission(format!("dangerous flag rejected: {flag} (in {token})")));
                }
            }
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct VcsArgs {
    command: String,
    #[serde(default)]
    cwd: Option<std::path::PathBuf>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

pub struct VcsSkill;

#[async_trait]
impl Skill for VcsSkill {
    fn name(&self) -> &str {
        "vcs"
    }

    fn description(&self) -> &str {
        "Run a whitelisted version-control command through the configured binary, filtered by trust state."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "e.g. 'status' or 'log --oneline -5'"},
                "cwd": {"type": "string"},
                "timeout_secs": {"type": "integer", "minimum": 1, "default": 30}
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run_vcs(services, args).await)
    }
}

async fn run_vcs(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: VcsArgs = super::common::parse_args(args)?;

    let state = VcsState::from_name(&services.config.vcs.state)
        .ok_or_else(|| SkillError::validation(format!("unrecognized vcs state: {}", services.config.vcs.state)))?;

    let tokens = tokenize(&args.command)?;
    validate_tokens(&tokens, state)?;

    let cwd = match &args.cwd {
        Some(p) => super::common::check_path(services, "vcs", p, true, true)?,
        None => services.cwd.clone(),
    };

    let mut command = tokio::process::Command::new(&services.config.vcs.binary);
    command
        .args(&tokens)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let mut child = command
        .spawn()
        .map_err(|e| SkillError::subprocess(format!("failed to spawn '{}': {e}", services.config.vcs.binary)))?;

    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");

    let timeout = Duration::from_secs(args.timeout_secs);
    let read_output = async {
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let _ = stdout.read_to_end(&mut out_buf).await;
        let _ = stderr.read_to_end(&mut err_buf).await;
        let status = child.wait().await;
        (out_buf, err_buf, status)
    };

    match tokio::time::timeout(timeout, read_output).await {
        Ok((out_buf, err_buf, status)) => {
            let status = status.map_err(|e| SkillError::subprocess(e.to_string()))?;
            let stdout_text = cap_text(&out_buf);
            let stderr_text = cap_text(&err_buf);

            Ok(SkillResult::ok(json!({
                "command": tokens.join(" "),
                "exit_code": status.code(),
                "stdout": stdout_text,
                "stderr": stderr_text,
            })))
        }
        Err(_) => {
            terminate_process_tree(&mut child, GRACEFUL_TIMEOUT).await;
            Err(SkillError::subprocess(format!("'{}' timed out after {}s", tokens.join(" "), args.timeout_secs)))
        }
    }
}

fn cap_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes).to_string();
    if text.len() > OUTPUT_CAP_BYTES {
        text[..OUTPUT_CAP_BYTES].to_string()
    } else {
        text
    }
}
