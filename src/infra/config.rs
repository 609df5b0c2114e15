use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directories an agent may read/write under, if restricted at all.
    /// `None` means unrestricted (subject to `blocked_paths`).
    #[serde(default)]
    pub allowed_paths: Option<Vec<PathBuf>>,

    /// Paths always denied, even within an `allowed_paths` entry.
    #[serde(default)]
    pub blocked_paths: Vec<PathBuf>,

    #[serde(default)]
    pub clipboard: ClipboardConfig,

    #[serde(default)]
    pub patch: PatchConfig,

    #[serde(default)]
    pub skills: SkillsConfig,

    #[serde(default)]
    pub vcs: VcsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// One of "sandboxed", "trusted", "yolo" (unknown names fall back to
    /// sandboxed; see core::clipboard::types::ClipboardPermissions).
    pub permissions_preset: String,

    /// Per-scope default TTL in seconds, keyed by "agent"/"project"/"system".
    /// A scope absent from the map has no default expiry.
    #[serde(default)]
    pub default_ttl_seconds: HashMap<String, i64>,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self { permissions_preset: "sandboxed".to_string(), default_ttl_seconds: HashMap::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Similarity threshold for fuzzy-mode hunk matching, used raw by the
    /// applier (`best_ratio >= threshold`, no clamping). The `patch` skill
    /// rejects values outside [0.5, 1.0] with a validation error before the
    /// applier ever sees them.
    pub fuzzy_threshold: f64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self { fuzzy_threshold: 0.8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    pub read_cap_bytes: u64,
    pub grep_cap_bytes: u64,
    pub max_regex_replacements: usize,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            read_cap_bytes: 10 * 1024 * 1024,
            grep_cap_bytes: 10 * 1024 * 1024,
            max_regex_replacements: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsConfig {
    /// "sandboxed" (read-only subcommands only), "trusted", or "yolo".
    pub state: String,
    /// Binary invoked for the `vcs` skill, e.g. "git" or "jj".
    pub binary: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self { state: "sandboxed".to_string(), binary: "git".to_string() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_paths: None,
            blocked_paths: Vec::new(),
            clipboard: ClipboardConfig::default(),
            patch: PatchConfig::default(),
            skills: SkillsConfig::default(),
            vcs: VcsConfig::default(),
        }
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".nexus3/config.toml")];
    if let Some(home) = dirs_home() {
        paths.push(home.join(".nexus3").join("config.toml"));
    }
    paths
}

/// Minimal home-directory lookup matching the teacher's dependency-free
/// style: `HOME` on Unix, falling back to `None` rather than pulling in a
/// dedicated crate for a single env var.
fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

pub fn load_config() -> Result<Config> {
    load_config_from(None)
}

pub fn load_config_from(explicit_path: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();

    if let Some(path) = explicit_path {
        builder = builder.add_source(config::File::from(path));
    } else {
        for path in config_search_paths() {
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
                break;
            }
        }
    }

    builder = builder.add_source(config::Environment::with_prefix("NEXUS3").separator("__"));

    let cfg = builder.build().context("Failed to load configuration")?;
    let parsed: Config = cfg.try_deserialize().context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(args: InitArgs, ctx: &AppContext) -> Result<()> {
    let config_dir = args.path.join(".nexus3");
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !args.force {
        anyhow::bail!("Config file already exists at {}. Use --force to overwrite.", config_path.display());
    }

    std::fs::create_dir_all(&config_dir).context("Failed to create .nexus3 directory")?;

    let config = Config::default();
    let toml_string = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
