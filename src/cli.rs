//! Command-line surface: one subcommand per C11 skill, plus `init` and
//! `completions`. Each subcommand's `Args` struct mirrors the matching
//! skill's JSON parameter schema field-for-field so [`Commands::into_args`]
//! can serialize it straight into the `serde_json::Value` the skill
//! registry expects (SPEC_FULL.md §4.0).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

/// Shared application context for global flags, built once in `main`.
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,
    pub no_color: bool,
    pub dry_run: bool,
}

#[derive(Parser)]
#[command(name = "nexus3c")]
#[command(about = "Patch engine, scoped clipboard store, and path-decision security core for agent dev-tooling runtimes")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output (only the skill result is printed)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Where supported, report what would happen without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Agent-scoped working directory used to resolve relative paths (C2)
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Identifier recorded as created_by_agent/modified_by_agent on clipboard entries
    #[arg(long, global = true, default_value = "cli")]
    pub agent_id: String,

    /// Restrict every path access to descendants of this directory (repeatable).
    /// Omit entirely for unrestricted access; pass once with an empty string to deny all.
    #[arg(long = "allowed-path", global = true)]
    pub allowed_paths: Vec<PathBuf>,

    /// Deny all path access outside an explicit --allowed-path (distinct from omitting the flag)
    #[arg(long, global = true)]
    pub deny_all_paths: bool,

    /// Always-denied path prefix, regardless of --allowed-path (repeatable)
    #[arg(long = "blocked-path", global = true)]
    pub blocked_paths: Vec<PathBuf>,

    /// Clipboard permission preset: sandboxed, trusted, or yolo
    #[arg(long, global = true)]
    pub permissions: Option<String>,

    /// Path to a nexus3 config TOML file, overriding the default search
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a unified diff to a target file (strict/tolerant/fuzzy)
    Patch(PatchArgs),
    /// Copy a line range from a file into the clipboard store
    Copy(CopyArgs),
    /// Copy a line range into the clipboard, then remove it from the source
    Cut(CopyArgs),
    /// Insert a clipboard entry's content into a target file
    Paste(PasteArgs),
    /// List clipboard entries
    ClipboardList(ClipboardListArgs),
    /// Search clipboard entries by substring
    ClipboardSearch(ClipboardSearchArgs),
    /// Add, remove, or list tags on a clipboard entry
    ClipboardTag(ClipboardTagArgs),
    /// Export clipboard entries to a JSON document
    ClipboardExport(ClipboardExportArgs),
    /// Import a clipboard JSON document into one scope
    ClipboardImport(ClipboardImportArgs),
    /// Render a markdown summary of clipboard entries for prompt injection
    ClipboardContext(ClipboardContextArgs),
    /// Replace an inclusive line range with new content
    EditLines(EditLinesArgs),
    /// Regex-substitute within a file
    RegexReplace(RegexReplaceArgs),
    /// Read a file's lines, honoring offset/limit
    ReadFile(ReadFileArgs),
    /// Return the last N lines of a file
    Tail(TailArgs),
    /// Stream-search a file for a regex pattern
    Grep(GrepArgs),
    /// Walk a gitignore-aware file tree matching a glob pattern
    Glob(GlobArgs),
    /// Create a directory, optionally creating missing parents
    Mkdir(MkdirArgs),
    /// Rename or move a file or directory
    Rename(RenameArgs),
    /// Copy a file to a new path
    CopyFile(CopyFileArgs),
    /// Report size, modification time, and type for a path
    FileInfo(FileInfoArgs),
    /// Append content to a file
    AppendFile(AppendFileArgs),
    /// Run a whitelisted version-control command
    Vcs(VcsArgs),

    /// Initialize a nexus3 config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// The registry skill name this subcommand dispatches to, or `None`
    /// for CLI-only commands (`init`, `completions`).
    pub fn skill_name(&self) -> Option<&'static str> {
        match self {
            Commands::Patch(_) => Some("patch"),
            Commands::Copy(_) => Some("copy"),
            Commands::Cut(_) => Some("cut"),
            Commands::Paste(_) => Some("paste"),
            Commands::ClipboardList(_) => Some("clipboard_list"),
            Commands::ClipboardSearch(_) => Some("clipboard_search"),
            Commands::ClipboardTag(_) => Some("clipboard_tag"),
            Commands::ClipboardExport(_) => Some("clipboard_export"),
            Commands::ClipboardImport(_) => Some("clipboard_import"),
            Commands::ClipboardContext(_) => Some("clipboard_context"),
            Commands::EditLines(_) => Some("edit_lines"),
            Commands::RegexReplace(_) => Some("regex_replace"),
            Commands::ReadFile(_) => Some("read_file"),
            Commands::Tail(_) => Some("tail"),
            Commands::Grep(_) => Some("grep"),
            Commands::Glob(_) => Some("glob"),
            Commands::Mkdir(_) => Some("mkdir"),
            Commands::Rename(_) => Some("rename"),
            Commands::CopyFile(_) => Some("copy_file"),
            Commands::FileInfo(_) => Some("file_info"),
            Commands::AppendFile(_) => Some("append_file"),
            Commands::Vcs(_) => Some("vcs"),
            Commands::Init(_) | Commands::Completions(_) => None,
        }
    }

    /// Serialize this subcommand's own args into the JSON value the
    /// matching skill's `execute` expects.
    pub fn to_args_value(&self) -> serde_json::Result<Value> {
        match self {
            Commands::Patch(a) => serde_json::to_value(a),
            Commands::Copy(a) | Commands::Cut(a) => serde_json::to_value(a),
            Commands::Paste(a) => serde_json::to_value(a),
            Commands::ClipboardList(a) => serde_json::to_value(a),
            Commands::ClipboardSearch(a) => serde_json::to_value(a),
            Commands::ClipboardTag(a) => serde_json::to_value(a),
            Commands::ClipboardExport(a) => serde_json::to_value(a),
            Commands::ClipboardImport(a) => serde_json::to_value(a),
            Commands::ClipboardContext(a) => serde_json::to_value(a),
            Commands::EditLines(a) => serde_json::to_value(a),
            Commands::RegexReplace(a) => serde_json::to_value(a),
            Commands::ReadFile(a) => serde_json::to_value(a),
            Commands::Tail(a) => serde_json::to_value(a),
            Commands::Grep(a) => serde_json::to_value(a),
            Commands::Glob(a) => serde_json::to_value(a),
            Commands::Mkdir(a) => serde_json::to_value(a),
            Commands::Rename(a) => serde_json::to_value(a),
            Commands::CopyFile(a) => serde_json::to_value(a),
            Commands::FileInfo(a) => serde_json::to_value(a),
            Commands::AppendFile(a) => serde_json::to_value(a),
            Commands::Vcs(a) => serde_json::to_value(a),
            Commands::Init(_) | Commands::Completions(_) => Ok(Value::Null),
        }
    }

    /// Commands whose skill honors a `dry_run` field, so the global
    /// `--dry-run` flag can force it on.
    pub fn supports_global_dry_run(&self) -> bool {
        matches!(self, Commands::Patch(_) | Commands::RegexReplace(_) | Commands::ClipboardImport(_))
    }
}

#[derive(Args, Serialize)]
pub struct PatchArgs {
    pub target: PathBuf,
    #[arg(long)]
    pub diff: Option<String>,
    #[arg(long)]
    pub diff_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "strict")]
    pub mode: PatchModeArg,
    #[arg(long, default_value = "0.8")]
    pub fuzzy_threshold: f64,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchModeArg {
    Strict,
    Tolerant,
    Fuzzy,
}

#[derive(Args, Serialize)]
pub struct CopyArgs {
    pub source_path: PathBuf,
    pub key: String,
    #[arg(long, default_value = "agent")]
    pub scope: String,
    #[arg(long)]
    pub start_line: Option<usize>,
    #[arg(long)]
    pub end_line: Option<usize>,
    #[arg(long)]
    pub short_description: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub ttl_seconds: Option<i64>,
}

#[derive(Args, Serialize)]
pub struct PasteArgs {
    pub key: String,
    pub target: PathBuf,
    #[arg(long, value_enum)]
    pub mode: InsertionModeArg,
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long)]
    pub line_number: Option<usize>,
    #[arg(long)]
    pub start_line: Option<usize>,
    #[arg(long)]
    pub end_line: Option<usize>,
    #[arg(long)]
    pub marker: Option<String>,
    #[arg(long)]
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionModeArg {
    AfterLine,
    BeforeLine,
    ReplaceLines,
    AtMarkerReplace,
    AtMarkerAfter,
    AtMarkerBefore,
    Append,
    Prepend,
}

#[derive(Args, Serialize)]
pub struct ClipboardListArgs {
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long = "any-tag")]
    pub any_tags: Vec<String>,
    #[arg(long)]
    pub include_expired: bool,
}

#[derive(Args, Serialize)]
pub struct ClipboardSearchArgs {
    pub query: String,
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long, default_value = "true")]
    pub search_content: bool,
    #[arg(long, default_value = "true")]
    pub search_keys: bool,
    #[arg(long, default_value = "true")]
    pub search_descriptions: bool,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Serialize)]
pub struct ClipboardTagArgs {
    #[arg(value_enum)]
    pub op: TagOpArg,
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOpArg {
    Add,
    Remove,
    List,
}

#[derive(Args, Serialize)]
pub struct ClipboardExportArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub scope: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Serialize)]
pub struct ClipboardImportArgs {
    pub path: PathBuf,
    pub scope: String,
    #[arg(long)]
    pub overwrite: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Serialize)]
pub struct ClipboardContextArgs {
    #[arg(long, default_value = "20")]
    pub max_entries: usize,
    #[arg(long, default_value = "true")]
    pub show_source: bool,
}

#[derive(Args, Serialize)]
pub struct EditLinesArgs {
    pub path: PathBuf,
    pub start: usize,
    #[arg(long)]
    pub end: Option<usize>,
    pub new_content: String,
}

#[derive(Args, Serialize)]
pub struct RegexReplaceArgs {
    pub path: PathBuf,
    pub pattern: String,
    pub replacement: String,
    #[arg(long, default_value = "0")]
    pub count: usize,
    #[arg(long)]
    pub case_insensitive: bool,
    #[arg(long)]
    pub multiline: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Serialize)]
pub struct ReadFileArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub offset: Option<usize>,
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Serialize)]
pub struct TailArgs {
    pub path: PathBuf,
    #[arg(long, default_value = "10")]
    pub lines: usize,
}

#[derive(Args, Serialize)]
pub struct GrepArgs {
    pub pattern: String,
    pub path: PathBuf,
    #[arg(long, default_value = "1000")]
    pub max_matches: usize,
    #[arg(long, default_value = "0")]
    pub context: usize,
}

#[derive(Args, Serialize)]
pub struct GlobArgs {
    pub pattern: String,
    #[arg(long)]
    pub base: Option<PathBuf>,
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,
    #[arg(long, default_value = "1000")]
    pub max_results: usize,
}

#[derive(Args, Serialize)]
pub struct MkdirArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub parents: bool,
}

#[derive(Args, Serialize)]
pub struct RenameArgs {
    pub from: PathBuf,
    pub to: PathBuf,
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Serialize)]
pub struct CopyFileArgs {
    pub from: PathBuf,
    pub to: PathBuf,
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Serialize)]
pub struct FileInfoArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub hash: bool,
}

#[derive(Args, Serialize)]
pub struct AppendFileArgs {
    pub path: PathBuf,
    pub content: String,
    #[arg(long, default_value = "true")]
    pub newline: bool,
}

#[derive(Args, Serialize)]
pub struct VcsArgs {
    pub command: String,
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints to stdout
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
