//! Typed service bag (§9 design note): a stringly-typed registry in the
//! original becomes explicit getters for well-known slots here. Per-tool
//! allowed-paths lookups shadow the policy's general `allowed_paths`;
//! `None` on a per-tool entry means "inherit the policy default", `Some(vec![])`
//! means "deny all" for that tool specifically.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::core::clipboard::manager::ClipboardManager;
use crate::core::path_decision::PathDecisionEngine;
use crate::infra::config::Config;

/// Services shared by every skill invocation within one agent session.
pub struct Services {
    pub permissions_preset: String,
    pub clipboard_manager: Mutex<ClipboardManager>,
    pub cwd: PathBuf,
    pub home_dir: PathBuf,
    pub blocked_paths: Vec<PathBuf>,
    pub allowed_paths: Option<Vec<PathBuf>>,
    /// Per-tool path overrides, keyed by skill name. Looked up by
    /// [`Services::path_engine_for`] before falling back to the policy-wide
    /// `allowed_paths`.
    pub per_tool_allowed_paths: HashMap<String, Option<Vec<PathBuf>>>,
    pub config: Config,
}

impl Services {
    /// Build a [`PathDecisionEngine`] for `tool_name`, honoring any per-tool
    /// override before falling back to the general policy.
    pub fn path_engine_for(&self, tool_name: &str) -> PathDecisionEngine {
        let allowed = match self.per_tool_allowed_paths.get(tool_name) {
            Some(override_paths) => override_paths.clone(),
            None => self.allowed_paths.clone(),
        };
        PathDecisionEngine::new(allowed, self.blocked_paths.clone(), self.cwd.clone())
    }
}
