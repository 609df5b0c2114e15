//! **nexus3-core** - patch engine, scoped clipboard store, and path-decision
//! security core for agent-facing developer-tooling runtimes.
//!
//! Every filesystem-touching operation is exposed as a [`skill::Skill`]
//! behind a single [`services::Services`] dependency-injection point, with
//! [`core::path_decision::PathDecisionEngine`] as the sole authority over
//! whether a path access is allowed.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core domain logic: patch engine, clipboard store, path-decision engine,
/// secure I/O, process supervision, and loopback classification.
pub mod core;

/// Error taxonomy and the skill result envelope.
pub mod error;

/// Infrastructure: configuration, gitignore-aware walking, and logging.
pub mod infra {
    /// Configuration loading (TOML file + env overrides).
    pub mod config;
    pub use config::{init as config_init, load_config, Config};

    /// Structured logging setup.
    pub mod logging;

    /// Gitignore-aware directory walking with rayon parallelism.
    pub mod walk;
    pub use walk::FileWalker;
}

/// Typed service bag passed to every skill invocation.
pub mod services;

/// The `Skill` capability trait and registry.
pub mod skill;

/// Agent-callable skills composing the core domain logic (C11).
pub mod skills;

pub use cli::{AppContext, Cli, Commands};
pub use error::{SkillError, SkillResult};
pub use infra::{load_config, Config};
pub use services::Services;
pub use skill::{Skill, SkillRegistry};
