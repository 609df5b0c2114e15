//! Structured logging setup (ambient stack, SPEC_FULL.md §4.0).
//!
//! A single `tracing_subscriber::fmt` subscriber, configured from
//! `NEXUS3_LOG` (falling back to `info`), initialized once from `main`.
//! Every skill execution is wrapped in a span carrying the skill name so a
//! path-decision denial or a patch failure can be traced back to the call
//! that produced it.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Safe to call at most once;
/// a second call is a no-op (the underlying `set_global_default` error is
/// swallowed since tests may initialize more than once per process).
pub fn init(quiet: bool) {
    let filter = EnvFilter::try_from_env("NEXUS3_LOG").unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
