use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

use nexus3_core::cli::{AppContext, Cli, Commands};
use nexus3_core::core::clipboard::manager::{ClipboardManager, ClipboardTtlConfig};
use nexus3_core::core::clipboard::types::ClipboardPermissions;
use nexus3_core::infra::{self, config};
use nexus3_core::services::Services;
use nexus3_core::{skills, SkillResult};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = AppContext { quiet: cli.quiet, no_color: cli.no_color, dry_run: cli.dry_run };

    infra::logging::init(ctx.quiet);

    let Cli {
        command,
        no_color: _,
        quiet: _,
        dry_run: _,
        cwd: cli_cwd,
        agent_id,
        allowed_paths: cli_allowed_paths,
        deny_all_paths,
        blocked_paths: cli_blocked_paths,
        permissions: cli_permissions,
        config: config_path,
    } = cli;

    match command {
        Commands::Init(args) => return config::init(args, &ctx),
        Commands::Completions(args) => return nexus3_core::completion::run(args, &ctx),
        command => {
            let config = config::load_config_from(config_path.as_deref()).context("loading configuration")?;

            let cwd = match cli_cwd {
                Some(p) => p,
                None => std::env::current_dir().context("resolving current directory")?,
            };
            let home_dir = std::env::var_os("HOME").map(PathBuf::from);

            let permissions_preset = cli_permissions.unwrap_or_else(|| config.clipboard.permissions_preset.clone());
            let permissions = ClipboardPermissions::from_preset_name(&permissions_preset);

            let ttl_config = ClipboardTtlConfig {
                agent: config.clipboard.default_ttl_seconds.get("agent").copied(),
                project: config.clipboard.default_ttl_seconds.get("project").copied(),
                system: config.clipboard.default_ttl_seconds.get("system").copied(),
            };

            let clipboard_manager =
                ClipboardManager::new(agent_id, cwd.clone(), Some(permissions), home_dir.clone(), ttl_config);

            let allowed_paths = if deny_all_paths {
                Some(Vec::new())
            } else if cli_allowed_paths.is_empty() {
                config.allowed_paths.clone()
            } else {
                Some(cli_allowed_paths)
            };

            let mut blocked_paths = config.blocked_paths.clone();
            blocked_paths.extend(cli_blocked_paths);

            let services = Services {
                permissions_preset,
                clipboard_manager: Mutex::new(clipboard_manager),
                cwd,
                home_dir: home_dir.unwrap_or_else(|| PathBuf::from(".")),
                blocked_paths,
                allowed_paths,
                per_tool_allowed_paths: HashMap::new(),
                config,
            };

            let registry = skills::build_registry();

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;

            let result = runtime.block_on(dispatch(&command, &ctx, &registry, &services))?;

            print_result(&result);

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn dispatch(
    command: &Commands,
    ctx: &AppContext,
    registry: &nexus3_core::SkillRegistry,
    services: &Services,
) -> Result<SkillResult> {
    let skill_name = command.skill_name().expect("init/completions handled before dispatch");
    let mut args = command.to_args_value().context("serializing command arguments")?;

    if ctx.dry_run && command.supports_global_dry_run() {
        if let Some(obj) = args.as_object_mut() {
            obj.insert("dry_run".to_string(), serde_json::Value::Bool(true));
        }
    }

    Ok(registry.execute(skill_name, services, args).await)
}

fn print_result(result: &SkillResult) {
    let rendered = serde_json::to_string_pretty(result).unwrap_or_else(|_| "{\"success\":false}".to_string());
    println!("{rendered}");
}
