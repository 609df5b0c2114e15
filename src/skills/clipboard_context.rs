//! clipboard_context (spec.md §4.8/C10 supplement): render the markdown
//! summary table used to inject available clipboard entries into a system
//! prompt, composing `core::clipboard::injection`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{finish, SkillError, SkillResult};
use crate::services::Services;
use crate::skill::Skill;

use super::common::parse_args;

fn default_max_entries() -> usize {
    20
}

#[derive(Deserialize)]
struct ClipboardContextArgs {
    #[serde(default = "default_max_entries")]
    max_entries: usize,
    #[serde(default = "default_true")]
    show_source: bool,
}

fn default_true() -> bool {
    true
}

pub struct ClipboardContextSkill;

#[async_trait]
impl Skill for ClipboardContextSkill {
    fn name(&self) -> &str {
        "clipboard_context"
    }

    fn description(&self) -> &str {
        "Render a markdown summary table of readable clipboard entries, suitable for system-prompt injection."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "max_entries": {"type": "integer", "minimum": 1, "default": 20},
                "show_source": {"type": "boolean", "default": true}
            }
        })
    }

    async fn execute(&self, services: &Services, args: Value) -> SkillResult {
        finish(run(services, args).await)
    }
}

async fn run(services: &Services, args: Value) -> Result<SkillResult, SkillError> {
    let args: ClipboardContextArgs = parse_args(args)?;

    let context = {
        let mut clipboard = services.clipboard_manager.lock().expect("clipboard mutex poisoned");
        crate::core::clipboard::injection::format_clipboard_context(&mut clipboard, args.max_entries, args.show_source)?
    };

    let has_entries = context.is_some();
    Ok(SkillResult::ok(json!({
        "context": context,
        "has_entries": has_entries,
    })))
}
