//! The C11 skill surface: agent-callable operations composing C1-C10 behind
//! the uniform [`crate::skill::Skill`] capability.

pub mod clipboard_context;
pub mod clipboard_meta;
pub mod clipboard_ops;
pub mod common;
pub mod edit;
pub mod fs_basic;
pub mod patch_skill;
pub mod read;
pub mod vcs;

use crate::skill::{Skill, SkillRegistry};

/// Build the registry of every skill the runtime exposes, in the order
/// they are documented in spec.md §4.9-§4.11.
pub fn build_registry() -> SkillRegistry {
    let skills: Vec<Box<dyn Skill>> = vec![
        Box::new(patch_skill::PatchSkill),
        Box::new(clipboard_ops::CopySkill),
        Box::new(clipboard_ops::CutSkill),
        Box::new(clipboard_ops::PasteSkill),
        Box::new(clipboard_meta::ClipboardListSkill),
        Box::new(clipboard_meta::ClipboardSearchSkill),
        Box::new(clipboard_meta::ClipboardTagSkill),
        Box::new(clipboard_meta::ClipboardExportSkill),
        Box::new(clipboard_meta::ClipboardImportSkill),
        Box::new(clipboard_context::ClipboardContextSkill),
        Box::new(edit::EditLinesSkill),
        Box::new(edit::RegexReplaceSkill),
        Box::new(read::ReadFileSkill),
        Box::new(read::TailSkill),
        Box::new(read::GrepSkill),
        Box::new(read::GlobSkill),
        Box::new(fs_basic::MkdirSkill),
        Box::new(fs_basic::RenameSkill),
        Box::new(fs_basic::CopyFileSkill),
        Box::new(fs_basic::FileInfoSkill),
        Box::new(fs_basic::AppendFileSkill),
        Box::new(vcs::VcsSkill),
    ];
    SkillRegistry::new(skills)
}
