//! Polymorphic skill capability set and registry (C13). Grounded in the
//! teacher's `ApplyEngine` trait + `create_engine` factory: a trait object
//! per capability, enumerated through a registry that can list metadata
//! without constructing or invoking anything.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SkillResult;
use crate::services::Services;

/// One agent-callable capability: `name`/`description`/`parameters`/`execute`,
/// mirroring the duck-typed skill objects the original runtime registers
/// (§9: "name/description/parameters/execute").
#[async_trait]
pub trait Skill: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON-schema-shaped parameter description, used for definition
    /// enumeration without instantiating or running the skill.
    fn parameters(&self) -> Value;
    async fn execute(&self, services: &Services, args: Value) -> SkillResult;
}

/// Metadata-only view of a skill, for listing definitions without touching
/// `execute` (§9: "cache metadata separately from instantiation").
#[derive(Debug, Clone, serde::Serialize)]
pub struct SkillDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub struct SkillRegistry {
    skills: Vec<Box<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new(skills: Vec<Box<dyn Skill>>) -> Self {
        SkillRegistry { skills }
    }

    pub fn list_definitions(&self) -> Vec<SkillDefinition> {
        self.skills
            .iter()
            .map(|s| SkillDefinition {
                name: s.name().to_string(),
                description: s.description().to_string(),
                parameters: s.parameters(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Skill> {
        self.skills.iter().find(|s| s.name() == name).map(|b| b.as_ref())
    }

    pub async fn execute(&self, name: &str, services: &Services, args: Value) -> SkillResult {
        match self.get(name) {
            Some(skill) => skill.execute(services, args).await,
            None => SkillResult::err(format!("unknown skill: {name}")),
        }
    }
}
