pub mod load;
pub mod validate;

pub use load::load_engine_config;
pub use validate::validate_engine_config;

use crate::workflow::{RawStep, StepDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub role: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplateConfig {
    #[serde(default)]
    pub description: String,
    pub steps: Vec<RawStep>,
}

impl WorkflowTemplateConfig {
    // Step kinds are classified once here; the engine never re-inspects raw fields.
    pub fn resolve_steps(&self) -> Vec<StepDefinition> {
        self.steps.iter().map(StepDefinition::from_raw).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub state_root: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_response_timeout_ms")]
    pub default_response_timeout_ms: u64,
    #[serde(default = "default_max_revision_rounds")]
    pub max_revision_rounds: u32,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentProfile>,
    #[serde(default)]
    pub templates: BTreeMap<String, WorkflowTemplateConfig>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_response_timeout_ms() -> u64 {
    300_000
}

fn default_max_revision_rounds() -> u32 {
    5
}

impl EngineConfig {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        EngineConfig {
            state_root: state_root.into(),
            poll_interval_ms: default_poll_interval_ms(),
            default_response_timeout_ms: default_response_timeout_ms(),
            max_revision_rounds: default_max_revision_rounds(),
            agents: BTreeMap::new(),
            templates: BTreeMap::new(),
        }
    }
}
