use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub name: String,
    pub content: String,
    pub produced_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElicitationEntry {
    pub question: String,
    pub answer: String,
    pub agent: String,
    pub timestamp: i64,
}

// Stored as-is inside the workflow record; no save/load path converts
// context field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowContext {
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
    // Keyed by step name or action, read by later routing steps.
    #[serde(default)]
    pub decisions: BTreeMap<String, String>,
    #[serde(default)]
    pub elicitations: Vec<ElicitationEntry>,
}

impl WorkflowContext {
    pub fn record_decision(&mut self, key: &str, value: &str) {
        self.decisions.insert(key.to_string(), value.to_string());
    }

    pub fn record_artifact(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.name.clone(), artifact);
    }

    pub fn record_elicitation(&mut self, entry: ElicitationEntry) {
        self.elicitations.push(entry);
    }
}
