use crate::workflow::context::WorkflowContext;
use crate::workflow::status::WorkflowStatus;
use crate::workflow::step::StepDefinition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowErrorEntry {
    pub step: usize,
    pub error: String,
    pub timestamp: i64,
}

// Loaded fresh from the store at every engine entry; never trusted across a wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub workflow_id: String,
    pub template: String,
    pub status: WorkflowStatus,
    pub steps: Vec<StepDefinition>,
    // `current_step == steps.len()` means the sequence ran to completion.
    pub current_step: usize,
    #[serde(default)]
    pub context: WorkflowContext,
    #[serde(default)]
    pub errors: Vec<WorkflowErrorEntry>,
    #[serde(default)]
    pub initiated_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Workflow {
    pub fn sequence_exhausted(&self) -> bool {
        self.current_step >= self.steps.len()
    }

    pub fn current_step_definition(&self) -> Option<&StepDefinition> {
        self.steps.get(self.current_step)
    }

    pub fn record_error(&mut self, step: usize, error: &str, now: i64) {
        self.errors.push(WorkflowErrorEntry {
            step,
            error: error.to_string(),
            timestamp: now,
        });
    }
}
