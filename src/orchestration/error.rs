use crate::store::StoreError;
use crate::waitq::WaitQueueError;
use crate::workflow::WorkflowStatus;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("agent `{agent}` is not configured")]
    AgentNotFound { agent: String },
    #[error("required capability `{capability}` is not configured")]
    ServiceUnavailable { capability: String },
    #[error("no response to message `{message_id}` within {timeout_ms}ms")]
    ResponseTimeout { message_id: String, timeout_ms: u64 },
    #[error("wait on message `{message_id}` was cancelled")]
    ResponseCancelled { message_id: String },
    #[error("step `{step}` execution failed: {reason}")]
    StepExecution { step: String, reason: String },
    #[error("artifact for step `{step}` was rejected by the reviewer")]
    ArtifactRejected { step: String },
    #[error("step `{step}` exceeded {max_revision_rounds} revision rounds")]
    RevisionLimitExceeded {
        step: String,
        max_revision_rounds: u32,
    },
    #[error("workflow `{workflow_id}` not found")]
    UnknownWorkflow { workflow_id: String },
    #[error("workflow template `{template}` not found")]
    UnknownTemplate { template: String },
    #[error("workflow status transition `{from}` -> `{to}` is invalid")]
    InvalidStatusTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
    #[error("invalid workflow id: {0}")]
    InvalidWorkflowId(String),
    #[error("id generation failed: {0}")]
    IdGeneration(String),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    WaitQueue(#[from] WaitQueueError),
}
