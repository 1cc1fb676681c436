pub mod file;

pub use file::FileWorkflowStore;

use crate::workflow::{LogMessage, Workflow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("workflow `{workflow_id}` not found")]
    UnknownWorkflow { workflow_id: String },
}

// Message appends must be atomic: two concurrent appenders may interleave
// but never lose entries.
pub trait WorkflowStore {
    fn find_by_workflow_id(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError>;
    fn upsert(&self, workflow: &Workflow) -> Result<(), StoreError>;
    fn append_message(&self, workflow_id: &str, message: &LogMessage) -> Result<(), StoreError>;
    fn load_messages(&self, workflow_id: &str) -> Result<Vec<LogMessage>, StoreError>;
}
