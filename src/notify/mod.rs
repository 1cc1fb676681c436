pub mod file;

pub use file::FileNotifier;

use crate::shared::logging::append_engine_log_line;
use serde_json::{json, Value};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
#[error("notification publish failed on `{channel}`: {reason}")]
pub struct NotifyError {
    pub channel: String,
    pub reason: String,
}

// At-most-once, best-effort; never a control-flow dependency.
pub trait NotificationChannel {
    fn publish(&self, channel: &str, event: &str, payload: &Value) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationChannel for NullNotifier {
    fn publish(&self, _channel: &str, _event: &str, _payload: &Value) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    AgentActivated {
        agent: String,
        step: String,
    },
    AgentCompleted {
        agent: String,
        step: String,
    },
    AgentMessage {
        message_id: String,
        from: String,
        to: String,
        content: Value,
    },
    ElicitationRequired {
        message_id: String,
        agent: String,
        question: String,
    },
    WorkflowUpdate {
        status: String,
        detail: String,
    },
}

impl WorkflowEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            WorkflowEvent::AgentActivated { .. } => "agent_activated",
            WorkflowEvent::AgentCompleted { .. } => "agent_completed",
            WorkflowEvent::AgentMessage { .. } => "agent_message",
            WorkflowEvent::ElicitationRequired { .. } => "elicitation_required",
            WorkflowEvent::WorkflowUpdate { .. } => "workflow_update",
        }
    }

    pub fn payload(&self, workflow_id: &str) -> Value {
        match self {
            WorkflowEvent::AgentActivated { agent, step } => json!({
                "workflowId": workflow_id,
                "agent": agent,
                "step": step,
            }),
            WorkflowEvent::AgentCompleted { agent, step } => json!({
                "workflowId": workflow_id,
                "agent": agent,
                "step": step,
            }),
            WorkflowEvent::AgentMessage {
                message_id,
                from,
                to,
                content,
            } => json!({
                "workflowId": workflow_id,
                "messageId": message_id,
                "from": from,
                "to": to,
                "content": content,
            }),
            WorkflowEvent::ElicitationRequired {
                message_id,
                agent,
                question,
            } => json!({
                "workflowId": workflow_id,
                "messageId": message_id,
                "agent": agent,
                "question": question,
            }),
            WorkflowEvent::WorkflowUpdate { status, detail } => json!({
                "workflowId": workflow_id,
                "status": status,
                "detail": detail,
            }),
        }
    }
}

pub fn workflow_channel(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}")
}

// Transport failures are logged and swallowed; publication never fails the workflow.
pub fn publish_event(
    notifier: &dyn NotificationChannel,
    state_root: &Path,
    workflow_id: &str,
    event: &WorkflowEvent,
) {
    let channel = workflow_channel(workflow_id);
    let payload = event.payload(workflow_id);
    if let Err(err) = notifier.publish(&channel, event.event_name(), &payload) {
        let _ = append_engine_log_line(
            state_root,
            &format!("notify publish failed for workflow `{workflow_id}`: {err}"),
        );
    }
}
