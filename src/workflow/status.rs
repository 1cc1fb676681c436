use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initializing,
    Running,
    Paused,
    PausedForElicitation,
    Error,
    Completed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (WorkflowStatus::Initializing, WorkflowStatus::Running)
                | (WorkflowStatus::Initializing, WorkflowStatus::Cancelled)
                | (WorkflowStatus::Initializing, WorkflowStatus::Error)
                | (WorkflowStatus::Running, WorkflowStatus::Paused)
                | (WorkflowStatus::Running, WorkflowStatus::PausedForElicitation)
                | (WorkflowStatus::Running, WorkflowStatus::Completed)
                | (WorkflowStatus::Running, WorkflowStatus::Cancelled)
                | (WorkflowStatus::Running, WorkflowStatus::Error)
                | (WorkflowStatus::Paused, WorkflowStatus::Running)
                | (WorkflowStatus::Paused, WorkflowStatus::Cancelled)
                | (WorkflowStatus::Paused, WorkflowStatus::Error)
                | (WorkflowStatus::PausedForElicitation, WorkflowStatus::Running)
                | (WorkflowStatus::PausedForElicitation, WorkflowStatus::Cancelled)
                | (WorkflowStatus::PausedForElicitation, WorkflowStatus::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Cancelled | WorkflowStatus::Error
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Initializing => write!(f, "initializing"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Paused => write!(f, "paused"),
            WorkflowStatus::PausedForElicitation => write!(f, "paused_for_elicitation"),
            WorkflowStatus::Error => write!(f, "error"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
