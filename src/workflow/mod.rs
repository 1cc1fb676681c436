pub mod context;
pub mod message;
pub mod record;
pub mod status;
pub mod step;

pub use context::{Artifact, ElicitationEntry, WorkflowContext};
pub use message::{LogMessage, MessageKind};
pub use record::{Workflow, WorkflowErrorEntry};
pub use status::WorkflowStatus;
pub use step::{RawStep, RouteDefinition, StepDefinition, StepKind};
