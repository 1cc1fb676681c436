pub mod agent_step;
pub mod engine;
pub mod error;
pub mod intake;
pub mod routing;

pub use engine::{Engine, RunOutcome, StepOutcome};
pub use error::EngineError;
pub use intake::{cancel_workflow, resume_workflow, start_workflow, ResumeOutcome};
pub use routing::classify_route;
