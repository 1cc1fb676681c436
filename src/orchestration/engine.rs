use crate::config::EngineConfig;
use crate::gitops::RepoWriter;
use crate::messaging::Messenger;
use crate::notify::{publish_event, NotificationChannel, WorkflowEvent};
use crate::orchestration::agent_step::execute_agent_step;
use crate::orchestration::error::EngineError;
use crate::orchestration::routing::{classify_route, decision_text_for};
use crate::provider::AiInvoker;
use crate::shared::time::unix_millis;
use crate::store::WorkflowStore;
use crate::waitq::WaitQueue;
use crate::workflow::{StepDefinition, StepKind, Workflow, WorkflowStatus};
use std::time::Duration;

pub const PAUSE_FOR_INPUT_ACTION: &str = "pause_for_input";

pub type ConditionEval = fn(&Workflow, &str) -> bool;

fn condition_always_true(_workflow: &Workflow, _condition: &str) -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: WorkflowStatus,
    pub steps_executed: u32,
}

// Holds only capabilities and configuration. Workflow state is reloaded from
// the store at every entry point and after every suspension; the hosting
// process may be replaced between any two requests.
pub struct Engine<'a> {
    pub(crate) store: &'a dyn WorkflowStore,
    pub(crate) waitq: &'a dyn WaitQueue,
    pub(crate) notifier: &'a dyn NotificationChannel,
    pub(crate) invoker: Option<&'a dyn AiInvoker>,
    pub(crate) repo: Option<&'a dyn RepoWriter>,
    pub(crate) config: &'a EngineConfig,
    condition_eval: ConditionEval,
}

impl<'a> Engine<'a> {
    pub fn new(
        store: &'a dyn WorkflowStore,
        waitq: &'a dyn WaitQueue,
        notifier: &'a dyn NotificationChannel,
        config: &'a EngineConfig,
    ) -> Self {
        Engine {
            store,
            waitq,
            notifier,
            invoker: None,
            repo: None,
            config,
            condition_eval: condition_always_true,
        }
    }

    pub fn with_invoker(mut self, invoker: &'a dyn AiInvoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn with_repo_writer(mut self, repo: &'a dyn RepoWriter) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_condition_eval(mut self, eval: ConditionEval) -> Self {
        self.condition_eval = eval;
        self
    }

    pub fn messenger(&self) -> Messenger<'_> {
        Messenger::new(
            self.store,
            self.waitq,
            self.notifier,
            &self.config.state_root,
            Duration::from_millis(self.config.poll_interval_ms),
        )
    }

    pub(crate) fn load_workflow(&self, workflow_id: &str) -> Result<Workflow, EngineError> {
        self.store
            .find_by_workflow_id(workflow_id)?
            .ok_or_else(|| EngineError::UnknownWorkflow {
                workflow_id: workflow_id.to_string(),
            })
    }

    pub(crate) fn transition(
        &self,
        workflow: &mut Workflow,
        next: WorkflowStatus,
    ) -> Result<(), EngineError> {
        if !workflow.status.can_transition_to(next) {
            return Err(EngineError::InvalidStatusTransition {
                from: workflow.status,
                to: next,
            });
        }
        workflow.status = next;
        workflow.updated_at = unix_millis();
        Ok(())
    }

    pub(crate) fn persist(&self, workflow: &mut Workflow) -> Result<(), EngineError> {
        workflow.updated_at = unix_millis();
        self.store.upsert(workflow)?;
        Ok(())
    }

    // Reloads before every step so concurrent cancellation is observed.
    // Re-entry on a non-running workflow is a no-op. Step failure records the
    // error, moves to `error`, and re-throws; retrying is the caller's policy.
    pub fn run(&self, workflow_id: &str) -> Result<RunOutcome, EngineError> {
        let mut steps_executed = 0;
        loop {
            let mut workflow = self.load_workflow(workflow_id)?;
            if workflow.status != WorkflowStatus::Running {
                return Ok(RunOutcome {
                    status: workflow.status,
                    steps_executed,
                });
            }

            if workflow.sequence_exhausted() {
                self.transition(&mut workflow, WorkflowStatus::Completed)?;
                self.persist(&mut workflow)?;
                publish_event(
                    self.notifier,
                    &self.config.state_root,
                    workflow_id,
                    &WorkflowEvent::WorkflowUpdate {
                        status: workflow.status.to_string(),
                        detail: "all steps completed".to_string(),
                    },
                );
                return Ok(RunOutcome {
                    status: workflow.status,
                    steps_executed,
                });
            }

            let step_index = workflow.current_step;
            let Some(step) = workflow.current_step_definition().cloned() else {
                return Err(EngineError::StepExecution {
                    step: format!("#{step_index}"),
                    reason: "step cursor points past the sequence".to_string(),
                });
            };

            match self.dispatch_step(workflow_id, &step) {
                Ok(StepOutcome::Completed) => {
                    // The step may have persisted context of its own; trust
                    // only a fresh copy when advancing the cursor.
                    let mut workflow = self.load_workflow(workflow_id)?;
                    if workflow.status != WorkflowStatus::Running {
                        return Ok(RunOutcome {
                            status: workflow.status,
                            steps_executed,
                        });
                    }
                    workflow.current_step = step_index + 1;
                    self.persist(&mut workflow)?;
                    steps_executed += 1;
                }
                Ok(StepOutcome::Paused) => {
                    return Ok(RunOutcome {
                        status: self.load_workflow(workflow_id)?.status,
                        steps_executed,
                    });
                }
                Err(err) => {
                    let mut workflow = self.load_workflow(workflow_id)?;
                    workflow.record_error(step_index, &err.to_string(), unix_millis());
                    if workflow.status.can_transition_to(WorkflowStatus::Error) {
                        workflow.status = WorkflowStatus::Error;
                    }
                    self.persist(&mut workflow)?;
                    publish_event(
                        self.notifier,
                        &self.config.state_root,
                        workflow_id,
                        &WorkflowEvent::WorkflowUpdate {
                            status: workflow.status.to_string(),
                            detail: format!("step `{}` failed: {err}", step.name),
                        },
                    );
                    return Err(err);
                }
            }
        }
    }

    pub fn dispatch_step(
        &self,
        workflow_id: &str,
        step: &StepDefinition,
    ) -> Result<StepOutcome, EngineError> {
        match &step.kind {
            StepKind::Agent { .. } => execute_agent_step(self, workflow_id, step),
            StepKind::Routing {
                routes,
                decision_key,
            } => {
                let mut workflow = self.load_workflow(workflow_id)?;
                let text = decision_text_for(&workflow.context, decision_key.as_deref());
                let selected = classify_route(&text, routes).ok_or_else(|| {
                    EngineError::StepExecution {
                        step: step.name.clone(),
                        reason: "routing step declares no routes".to_string(),
                    }
                })?;
                workflow.context.record_decision(&step.name, &selected);
                self.persist(&mut workflow)?;
                Ok(StepOutcome::Completed)
            }
            StepKind::Action { action } if action == PAUSE_FOR_INPUT_ACTION => {
                let mut workflow = self.load_workflow(workflow_id)?;
                self.transition(&mut workflow, WorkflowStatus::PausedForElicitation)?;
                self.persist(&mut workflow)?;
                publish_event(
                    self.notifier,
                    &self.config.state_root,
                    workflow_id,
                    &WorkflowEvent::WorkflowUpdate {
                        status: workflow.status.to_string(),
                        detail: format!("step `{}` is waiting for user input", step.name),
                    },
                );
                Ok(StepOutcome::Paused)
            }
            // Unknown actions and containers are inert named steps.
            StepKind::Action { .. } | StepKind::Container => Ok(StepOutcome::Completed),
            StepKind::Decision { condition } => {
                let mut workflow = self.load_workflow(workflow_id)?;
                let verdict = (self.condition_eval)(&workflow, condition);
                workflow
                    .context
                    .record_decision(&step.name, if verdict { "true" } else { "false" });
                self.persist(&mut workflow)?;
                Ok(StepOutcome::Completed)
            }
        }
    }
}
