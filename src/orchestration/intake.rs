use crate::notify::{publish_event, WorkflowEvent};
use crate::orchestration::engine::{Engine, RunOutcome};
use crate::orchestration::error::EngineError;
use crate::shared::ids::{generate_workflow_id, validate_identifier_value};
use crate::shared::logging::append_engine_log_line;
use crate::shared::time::unix_millis;
use crate::workflow::{
    ElicitationEntry, LogMessage, MessageKind, Workflow, WorkflowContext, WorkflowStatus,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    // Response stored for a parked wait; its poller picks it up.
    Delivered,
    // No wait was pending for the message id.
    Ignored,
    Resumed(RunOutcome),
}

pub fn start_workflow(
    engine: &Engine<'_>,
    workflow_id: Option<&str>,
    template_name: &str,
    user_prompt: &str,
    user_id: Option<&str>,
) -> Result<(String, RunOutcome), EngineError> {
    let template = engine
        .config
        .templates
        .get(template_name)
        .ok_or_else(|| EngineError::UnknownTemplate {
            template: template_name.to_string(),
        })?;

    let now = unix_millis();
    // The id becomes a path component in the store and a queue key segment.
    let workflow_id = match workflow_id {
        Some(id) => {
            validate_identifier_value("workflow id", id).map_err(EngineError::InvalidWorkflowId)?;
            id.to_string()
        }
        None => generate_workflow_id(now).map_err(EngineError::IdGeneration)?,
    };

    let mut workflow = Workflow {
        workflow_id: workflow_id.clone(),
        template: template_name.to_string(),
        status: WorkflowStatus::Initializing,
        steps: template.resolve_steps(),
        current_step: 0,
        context: WorkflowContext::default(),
        errors: Vec::new(),
        initiated_by: user_id.map(|v| v.to_string()),
        created_at: now,
        updated_at: now,
    };
    engine.transition(&mut workflow, WorkflowStatus::Running)?;
    engine.persist(&mut workflow)?;

    let opening = LogMessage {
        id: format!("{workflow_id}-prompt"),
        from: user_id.unwrap_or("user").to_string(),
        to: "workflow".to_string(),
        kind: MessageKind::UserMessage,
        content: json!(user_prompt),
        timestamp: now,
    };
    if let Err(err) = engine.store.append_message(&workflow_id, &opening) {
        let _ = append_engine_log_line(
            &engine.config.state_root,
            &format!("launch prompt append failed for workflow `{workflow_id}`: {err}"),
        );
    }

    publish_event(
        engine.notifier,
        &engine.config.state_root,
        &workflow_id,
        &WorkflowEvent::WorkflowUpdate {
            status: workflow.status.to_string(),
            detail: format!("started from template `{template_name}`"),
        },
    );

    let outcome = engine.run(&workflow_id)?;
    Ok((workflow_id, outcome))
}

// With a message id the response goes to the parked wait's queue record;
// without one it answers a `pause_for_input` elicitation and re-enters the loop.
pub fn resume_workflow(
    engine: &Engine<'_>,
    workflow_id: &str,
    message_id: Option<&str>,
    response: &Value,
) -> Result<ResumeOutcome, EngineError> {
    if let Some(message_id) = message_id {
        let delivered = engine.messenger().handle_user_response(message_id, response)?;
        return Ok(if delivered {
            ResumeOutcome::Delivered
        } else {
            ResumeOutcome::Ignored
        });
    }

    let mut workflow = engine.load_workflow(workflow_id)?;
    if workflow.status != WorkflowStatus::PausedForElicitation {
        return Err(EngineError::InvalidStatusTransition {
            from: workflow.status,
            to: WorkflowStatus::Running,
        });
    }

    let step_name = workflow
        .current_step_definition()
        .map(|step| step.name.clone())
        .unwrap_or_else(|| "pause".to_string());
    let answer = match response {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    workflow.context.record_elicitation(ElicitationEntry {
        question: step_name,
        answer,
        agent: "workflow".to_string(),
        timestamp: unix_millis(),
    });
    // The pause step is done once answered; move past it before re-entering.
    workflow.current_step += 1;
    engine.transition(&mut workflow, WorkflowStatus::Running)?;
    engine.persist(&mut workflow)?;

    Ok(ResumeOutcome::Resumed(engine.run(workflow_id)?))
}

// Cooperative: a loop already mid-step observes the status on its next reload.
pub fn cancel_workflow(
    engine: &Engine<'_>,
    workflow_id: &str,
    reason: &str,
) -> Result<(), EngineError> {
    let mut workflow = engine.load_workflow(workflow_id)?;
    if workflow.status.is_terminal() {
        return Ok(());
    }
    engine.transition(&mut workflow, WorkflowStatus::Cancelled)?;
    engine.persist(&mut workflow)?;

    engine
        .messenger()
        .cancel_workflow_responses(workflow_id, reason)?;

    publish_event(
        engine.notifier,
        &engine.config.state_root,
        workflow_id,
        &WorkflowEvent::WorkflowUpdate {
            status: workflow.status.to_string(),
            detail: format!("cancelled: {reason}"),
        },
    );
    Ok(())
}
