use crate::config::AgentProfile;
use crate::notify::{publish_event, WorkflowEvent};
use crate::orchestration::engine::{Engine, StepOutcome};
use crate::orchestration::error::EngineError;
use crate::provider::{parse_question_list, AiInvoker};
use crate::shared::logging::append_engine_log_line;
use crate::shared::time::unix_millis;
use crate::workflow::{
    Artifact, ElicitationEntry, MessageKind, StepDefinition, StepKind, Workflow,
};
use crate::messaging::{MessageOutcome, MessageRequest};
use serde_json::json;

// Every wait goes through the Messenger, and the workflow is reloaded fresh
// after each one; its context may have changed while this turn was parked.
pub fn execute_agent_step(
    engine: &Engine<'_>,
    workflow_id: &str,
    step: &StepDefinition,
) -> Result<StepOutcome, EngineError> {
    let StepKind::Agent {
        agent,
        creates,
        outputs,
        ..
    } = &step.kind
    else {
        return Err(EngineError::StepExecution {
            step: step.name.clone(),
            reason: "dispatched as an agent step without an agent".to_string(),
        });
    };

    let result = run_agent_turn(engine, workflow_id, step, agent, creates.as_deref(), outputs);
    if let Err(err) = &result {
        publish_event(
            engine.notifier,
            &engine.config.state_root,
            workflow_id,
            &WorkflowEvent::WorkflowUpdate {
                status: "agent_error".to_string(),
                detail: format!("agent `{agent}` failed in step `{}`: {err}", step.name),
            },
        );
    }
    result
}

fn run_agent_turn(
    engine: &Engine<'_>,
    workflow_id: &str,
    step: &StepDefinition,
    agent: &str,
    creates: Option<&str>,
    outputs: &[String],
) -> Result<StepOutcome, EngineError> {
    let profile = engine
        .config
        .agents
        .get(agent)
        .ok_or_else(|| EngineError::AgentNotFound {
            agent: agent.to_string(),
        })?;
    let invoker = engine
        .invoker
        .ok_or_else(|| EngineError::ServiceUnavailable {
            capability: "ai-invoker".to_string(),
        })?;

    let answers = analysis_phase(engine, invoker, workflow_id, step, agent, profile, outputs)?;

    match creates {
        Some(artifact_name) => artifact_phase(
            engine,
            invoker,
            workflow_id,
            step,
            agent,
            profile,
            artifact_name,
        ),
        None => {
            let mut workflow = engine.load_workflow(workflow_id)?;
            let decision = if answers.is_empty() {
                "acknowledged".to_string()
            } else {
                answers.join("; ")
            };
            workflow
                .context
                .record_decision(step.decision_name(), &decision);
            engine.persist(&mut workflow)?;
            publish_event(
                engine.notifier,
                &engine.config.state_root,
                workflow_id,
                &WorkflowEvent::AgentCompleted {
                    agent: agent.to_string(),
                    step: step.name.clone(),
                },
            );
            Ok(StepOutcome::Completed)
        }
    }
}

// Answers come back in question order.
fn analysis_phase(
    engine: &Engine<'_>,
    invoker: &dyn AiInvoker,
    workflow_id: &str,
    step: &StepDefinition,
    agent: &str,
    profile: &AgentProfile,
    outputs: &[String],
) -> Result<Vec<String>, EngineError> {
    let workflow = engine.load_workflow(workflow_id)?;
    let history = engine.store.load_messages(workflow_id)?;
    let prompt = analysis_prompt(step, &workflow, outputs);
    let completion = invoker
        .generate(profile, &prompt, &history, workflow.initiated_by.as_deref())
        .map_err(|e| EngineError::StepExecution {
            step: step.name.clone(),
            reason: e.to_string(),
        })?;
    let questions = parse_question_list(&completion.content);

    let messenger = engine.messenger();
    let timeout_ms = engine.config.default_response_timeout_ms;
    let mut answers = Vec::with_capacity(questions.len());
    for question in questions {
        let outcome = messenger.send_message_and_wait(
            workflow_id,
            &MessageRequest {
                from: agent.to_string(),
                to: "user".to_string(),
                kind: MessageKind::AgentQuestion,
                content: json!(question),
                requires_response: true,
            },
            timeout_ms,
        )?;
        let answer = outcome.response_text().unwrap_or_default();

        // Reload after the wait; concurrent processing may have moved the
        // context while this invocation was parked.
        let mut workflow = engine.load_workflow(workflow_id)?;
        workflow.context.record_elicitation(ElicitationEntry {
            question,
            answer: answer.clone(),
            agent: agent.to_string(),
            timestamp: unix_millis(),
        });
        engine.persist(&mut workflow)?;
        answers.push(answer);
    }
    Ok(answers)
}

// `yes` persists, `no` rejects the step, anything else is revision feedback.
// Bounded by `max_revision_rounds`.
fn artifact_phase(
    engine: &Engine<'_>,
    invoker: &dyn AiInvoker,
    workflow_id: &str,
    step: &StepDefinition,
    agent: &str,
    profile: &AgentProfile,
    artifact_name: &str,
) -> Result<StepOutcome, EngineError> {
    let messenger = engine.messenger();
    let timeout_ms = engine.config.default_response_timeout_ms;

    publish_event(
        engine.notifier,
        &engine.config.state_root,
        workflow_id,
        &WorkflowEvent::AgentActivated {
            agent: agent.to_string(),
            step: step.name.clone(),
        },
    );
    messenger.send_message_and_wait(
        workflow_id,
        &MessageRequest {
            from: agent.to_string(),
            to: "user".to_string(),
            kind: MessageKind::AgentStatus,
            content: json!(format!("working on `{artifact_name}`")),
            requires_response: false,
        },
        timeout_ms,
    )?;

    let mut feedback: Option<String> = None;
    let mut content: Option<String> = None;
    for _round in 0..=engine.config.max_revision_rounds {
        let workflow = engine.load_workflow(workflow_id)?;
        let history = engine.store.load_messages(workflow_id)?;
        let prompt = generation_prompt(step, &workflow, artifact_name, feedback.as_deref());
        let completion = invoker
            .generate(profile, &prompt, &history, workflow.initiated_by.as_deref())
            .map_err(|e| EngineError::StepExecution {
                step: step.name.clone(),
                reason: e.to_string(),
            })?;

        let outcome = messenger.send_message_and_wait(
            workflow_id,
            &MessageRequest {
                from: agent.to_string(),
                to: "user".to_string(),
                kind: MessageKind::ApprovalRequest,
                content: json!({
                    "artifact": artifact_name,
                    "preview": completion.content,
                    "question": "approve this deliverable? (yes / no / modify)",
                }),
                requires_response: true,
            },
            timeout_ms,
        )?;
        let MessageOutcome::Answered { response, .. } = outcome else {
            return Err(EngineError::StepExecution {
                step: step.name.clone(),
                reason: "approval request completed without a response".to_string(),
            });
        };
        let answer = match &response {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let verdict = answer.trim().to_lowercase();

        if verdict == "yes" || verdict == "approve" || verdict == "approved" {
            content = Some(completion.content);
            break;
        }
        if verdict == "no" || verdict == "reject" || verdict == "rejected" {
            return Err(EngineError::ArtifactRejected {
                step: step.name.clone(),
            });
        }
        feedback = Some(
            verdict
                .strip_prefix("modify")
                .map(|rest| rest.trim_start_matches([':', ' ']).to_string())
                .filter(|rest| !rest.is_empty())
                .unwrap_or(answer),
        );
    }

    let Some(content) = content else {
        return Err(EngineError::RevisionLimitExceeded {
            step: step.name.clone(),
            max_revision_rounds: engine.config.max_revision_rounds,
        });
    };

    let mut workflow = engine.load_workflow(workflow_id)?;
    workflow.context.record_artifact(Artifact {
        name: artifact_name.to_string(),
        content: content.clone(),
        produced_by: agent.to_string(),
        created_at: unix_millis(),
    });
    engine.persist(&mut workflow)?;

    if let Some(repo) = engine.repo {
        let path = artifact_repo_path(artifact_name);
        let commit_message = format!("Add {artifact_name} produced by {agent}");
        if let Err(err) = repo.write_file(&path, &content, &commit_message) {
            // The artifact is already durable in context; a repository push
            // failure is not worth failing the step over.
            let _ = append_engine_log_line(
                &engine.config.state_root,
                &format!("repository write failed for `{path}`: {err}"),
            );
        }
    }

    messenger.send_message_and_wait(
        workflow_id,
        &MessageRequest {
            from: agent.to_string(),
            to: "user".to_string(),
            kind: MessageKind::AgentStatus,
            content: json!(format!("`{artifact_name}` approved and saved")),
            requires_response: false,
        },
        timeout_ms,
    )?;
    publish_event(
        engine.notifier,
        &engine.config.state_root,
        workflow_id,
        &WorkflowEvent::AgentCompleted {
            agent: agent.to_string(),
            step: step.name.clone(),
        },
    );
    Ok(StepOutcome::Completed)
}

fn artifact_repo_path(artifact_name: &str) -> String {
    if artifact_name.contains('/') {
        artifact_name.to_string()
    } else {
        format!("docs/{artifact_name}")
    }
}

fn context_summary(workflow: &Workflow) -> String {
    let mut lines = Vec::new();
    for (key, value) in &workflow.context.decisions {
        lines.push(format!("decision `{key}`: {value}"));
    }
    for name in workflow.context.artifacts.keys() {
        lines.push(format!("artifact available: `{name}`"));
    }
    for entry in &workflow.context.elicitations {
        lines.push(format!("Q: {} / A: {}", entry.question, entry.answer));
    }
    if lines.is_empty() {
        "none yet".to_string()
    } else {
        lines.join("\n")
    }
}

fn analysis_prompt(step: &StepDefinition, workflow: &Workflow, outputs: &[String]) -> String {
    let declared = if outputs.is_empty() {
        "none declared".to_string()
    } else {
        outputs.join(", ")
    };
    format!(
        "You are preparing step `{}`.\n\
         Declared outputs: {declared}.\n\
         Prior context:\n{}\n\n\
         List the clarifying questions you need answered before starting, \
         as a JSON array of strings. Return [] if none are needed.",
        step.name,
        context_summary(workflow),
    )
}

fn generation_prompt(
    step: &StepDefinition,
    workflow: &Workflow,
    artifact_name: &str,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Produce the deliverable `{artifact_name}` for step `{}`.\n\
         Prior context:\n{}\n\n\
         Return only the deliverable content.",
        step.name,
        context_summary(workflow),
    );
    if let Some(feedback) = feedback {
        prompt.push_str(&format!(
            "\n\nThe reviewer asked for changes to the previous version:\n{feedback}"
        ));
    }
    prompt
}
