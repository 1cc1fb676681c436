use maestro::store::{FileWorkflowStore, WorkflowStore};
use maestro::workflow::{
    LogMessage, MessageKind, Workflow, WorkflowContext, WorkflowStatus,
};
use serde_json::json;
use tempfile::tempdir;

fn sample_workflow(workflow_id: &str) -> Workflow {
    Workflow {
        workflow_id: workflow_id.to_string(),
        template: "greenfield".to_string(),
        status: WorkflowStatus::Running,
        steps: Vec::new(),
        current_step: 0,
        context: WorkflowContext::default(),
        errors: Vec::new(),
        initiated_by: Some("user-1".to_string()),
        created_at: 1,
        updated_at: 1,
    }
}

fn message(id: &str, content: serde_json::Value) -> LogMessage {
    LogMessage {
        id: id.to_string(),
        from: "analyst".to_string(),
        to: "user".to_string(),
        kind: MessageKind::AgentQuestion,
        content,
        timestamp: 10,
    }
}

#[test]
fn upsert_and_find_round_trip_the_record() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());

    assert!(store.find_by_workflow_id("wf-a").expect("find").is_none());

    let mut workflow = sample_workflow("wf-a");
    workflow.context.record_decision("assess_scope", "small fix");
    store.upsert(&workflow).expect("upsert");

    let loaded = store
        .find_by_workflow_id("wf-a")
        .expect("find")
        .expect("present");
    assert_eq!(loaded, workflow);
    assert_eq!(loaded.context.decisions["assess_scope"], "small fix");
}

#[test]
fn message_append_preserves_order_and_structured_content() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());

    let structured = json!({
        "artifact": "spec.md",
        "preview": "# Spec\nbody",
        "question": "approve this deliverable? (yes / no / modify)",
    });
    store
        .append_message("wf-a", &message("m-1", json!("first")))
        .expect("append");
    store
        .append_message("wf-a", &message("m-2", structured.clone()))
        .expect("append");
    store
        .append_message("wf-a", &message("m-3", json!(42)))
        .expect("append");

    let log = store.load_messages("wf-a").expect("load");
    assert_eq!(log.len(), 3);
    assert_eq!(
        log.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec!["m-1", "m-2", "m-3"]
    );
    // Non-string content must come back structurally identical, never
    // stringified or truncated.
    assert_eq!(log[1].content, structured);
    assert_eq!(log[2].content, json!(42));
}

#[test]
fn message_logs_are_isolated_per_workflow() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());

    store
        .append_message("wf-a", &message("m-1", json!("for a")))
        .expect("append");
    store
        .append_message("wf-b", &message("m-2", json!("for b")))
        .expect("append");

    assert_eq!(store.load_messages("wf-a").expect("load").len(), 1);
    assert_eq!(store.load_messages("wf-b").expect("load").len(), 1);
    assert!(store.load_messages("wf-c").expect("load").is_empty());
}

#[test]
fn upsert_replaces_the_record_atomically() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());

    let mut workflow = sample_workflow("wf-a");
    store.upsert(&workflow).expect("upsert");
    workflow.current_step = 2;
    workflow.status = WorkflowStatus::Completed;
    store.upsert(&workflow).expect("upsert again");

    let loaded = store
        .find_by_workflow_id("wf-a")
        .expect("find")
        .expect("present");
    assert_eq!(loaded.current_step, 2);
    assert_eq!(loaded.status, WorkflowStatus::Completed);
}
