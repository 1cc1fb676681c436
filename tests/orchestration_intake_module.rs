use maestro::config::EngineConfig;
use maestro::notify::FileNotifier;
use maestro::orchestration::{
    cancel_workflow, resume_workflow, start_workflow, Engine, EngineError, ResumeOutcome,
};
use maestro::store::{FileWorkflowStore, StoreError, WorkflowStore};
use maestro::waitq::{FileWaitQueue, WaitQueue};
use maestro::workflow::{RawStep, WorkflowStatus};
use serde_json::json;
use tempfile::tempdir;

fn config_with_pause_template(state_root: &std::path::Path) -> EngineConfig {
    let mut config = EngineConfig::new(state_root);
    config.poll_interval_ms = 10;
    config.templates.insert(
        "interview".to_string(),
        maestro::config::WorkflowTemplateConfig {
            description: "container, pause, container".to_string(),
            steps: vec![
                RawStep {
                    name: "prepare".to_string(),
                    ..RawStep::default()
                },
                RawStep {
                    name: "wait_for_user".to_string(),
                    action: Some("pause_for_input".to_string()),
                    ..RawStep::default()
                },
                RawStep {
                    name: "wrap_up".to_string(),
                    ..RawStep::default()
                },
            ],
        },
    );
    config
}

#[test]
fn start_rejects_unknown_templates() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = EngineConfig::new(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    assert!(matches!(
        start_workflow(&engine, None, "missing", "do things", None),
        Err(EngineError::UnknownTemplate { .. })
    ));
}

#[test]
fn start_runs_until_the_pause_and_resume_finishes_the_sequence() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    let (workflow_id, outcome) =
        start_workflow(&engine, None, "interview", "kick things off", Some("user-1"))
            .expect("start");
    assert_eq!(outcome.status, WorkflowStatus::PausedForElicitation);

    let loaded = store
        .find_by_workflow_id(&workflow_id)
        .expect("find")
        .expect("present");
    assert_eq!(loaded.current_step, 1);
    assert_eq!(loaded.initiated_by.as_deref(), Some("user-1"));
    assert_eq!(loaded.template, "interview");

    // The launch prompt is the first entry on the message log.
    let log = store.load_messages(&workflow_id).expect("log");
    assert_eq!(log[0].content, json!("kick things off"));

    let resumed = resume_workflow(&engine, &workflow_id, None, &json!("here is my input"))
        .expect("resume");
    let ResumeOutcome::Resumed(outcome) = resumed else {
        panic!("expected the loop to re-enter");
    };
    assert_eq!(outcome.status, WorkflowStatus::Completed);

    let loaded = store
        .find_by_workflow_id(&workflow_id)
        .expect("find")
        .expect("present");
    assert!(loaded.sequence_exhausted());
    assert_eq!(loaded.context.elicitations.len(), 1);
    assert_eq!(loaded.context.elicitations[0].question, "wait_for_user");
    assert_eq!(loaded.context.elicitations[0].answer, "here is my input");
}

#[test]
fn resume_without_a_pause_or_pending_wait_is_rejected_or_ignored() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    let (workflow_id, _) =
        start_workflow(&engine, None, "interview", "kick off", None).expect("start");

    // A response addressed to a message nobody is waiting on is a no-op.
    assert_eq!(
        resume_workflow(&engine, &workflow_id, Some("msg-unknown"), &json!("hello"))
            .expect("resume"),
        ResumeOutcome::Ignored
    );

    // Answer the real pause, completing the workflow.
    resume_workflow(&engine, &workflow_id, None, &json!("done")).expect("resume");
    let err = resume_workflow(&engine, &workflow_id, None, &json!("again"))
        .expect_err("terminal workflows cannot resume");
    assert!(matches!(err, EngineError::InvalidStatusTransition { .. }));
}

#[test]
fn resume_with_a_message_id_feeds_a_parked_wait() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    waitq
        .set(
            "pending:msg-1",
            &json!({ "workflowId": "wf-a", "agent": "analyst", "status": "waiting" }),
            Some(60),
        )
        .expect("seed pending");

    assert_eq!(
        resume_workflow(&engine, "wf-a", Some("msg-1"), &json!("yes")).expect("resume"),
        ResumeOutcome::Delivered
    );
    assert_eq!(waitq.get("response:msg-1").expect("get"), Some(json!("yes")));
}

#[test]
fn cancel_flips_status_and_clears_pending_waits() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    let (workflow_id, _) =
        start_workflow(&engine, None, "interview", "kick off", None).expect("start");
    waitq
        .set(
            "pending:msg-1",
            &json!({ "workflowId": workflow_id, "agent": "analyst", "status": "waiting" }),
            Some(60),
        )
        .expect("seed pending");

    cancel_workflow(&engine, &workflow_id, "user abandoned").expect("cancel");

    let loaded = store
        .find_by_workflow_id(&workflow_id)
        .expect("find")
        .expect("present");
    assert_eq!(loaded.status, WorkflowStatus::Cancelled);
    assert!(waitq.keys("pending:*").expect("keys").is_empty());

    // Cancelling a terminal workflow is a no-op.
    cancel_workflow(&engine, &workflow_id, "again").expect("idempotent cancel");
}

// Delegates to the file store but fails every message append.
struct AppendFailingStore {
    inner: FileWorkflowStore,
}

impl WorkflowStore for AppendFailingStore {
    fn find_by_workflow_id(
        &self,
        workflow_id: &str,
    ) -> Result<Option<maestro::workflow::Workflow>, StoreError> {
        self.inner.find_by_workflow_id(workflow_id)
    }

    fn upsert(&self, workflow: &maestro::workflow::Workflow) -> Result<(), StoreError> {
        self.inner.upsert(workflow)
    }

    fn append_message(
        &self,
        _workflow_id: &str,
        _message: &maestro::workflow::LogMessage,
    ) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "messages".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn load_messages(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<maestro::workflow::LogMessage>, StoreError> {
        self.inner.load_messages(workflow_id)
    }
}

#[test]
fn start_survives_a_failing_launch_prompt_append() {
    let dir = tempdir().expect("tempdir");
    let store = AppendFailingStore {
        inner: FileWorkflowStore::new(dir.path()),
    };
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    // The append failure is logged, not propagated; the loop still runs.
    let (workflow_id, outcome) =
        start_workflow(&engine, None, "interview", "kick off", None).expect("start");
    assert_eq!(outcome.status, WorkflowStatus::PausedForElicitation);

    let loaded = store
        .find_by_workflow_id(&workflow_id)
        .expect("find")
        .expect("present");
    assert_eq!(loaded.current_step, 1);

    let log = std::fs::read_to_string(dir.path().join("logs/engine.log")).expect("engine log");
    assert!(log.contains("launch prompt append failed"));
}

#[test]
fn start_rejects_workflow_ids_with_path_characters() {
    let dir = tempdir().expect("tempdir");
    let state_root = dir.path().join("state");
    let store = FileWorkflowStore::new(&state_root);
    let waitq = FileWaitQueue::new(&state_root);
    let notifier = FileNotifier::new(&state_root);
    let config = config_with_pause_template(&state_root);
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    for id in ["../../escaped", "a/b", "wf id", ""] {
        let err = start_workflow(&engine, Some(id), "interview", "kick off", None)
            .expect_err("path-shaped ids must be rejected");
        assert!(matches!(err, EngineError::InvalidWorkflowId(_)), "{id}");
    }

    // Nothing was persisted, inside the state root or above it.
    assert!(!state_root.join("workflows").exists());
    assert!(!dir.path().join("escaped").exists());
}

#[test]
fn start_honours_a_caller_supplied_workflow_id() {
    let dir = tempdir().expect("tempdir");
    let store = FileWorkflowStore::new(dir.path());
    let waitq = FileWaitQueue::new(dir.path());
    let notifier = FileNotifier::new(dir.path());
    let config = config_with_pause_template(dir.path());
    let engine = Engine::new(&store, &waitq, &notifier, &config);

    let (workflow_id, _) =
        start_workflow(&engine, Some("wf-fixed"), "interview", "kick off", None).expect("start");
    assert_eq!(workflow_id, "wf-fixed");
    assert!(store
        .find_by_workflow_id("wf-fixed")
        .expect("find")
        .is_some());
}
