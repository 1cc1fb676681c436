use crate::shared::fs_atomic::atomic_write_file;
use crate::store::{StoreError, WorkflowStore};
use crate::workflow::{LogMessage, Workflow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const APPEND_MAX_ATTEMPTS: usize = 64;

// Record at `workflows/<id>/workflow.json`; message log as one
// `<seq>-<messageId>.json` file per message, created with `create_new` so
// concurrent appends allocate distinct sequence slots.
#[derive(Debug, Clone)]
pub struct FileWorkflowStore {
    state_root: PathBuf,
}

impl FileWorkflowStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        FileWorkflowStore {
            state_root: state_root.into(),
        }
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    fn workflow_dir(&self, workflow_id: &str) -> PathBuf {
        self.state_root.join("workflows").join(workflow_id)
    }

    fn record_path(&self, workflow_id: &str) -> PathBuf {
        self.workflow_dir(workflow_id).join("workflow.json")
    }

    fn messages_dir(&self, workflow_id: &str) -> PathBuf {
        self.workflow_dir(workflow_id).join("messages")
    }

    fn next_sequence(dir: &Path) -> Result<u64, StoreError> {
        match fs::read_dir(dir) {
            Ok(entries) => Ok(entries.filter_map(|e| e.ok()).count() as u64),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(io_err(dir, err)),
        }
    }
}

impl WorkflowStore for FileWorkflowStore {
    fn find_by_workflow_id(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        let path = self.record_path(workflow_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        let workflow: Workflow = serde_json::from_str(&raw).map_err(|e| json_err(&path, e))?;
        Ok(Some(workflow))
    }

    fn upsert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let path = self.record_path(&workflow.workflow_id);
        let body = serde_json::to_vec_pretty(workflow).map_err(|e| json_err(&path, e))?;
        atomic_write_file(&path, &body).map_err(|e| io_err(&path, e))
    }

    fn append_message(&self, workflow_id: &str, message: &LogMessage) -> Result<(), StoreError> {
        let dir = self.messages_dir(workflow_id);
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let body = serde_json::to_vec_pretty(message).map_err(|e| json_err(&dir, e))?;

        let mut seq = Self::next_sequence(&dir)?;
        for _ in 0..APPEND_MAX_ATTEMPTS {
            let path = dir.join(format!("{seq:08}-{}.json", message.id));
            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(&body).map_err(|e| io_err(&path, e))?;
                    file.sync_all().map_err(|e| io_err(&path, e))?;
                    return Ok(());
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    seq += 1;
                }
                Err(err) => return Err(io_err(&path, err)),
            }
        }
        Err(io_err(
            &dir,
            std::io::Error::other("failed to allocate a message sequence slot"),
        ))
    }

    fn load_messages(&self, workflow_id: &str) -> Result<Vec<LogMessage>, StoreError> {
        let dir = self.messages_dir(workflow_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&dir, err)),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|v| v.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let mut messages = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let message: LogMessage =
                serde_json::from_str(&raw).map_err(|e| json_err(&path, e))?;
            messages.push(message);
        }
        Ok(messages)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> StoreError {
    StoreError::Json {
        path: path.display().to_string(),
        source,
    }
}
