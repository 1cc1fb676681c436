use crate::notify::{NotificationChannel, NotifyError};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

// Appends published events as JSON lines under `notify/<channel>.jsonl`.
#[derive(Debug, Clone)]
pub struct FileNotifier {
    root: PathBuf,
}

impl FileNotifier {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        FileNotifier {
            root: state_root.into().join("notify"),
        }
    }

    pub fn published(&self, channel: &str) -> Vec<Value> {
        let path = self.channel_path(channel);
        let Ok(raw) = fs::read_to_string(&path) else {
            return Vec::new();
        };
        raw.lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    fn channel_path(&self, channel: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", channel.replace(':', "__")))
    }
}

impl NotificationChannel for FileNotifier {
    fn publish(&self, channel: &str, event: &str, payload: &Value) -> Result<(), NotifyError> {
        let path = self.channel_path(channel);
        let fail = |reason: String| NotifyError {
            channel: channel.to_string(),
            reason,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let line = json!({ "event": event, "payload": payload });
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| fail(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| fail(e.to_string()))
    }
}
