use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::time::unix_millis;
use crate::waitq::{WaitQueue, WaitQueueError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueEntry {
    value: Value,
    // Unix millis; `None` means no expiry.
    expires_at: Option<i64>,
}

impl QueueEntry {
    fn expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// One JSON file per key under `waitq/`. TTL is lazy: an expired entry is
// deleted when a read observes it.
#[derive(Debug, Clone)]
pub struct FileWaitQueue {
    root: PathBuf,
}

impl FileWaitQueue {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        FileWaitQueue {
            root: state_root.into().join("waitq"),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }

    fn read_entry(&self, key: &str) -> Result<Option<QueueEntry>, WaitQueueError> {
        let path = self.key_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        let entry: QueueEntry = serde_json::from_str(&raw).map_err(|e| json_err(&path, e))?;
        if entry.expired(unix_millis()) {
            let _ = fs::remove_file(&path);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn write_entry(&self, key: &str, entry: &QueueEntry) -> Result<(), WaitQueueError> {
        let path = self.key_path(key);
        let body = serde_json::to_vec_pretty(entry).map_err(|e| json_err(&path, e))?;
        atomic_write_file(&path, &body).map_err(|e| io_err(&path, e))
    }
}

impl WaitQueue for FileWaitQueue {
    fn set(
        &self,
        key: &str,
        value: &Value,
        ttl_seconds: Option<u64>,
    ) -> Result<(), WaitQueueError> {
        let expires_at = ttl_seconds.map(|ttl| unix_millis() + (ttl as i64) * 1000);
        self.write_entry(
            key,
            &QueueEntry {
                value: value.clone(),
                expires_at,
            },
        )
    }

    fn get(&self, key: &str) -> Result<Option<Value>, WaitQueueError> {
        Ok(self.read_entry(key)?.map(|entry| entry.value))
    }

    fn del(&self, key: &str) -> Result<bool, WaitQueueError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_err(&path, err)),
        }
    }

    fn lpush(&self, list_key: &str, value: &Value) -> Result<(), WaitQueueError> {
        let mut items = match self.read_entry(list_key)? {
            Some(QueueEntry {
                value: Value::Array(items),
                ..
            }) => items,
            Some(entry) => vec![entry.value],
            None => Vec::new(),
        };
        items.insert(0, value.clone());
        self.write_entry(
            list_key,
            &QueueEntry {
                value: Value::Array(items),
                expires_at: None,
            },
        )
    }

    fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, WaitQueueError> {
        let Some(mut entry) = self.read_entry(key)? else {
            return Ok(false);
        };
        entry.expires_at = Some(unix_millis() + (ttl_seconds as i64) * 1000);
        self.write_entry(key, &entry)?;
        Ok(true)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>, WaitQueueError> {
        let prefix = match pattern.strip_suffix('*') {
            Some(prefix) if !prefix.contains('*') => prefix.to_string(),
            None if !pattern.contains('*') => pattern.to_string(),
            _ => return Err(WaitQueueError::UnsupportedPattern(pattern.to_string())),
        };
        let literal = !pattern.ends_with('*');

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&self.root, err)),
        };

        let now = unix_millis();
        let mut matched = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|v| v.to_str()) else {
                continue;
            };
            let key = decode_key(stem);
            let hit = if literal {
                key == prefix
            } else {
                key.starts_with(&prefix)
            };
            if !hit {
                continue;
            }
            // Expired keys are invisible and reaped on observation.
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(io_err(&path, err)),
            };
            match serde_json::from_str::<QueueEntry>(&raw) {
                Ok(parsed) if parsed.expired(now) => {
                    let _ = fs::remove_file(&path);
                }
                Ok(_) => matched.push(key),
                Err(err) => return Err(json_err(&path, err)),
            }
        }
        matched.sort();
        Ok(matched)
    }
}

fn encode_key(key: &str) -> String {
    key.replace(':', "__")
}

fn decode_key(stem: &str) -> String {
    stem.replace("__", ":")
}

fn io_err(path: &Path, source: std::io::Error) -> WaitQueueError {
    WaitQueueError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> WaitQueueError {
    WaitQueueError::Json {
        path: path.display().to_string(),
        source,
    }
}
