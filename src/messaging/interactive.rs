use crate::messaging::{pending_index_key, pending_key, response_key};
use crate::notify::{publish_event, NotificationChannel, WorkflowEvent};
use crate::orchestration::error::EngineError;
use crate::shared::ids::generate_message_id;
use crate::shared::logging::append_engine_log_line;
use crate::shared::time::unix_millis;
use crate::store::WorkflowStore;
use crate::waitq::WaitQueue;
use crate::workflow::{LogMessage, MessageKind};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};

// How long a stored response stays retrievable for its poller.
const RESPONSE_TTL_SECONDS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRequest {
    pub from: String,
    pub to: String,
    pub kind: MessageKind,
    pub content: Value,
    pub requires_response: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Sent {
        message_id: String,
    },
    Answered {
        message_id: String,
        response: Value,
    },
}

impl MessageOutcome {
    pub fn response_text(&self) -> Option<String> {
        match self {
            MessageOutcome::Sent { .. } => None,
            MessageOutcome::Answered { response, .. } => Some(match response {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        }
    }
}

// The pending record in the queue is the only synchronization state for a
// wait; no in-memory future survives it, so the hosting process may be
// replaced between the ask and the answer.
pub struct Messenger<'a> {
    store: &'a dyn WorkflowStore,
    waitq: &'a dyn WaitQueue,
    notifier: &'a dyn NotificationChannel,
    state_root: &'a Path,
    poll_interval: Duration,
}

impl<'a> Messenger<'a> {
    pub fn new(
        store: &'a dyn WorkflowStore,
        waitq: &'a dyn WaitQueue,
        notifier: &'a dyn NotificationChannel,
        state_root: &'a Path,
        poll_interval: Duration,
    ) -> Self {
        Messenger {
            store,
            waitq,
            notifier,
            state_root,
            poll_interval,
        }
    }

    pub fn send_message_and_wait(
        &self,
        workflow_id: &str,
        request: &MessageRequest,
        timeout_ms: u64,
    ) -> Result<MessageOutcome, EngineError> {
        let now = unix_millis();
        let message_id = generate_message_id(now).map_err(EngineError::IdGeneration)?;

        let message = LogMessage {
            id: message_id.clone(),
            from: request.from.clone(),
            to: request.to.clone(),
            kind: request.kind,
            content: request.content.clone(),
            timestamp: now,
        };
        // Message-append persistence failures keep the workflow alive.
        if let Err(err) = self.store.append_message(workflow_id, &message) {
            let _ = append_engine_log_line(
                self.state_root,
                &format!("message append failed for workflow `{workflow_id}`: {err}"),
            );
        }

        let event = if request.requires_response {
            WorkflowEvent::ElicitationRequired {
                message_id: message_id.clone(),
                agent: request.from.clone(),
                question: content_text(&request.content),
            }
        } else {
            WorkflowEvent::AgentMessage {
                message_id: message_id.clone(),
                from: request.from.clone(),
                to: request.to.clone(),
                content: request.content.clone(),
            }
        };
        publish_event(self.notifier, self.state_root, workflow_id, &event);

        if !request.requires_response {
            return Ok(MessageOutcome::Sent { message_id });
        }

        let ttl_seconds = timeout_ms.div_ceil(1000).max(1);
        self.waitq.set(
            &pending_key(&message_id),
            &json!({
                "workflowId": workflow_id,
                "agent": request.from,
                "createdAt": now,
                "status": "waiting",
            }),
            Some(ttl_seconds),
        )?;
        self.waitq
            .lpush(&pending_index_key(workflow_id), &json!(message_id))?;

        self.poll_for_response(workflow_id, &message_id, timeout_ms)
    }

    fn poll_for_response(
        &self,
        workflow_id: &str,
        message_id: &str,
        timeout_ms: u64,
    ) -> Result<MessageOutcome, EngineError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(response) = self.waitq.get(&response_key(message_id))? {
                self.waitq.del(&response_key(message_id))?;
                self.waitq.del(&pending_key(message_id))?;
                self.remove_from_pending_index(workflow_id, message_id)?;
                return Ok(MessageOutcome::Answered {
                    message_id: message_id.to_string(),
                    response,
                });
            }

            // Timeout is checked before the cancellation probe: the pending
            // record's TTL equals the timeout, so its natural expiry must
            // read as a timeout, not an external cancellation.
            if Instant::now() >= deadline {
                self.waitq.del(&pending_key(message_id))?;
                self.remove_from_pending_index(workflow_id, message_id)?;
                return Err(EngineError::ResponseTimeout {
                    message_id: message_id.to_string(),
                    timeout_ms,
                });
            }

            if self.waitq.get(&pending_key(message_id))?.is_none() {
                // An answer consumes the pending record too; probe once more
                // for a response that landed between the two checks before
                // treating the disappearance as a cancellation.
                if let Some(response) = self.waitq.get(&response_key(message_id))? {
                    self.waitq.del(&response_key(message_id))?;
                    self.remove_from_pending_index(workflow_id, message_id)?;
                    return Ok(MessageOutcome::Answered {
                        message_id: message_id.to_string(),
                        response,
                    });
                }
                return Err(EngineError::ResponseCancelled {
                    message_id: message_id.to_string(),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }

    // Returns `false` without side effects when no wait is pending for the
    // message id; a duplicate or late response is a harmless no-op, and the
    // second of two racing answers loses here.
    pub fn handle_user_response(
        &self,
        message_id: &str,
        response: &Value,
    ) -> Result<bool, EngineError> {
        let Some(pending) = self.waitq.get(&pending_key(message_id))? else {
            return Ok(false);
        };

        if let Some(workflow_id) = pending.get("workflowId").and_then(|v| v.as_str()) {
            let agent = pending
                .get("agent")
                .and_then(|v| v.as_str())
                .unwrap_or("workflow");
            let reply = LogMessage {
                id: format!("{message_id}-reply"),
                from: "user".to_string(),
                to: agent.to_string(),
                kind: MessageKind::UserMessage,
                content: response.clone(),
                timestamp: unix_millis(),
            };
            if let Err(err) = self.store.append_message(workflow_id, &reply) {
                let _ = append_engine_log_line(
                    self.state_root,
                    &format!("reply append failed for workflow `{workflow_id}`: {err}"),
                );
            }
        }

        // Store the response before consuming the pending record: the poller
        // probes for a response first, so it can never misread this window
        // as an external cancellation.
        self.waitq.set(
            &response_key(message_id),
            response,
            Some(RESPONSE_TTL_SECONDS),
        )?;
        self.waitq.del(&pending_key(message_id))?;
        Ok(true)
    }

    // Pollers observe the missing pending record on their next iteration and
    // fail with `ResponseCancelled`.
    pub fn cancel_workflow_responses(
        &self,
        workflow_id: &str,
        reason: &str,
    ) -> Result<usize, EngineError> {
        let mut cancelled = 0;
        for key in self.waitq.keys("pending:*")? {
            let Some(record) = self.waitq.get(&key)? else {
                continue;
            };
            if record.get("workflowId").and_then(|v| v.as_str()) != Some(workflow_id) {
                continue;
            }
            self.waitq.del(&key)?;
            if let Some(message_id) = key.strip_prefix("pending:") {
                self.waitq.del(&response_key(message_id))?;
            }
            cancelled += 1;
        }
        self.waitq.del(&pending_index_key(workflow_id))?;
        let _ = append_engine_log_line(
            self.state_root,
            &format!("cancelled {cancelled} pending wait(s) for workflow `{workflow_id}`: {reason}"),
        );
        Ok(cancelled)
    }

    fn remove_from_pending_index(
        &self,
        workflow_id: &str,
        message_id: &str,
    ) -> Result<(), EngineError> {
        let index_key = pending_index_key(workflow_id);
        let Some(Value::Array(items)) = self.waitq.get(&index_key)? else {
            return Ok(());
        };
        let remaining: Vec<Value> = items
            .into_iter()
            .filter(|item| item.as_str() != Some(message_id))
            .collect();
        if remaining.is_empty() {
            self.waitq.del(&index_key)?;
        } else {
            self.waitq.set(&index_key, &Value::Array(remaining), None)?;
        }
        Ok(())
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
