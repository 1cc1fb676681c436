pub mod interactive;

pub use interactive::{MessageOutcome, MessageRequest, Messenger};

pub(crate) fn pending_key(message_id: &str) -> String {
    format!("pending:{message_id}")
}

pub(crate) fn response_key(message_id: &str) -> String {
    format!("response:{message_id}")
}

pub(crate) fn pending_index_key(workflow_id: &str) -> String {
    format!("workflow:{workflow_id}:pending")
}
