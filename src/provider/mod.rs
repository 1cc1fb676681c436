pub mod http;
pub mod output_parse;

pub use http::HttpAiInvoker;
pub use output_parse::parse_question_list;

use crate::config::AgentProfile;
use crate::workflow::LogMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(String),
    #[error("provider returned an error: {0}")]
    Api(String),
    #[error("provider response malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCompletion {
    pub content: String,
    pub provider: String,
    #[serde(default)]
    pub usage: Option<Usage>,
}

pub trait AiInvoker {
    fn generate(
        &self,
        agent: &AgentProfile,
        prompt: &str,
        history: &[LogMessage],
        user_id: Option<&str>,
    ) -> Result<AiCompletion, ProviderError>;
}
