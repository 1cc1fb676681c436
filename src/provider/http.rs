use crate::config::AgentProfile;
use crate::provider::{AiCompletion, AiInvoker, ProviderError, Usage};
use crate::workflow::{LogMessage, MessageKind};
use serde::Deserialize;
use serde_json::json;

// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpAiInvoker {
    endpoint: String,
    api_key: String,
    default_model: String,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
}

impl HttpAiInvoker {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        HttpAiInvoker {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            default_model: default_model.into(),
        }
    }

    fn history_role(kind: MessageKind) -> &'static str {
        match kind {
            MessageKind::UserMessage => "user",
            MessageKind::AgentQuestion
            | MessageKind::AgentStatus
            | MessageKind::ApprovalRequest => "assistant",
            MessageKind::System => "system",
        }
    }
}

impl AiInvoker for HttpAiInvoker {
    fn generate(
        &self,
        agent: &AgentProfile,
        prompt: &str,
        history: &[LogMessage],
        user_id: Option<&str>,
    ) -> Result<AiCompletion, ProviderError> {
        let model = agent
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut messages = Vec::with_capacity(history.len() + 2);
        let system = if agent.persona.is_empty() {
            format!("You are acting as: {}.", agent.role)
        } else {
            format!("You are acting as: {}. {}", agent.role, agent.persona)
        };
        messages.push(json!({ "role": "system", "content": system }));
        for entry in history {
            let content = match &entry.content {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            messages.push(json!({
                "role": Self::history_role(entry.kind),
                "content": content,
            }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let mut body = json!({ "model": model, "messages": messages });
        if let Some(user) = user_id {
            body["user"] = json!(user);
        }

        let response = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let envelope: ChatEnvelope = response
            .into_json()
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(ProviderError::Api(error.message));
        }
        let choice = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no choices returned".to_string()))?;

        Ok(AiCompletion {
            content: choice.message.content,
            provider: envelope.model.unwrap_or(model),
            usage: envelope.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}
