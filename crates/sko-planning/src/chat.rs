//! Minimal OpenAI-compatible chat-completions client shared by the menu
//! and bill boundaries. Request/response shapes are fixed by the
//! upstream API; prompt construction stays in the calling modules.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::PlannerError;

pub(crate) struct ChatClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub(crate) fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Send one completion request and return the first choice's message
    /// content. `temperature` is pinned to 0 and the response format to a
    /// JSON object — every caller decodes structured output.
    pub(crate) async fn complete(
        &self,
        model: &str,
        messages: Vec<Value>,
    ) -> Result<String, PlannerError> {
        if self.api_key.trim().is_empty() {
            return Err(PlannerError::Config("planner api key is empty".to_string()));
        }

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": 0,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .http
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlannerError::Transport(e.to_string()))?;

        let status = resp.status();
        let payload: ChatResponse = resp
            .json()
            .await
            .map_err(|e| PlannerError::Decode(format!("chat response json: {e}")))?;

        if let Some(err) = payload.error {
            return Err(PlannerError::Api {
                code: err.code,
                message: err.message,
            });
        }
        if !status.is_success() {
            return Err(PlannerError::Api {
                code: Some(status.as_u16() as i64),
                message: "chat completion request rejected".to_string(),
            });
        }

        payload
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PlannerError::Decode("chat response has no choices".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}
