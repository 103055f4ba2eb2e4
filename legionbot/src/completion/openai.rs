//! Client for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use legionbot_core::error::CompletionError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Completion;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Remote completion backend.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompletion {
    /// Creates a client for `endpoint` (the API base, without
    /// `/chat/completions`).
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::Request` if the HTTP client cannot be built.
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatTurn {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatTurn {
            role: "user",
            content: user,
        });
        ChatRequest {
            model: &self.model,
            messages,
        }
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        debug!(url = %self.url, model = %self.model, "requesting completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request(system, user))
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Request(format!("HTTP {}", status.as_u16())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidFormat(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidFormat("no choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_chat_completions_url() {
        let client = OpenAiCompletion::new("https://api.example.com/v1/", "m", "k").unwrap();
        assert_eq!(client.url, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn omits_empty_system_turn() {
        let client = OpenAiCompletion::new("http://localhost", "m", "k").unwrap();
        let body = serde_json::to_value(client.request("", "hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "m", "messages": [{"role": "user", "content": "hello"}]})
        );
    }

    #[test]
    fn parses_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"RESULT hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content, "RESULT hi");
    }
}
