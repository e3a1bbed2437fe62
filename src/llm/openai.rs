//! Remote backend: OpenAI chat completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::backend::ModelBackend;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const MODEL: &str = "gpt-4-1106-preview";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI chat-completions backend.
///
/// Temperature is pinned to 0 so repeated runs over the same mailbox produce
/// the same verdicts; the caller's `max_tokens` (1 for verdicts) forces a
/// single-token True/False answer.
pub struct OpenAiBackend {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn extract_content(response: ChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: "no message content in first choice".to_string(),
        })
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn model_name(&self) -> &str {
        MODEL
    }

    async fn submit(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "max_tokens": max_tokens,
            "temperature": 0.0,
        });

        debug!(model = MODEL, max_tokens, "Submitting chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LlmError::Status {
                provider: "openai".to_string(),
                status: response.status().as_u16(),
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        extract_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChatCompletionResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn extracts_first_choice_content() {
        let response = parse(
            r#"{"choices": [{"message": {"role": "assistant", "content": "True"}}]}"#,
        );
        assert_eq!(extract_content(response).unwrap(), "True");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let response = parse(
            r#"{"choices": [{"message": {"role": "assistant", "content": " False\n"}}]}"#,
        );
        assert_eq!(extract_content(response).unwrap(), "False");
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let response = parse(r#"{"choices": []}"#);
        assert!(matches!(
            extract_content(response),
            Err(LlmError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn null_content_is_invalid_response() {
        let response = parse(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#);
        assert!(extract_content(response).is_err());
    }
}
