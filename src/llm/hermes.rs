//! Local backend variant B: OpenHermes 2.5 Mistral 7B through Ollama's
//! generate endpoint.
//!
//! The generate endpoint applies no chat template, so the prompt is rendered
//! here in ChatML, the format OpenHermes was tuned on. The model pads its
//! answer with newlines; the verdict text is stripped before it reaches the
//! caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::backend::ModelBackend;

const MODEL: &str = "openhermes2.5-mistral:7b";
const NUM_CTX: u32 = 2048;
const NUM_BATCH: u32 = 1;
/// A few tokens of headroom beyond the single verdict token; the model tends
/// to emit trailing newlines inside this budget.
const NUM_PREDICT: u32 = 8;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// OpenHermes backend over Ollama's generate endpoint.
pub struct HermesBackend {
    client: Client,
    base_url: String,
}

impl HermesBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

/// Render a system/user prompt pair as a ChatML completion prompt.
fn render_chatml(system_prompt: &str, user_prompt: &str) -> String {
    format!(
        "<|im_start|>system\n{system_prompt}<|im_end|>\n\
         <|im_start|>user\n{user_prompt}<|im_end|>\n\
         <|im_start|>assistant\n"
    )
}

/// Strip embedded newlines, then surrounding whitespace. Unlike the other
/// backends this one interleaves newlines with the verdict token.
fn normalize(raw: &str) -> String {
    raw.replace('\n', "").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl ModelBackend for HermesBackend {
    fn model_name(&self) -> &str {
        MODEL
    }

    async fn submit(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": MODEL,
            "prompt": render_chatml(system_prompt, user_prompt),
            "stream": false,
            "options": {
                "temperature": 0.0,
                "num_ctx": NUM_CTX,
                "num_batch": NUM_BATCH,
                "num_predict": NUM_PREDICT,
            },
        });

        debug!(model = MODEL, url = %url, "Submitting generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "hermes".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(LlmError::Status {
                provider: "hermes".to_string(),
                status: response.status().as_u16(),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "hermes".to_string(),
                reason: e.to_string(),
            })?;

        Ok(normalize(&parsed.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chatml_prompt_has_all_three_turns() {
        let prompt = render_chatml("You are a filter.", "Subject: Hi");
        assert!(prompt.starts_with("<|im_start|>system\nYou are a filter.<|im_end|>"));
        assert!(prompt.contains("<|im_start|>user\nSubject: Hi<|im_end|>"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[test]
    fn normalize_strips_embedded_newlines() {
        assert_eq!(normalize("\nTrue\n\n"), "True");
        assert_eq!(normalize("Tr\nue"), "True");
        assert_eq!(normalize("  False "), "False");
    }

    #[test]
    fn extracts_generate_response() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"model": "openhermes2.5-mistral:7b", "response": "True\n", "done": true}"#,
        )
        .unwrap();
        assert_eq!(normalize(&parsed.response), "True");
    }
}
