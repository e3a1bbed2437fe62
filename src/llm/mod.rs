//! Language model backends.
//!
//! Three providers behind one contract:
//! - **OpenAI**: remote hosted model over the chat-completions API
//! - **Llama**: local quantized llama-2 7B via Ollama's chat endpoint
//! - **Hermes**: local quantized OpenHermes 2.5 via Ollama's generate
//!   endpoint with an explicit ChatML template
//!
//! Each backend knows its own response envelope and whitespace quirks; the
//! classifier only ever sees a normalized verdict string.

pub mod backend;
mod hermes;
mod ollama;
mod openai;

pub use backend::ModelBackend;
pub use hermes::HermesBackend;
pub use ollama::LlamaBackend;
pub use openai::OpenAiBackend;

use std::sync::Arc;

use crate::config::{BackendKind, SweepConfig};
use crate::error::LlmError;

/// Create a model backend from the run configuration.
///
/// The backend is built exactly once per run and shared with the classifier.
pub fn create_backend(config: &SweepConfig) -> Result<Arc<dyn ModelBackend>, LlmError> {
    match config.backend {
        BackendKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| LlmError::AuthMissing {
                    provider: "openai".to_string(),
                })?;
            tracing::info!("Using OpenAI (model: {})", BackendKind::OpenAi.model_name());
            Ok(Arc::new(OpenAiBackend::new(api_key)))
        }
        BackendKind::Llama => {
            tracing::info!(
                "Using Ollama at {} (model: {})",
                config.ollama_url,
                BackendKind::Llama.model_name()
            );
            Ok(Arc::new(LlamaBackend::new(config.ollama_url.clone())))
        }
        BackendKind::Hermes => {
            tracing::info!(
                "Using Ollama at {} (model: {})",
                config.ollama_url,
                BackendKind::Hermes.model_name()
            );
            Ok(Arc::new(HermesBackend::new(config.ollama_url.clone())))
        }
    }
}
