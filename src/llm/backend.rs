//! Model backend contract.

use async_trait::async_trait;

use crate::error::LlmError;

/// A chat-capable language model that can return a short verdict.
///
/// Implementations own their provider's response envelope: `submit` returns
/// the extracted content string, already normalized (whitespace stripped the
/// way that provider requires), ready for a strict comparison by the caller.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model identifier, reported in run statistics.
    fn model_name(&self) -> &str;

    /// Send one system/user prompt pair and return the verdict text.
    ///
    /// `max_tokens` bounds the output where the provider honors it; local
    /// backends may substitute their own fixed budget.
    async fn submit(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}
