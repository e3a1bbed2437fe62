//! Verdict classifier — builds the prompt pair and interprets the model's
//! answer.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::ModelBackend;
use crate::message::NormalizedMessage;

/// Hard cap on the rendered body; bounds prompt cost and latency.
const MAX_BODY_CHARS: usize = 3000;

/// Output budget passed to the backend; the verdict is a single token.
const VERDICT_MAX_TOKENS: u32 = 1;

/// Classifies messages as ignorable (promotional/automated) or worth
/// keeping, with a conservative bias toward keeping.
pub struct Classifier {
    backend: Arc<dyn ModelBackend>,
    first_name: String,
    last_name: String,
}

impl Classifier {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Classify one message. `true` means ignorable/promotional.
    ///
    /// Only the exact verdict `"True"` triggers `true`; any other output,
    /// and any backend failure, yields `false`. A model problem must never
    /// cause a destructive action.
    pub async fn classify(&self, message: &NormalizedMessage) -> bool {
        let system_prompt = build_system_prompt(&self.first_name, &self.last_name);
        let user_prompt = build_user_prompt(message);

        match self
            .backend
            .submit(&system_prompt, &user_prompt, VERDICT_MAX_TOKENS)
            .await
        {
            Ok(verdict) => {
                debug!(id = %message.id, verdict = %verdict, "Classifier verdict");
                verdict == "True"
            }
            Err(e) => {
                warn!(id = %message.id, error = %e, "Model backend failed; keeping message");
                false
            }
        }
    }
}

/// The policy statement sent as the system turn, parameterized by the
/// user's name.
fn build_system_prompt(first_name: &str, last_name: &str) -> String {
    format!(
        "Your task is to assist in managing the Gmail inbox of a busy individual, \
         {first_name} {last_name}, by filtering out promotional emails from their \
         personal (i.e., not work) account. Your primary focus is to ensure that \
         emails from individual people, whether they are known family members (with \
         the same last name), close acquaintances, or potential contacts {first_name} \
         might be interested in hearing from, are not ignored. You need to \
         distinguish between promotional, automated, or mass-sent emails and \
         personal communications.\n\n\
         Respond with \"True\" if the email is promotional and should be ignored \
         based on the below criteria, or \"False\" otherwise. Remember to prioritize \
         personal communications and ensure emails from genuine individuals are not \
         filtered out.\n\n\
         Criteria for Ignoring an Email:\n\
         - The email is promotional: It contains offers, discounts, or is marketing \
         a product or service.\n\
         - The email is automated: It is sent by a system or service automatically, \
         and not a real person.\n\
         - The email appears to be mass-sent or from a non-essential mailing list: \
         It does not address {first_name} by name, lacks personal context that would \
         indicate it's personally written to them, or is from a mailing list that \
         does not pertain to their interests or work.\n\n\
         Special Consideration:\n\
         - Exception: If the email is from an actual person, especially a family \
         member (with the same last name), a close acquaintance, or a potential \
         contact {first_name} might be interested in, and contains personalized \
         information indicating a one-to-one communication, do not mark it for \
         ignoring regardless of the promotional content.\n\n\
         - Additionally, do not ignore emails requiring an action to be taken for \
         important matters, such as needing to send a payment via Venmo, but ignore \
         requests for non-essential actions like purchasing discounted items or \
         signing up for rewards programs.\n\n\
         Be cautious: If there's any doubt about whether an email is promotional or \
         personal, respond with \"False\".\n\n\
         The user message you will receive will have the following format:\n\
         Subject: <email subject>\n\
         To: <to names, to emails>\n\
         From: <from name, from email>\n\
         Cc: <cc names, cc emails>\n\
         Gmail labels: <labels>\n\
         Body: <plaintext body of the email>\n\n\
         Your response must be:\n\
         \"True\" or \"False\""
    )
}

/// Deterministic, field-ordered rendering of a message as the user turn.
fn build_user_prompt(message: &NormalizedMessage) -> String {
    format!(
        "Subject: {}\nTo: {}\nFrom: {}\nCc: {}\nGmail labels: {}\nBody: {}",
        message.subject,
        message.to,
        message.from,
        message.cc.as_deref().unwrap_or("None"),
        message.labels.join(", "),
        truncate_body(&message.body),
    )
}

/// First `MAX_BODY_CHARS` characters, with a trailing ellipsis marker when
/// anything was cut.
fn truncate_body(body: &str) -> String {
    let mut truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
    if body.chars().count() > MAX_BODY_CHARS {
        truncated.push_str("...");
    }
    truncated
}
