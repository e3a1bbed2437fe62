//! Normalized message record and Gmail payload parsing.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::mailstore::types::{MessagePayload, RawMessage};

/// A provider message reduced to the fields the classifier sees.
///
/// Constructed once per fetch, immutable afterwards, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub id: String,
    pub subject: String,
    pub to: String,
    pub from: String,
    pub cc: Option<String>,
    pub labels: Vec<String>,
    /// Plain-text body; empty when the message carries no `text/plain` part.
    pub body: String,
}

impl NormalizedMessage {
    /// Build a normalized record from a full-format Gmail message.
    ///
    /// Subject, To and From headers are required; a missing header or an
    /// undecodable body is a hard parse failure and yields `None`.
    pub fn from_raw(raw: &RawMessage) -> Option<Self> {
        let subject = header_value(&raw.payload, "Subject")?;
        let to = header_value(&raw.payload, "To")?;
        let from = header_value(&raw.payload, "From")?;
        let cc = header_value(&raw.payload, "Cc");
        let body = plain_text_body(&raw.payload)?;

        Some(Self {
            id: raw.id.clone(),
            subject,
            to,
            from,
            cc,
            labels: raw.label_ids.clone(),
            body,
        })
    }
}

fn header_value(payload: &MessagePayload, name: &str) -> Option<String> {
    payload
        .headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.clone())
}

/// Extract the first top-level `text/plain` part, base64url-decoded.
///
/// Returns `Some("")` when no such part exists and `None` on a decode
/// failure. Later plain-text parts, alternatives and attachments are
/// ignored.
fn plain_text_body(payload: &MessagePayload) -> Option<String> {
    for part in &payload.parts {
        if part.mime_type.as_deref() == Some("text/plain") {
            let data = part
                .body
                .as_ref()
                .and_then(|b| b.data.as_deref())
                .unwrap_or("");
            return decode_body_data(data);
        }
    }
    Some(String::new())
}

fn decode_body_data(data: &str) -> Option<String> {
    // Gmail emits unpadded base64url; tolerate padded input as well.
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}
