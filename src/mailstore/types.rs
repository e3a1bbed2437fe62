//! Gmail REST wire types.
//!
//! Field names follow the Gmail API v1 JSON (camelCase) with serde renames.

use serde::Deserialize;

/// `users/me/profile` response. Only the address is consumed; it namespaces
/// the processed ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(rename = "emailAddress")]
    pub email_address: String,
}

/// One page of `users/me/messages` list results.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub messages: Option<Vec<MessageStub>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A message reference as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStub {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
}

/// A full-format Gmail message.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub id: String,
    #[serde(rename = "labelIds", default)]
    pub label_ids: Vec<String>,
    pub payload: MessagePayload,
}

/// A MIME part. The top-level payload and each nested part share this shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub body: Option<MessageBody>,
    #[serde(default)]
    pub parts: Vec<MessagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    /// Base64url-encoded part content. Absent for container parts.
    pub data: Option<String>,
    pub size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_message_list() {
        let raw = r#"{
            "messages": [
                {"id": "m1", "threadId": "t1"},
                {"id": "m2", "threadId": "t2"}
            ],
            "nextPageToken": "tok-2",
            "resultSizeEstimate": 2
        }"#;
        let list: MessageList = serde_json::from_str(raw).unwrap();
        let ids: Vec<&str> = list
            .messages
            .as_deref()
            .unwrap()
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(list.next_page_token.as_deref(), Some("tok-2"));
    }

    #[test]
    fn deserializes_empty_message_list() {
        // Gmail omits `messages` entirely when the mailbox has no unread mail.
        let list: MessageList = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_none());
        assert!(list.next_page_token.is_none());
    }

    #[test]
    fn deserializes_full_message() {
        let raw = r#"{
            "id": "m1",
            "threadId": "t1",
            "labelIds": ["UNREAD", "INBOX"],
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "Subject", "value": "Hello"},
                    {"name": "From", "value": "Ada <ada@example.com>"}
                ],
                "parts": [
                    {
                        "mimeType": "text/plain",
                        "body": {"size": 11, "data": "SGVsbG8gV29ybGQ"}
                    }
                ]
            }
        }"#;
        let message: RawMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.id, "m1");
        assert_eq!(message.label_ids, vec!["UNREAD", "INBOX"]);
        assert_eq!(message.payload.headers.len(), 2);
        assert_eq!(
            message.payload.parts[0].mime_type.as_deref(),
            Some("text/plain")
        );
    }

    #[test]
    fn deserializes_profile() {
        let profile: Profile =
            serde_json::from_str(r#"{"emailAddress": "ada@example.com", "historyId": "99"}"#)
                .unwrap();
        assert_eq!(profile.email_address, "ada@example.com");
    }
}
