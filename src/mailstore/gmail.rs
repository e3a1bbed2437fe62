//! Gmail REST adapter.
//!
//! Talks to the Gmail API v1 over HTTPS with an already-obtained OAuth
//! access token. Requires the `gmail.modify` scope for mark-read and the
//! broader `mail.google.com` scope for delete.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::MailStoreError;
use crate::mailstore::types::{MessageList, Profile, RawMessage};
use crate::mailstore::{MailStore, UnreadPage};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gmail-backed [`MailStore`].
pub struct GmailStore {
    client: Client,
    token: SecretString,
    base_url: String,
}

impl GmailStore {
    pub fn new(token: SecretString) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            token,
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailStoreError> {
        debug!(operation, "Gmail request");
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| MailStoreError::Request {
                operation: operation.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MailStoreError::Status {
                operation: operation.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| MailStoreError::Decode {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MailStore for GmailStore {
    async fn profile_address(&self) -> Result<String, MailStoreError> {
        let profile: Profile = self
            .get_json("profile", &self.url("users/me/profile"), &[])
            .await?;
        Ok(profile.email_address)
    }

    async fn list_unread(
        &self,
        page_token: Option<&str>,
    ) -> Result<UnreadPage, MailStoreError> {
        let url = self.url("users/me/messages");
        let mut query = vec![("labelIds", "UNREAD")];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let list: MessageList = self.get_json("list_unread", &url, &query).await?;
        Ok(UnreadPage::from(list))
    }

    async fn fetch_full(&self, id: &str) -> Result<RawMessage, MailStoreError> {
        let url = self.url(&format!("users/me/messages/{id}"));
        self.get_json("fetch_full", &url, &[("format", "full")])
            .await
    }

    async fn remove_unread_label(&self, id: &str) -> Result<(), MailStoreError> {
        let url = self.url(&format!("users/me/messages/{id}/modify"));
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await
            .map_err(|e| MailStoreError::Request {
                operation: "remove_unread_label".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MailStoreError::Status {
                operation: "remove_unread_label".to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), MailStoreError> {
        let url = self.url(&format!("users/me/messages/{id}"));
        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| MailStoreError::Request {
                operation: "delete".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MailStoreError::Status {
                operation: "delete".to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let store = GmailStore::new(SecretString::from("test-token"));
        assert_eq!(
            store.url("users/me/profile"),
            "https://gmail.googleapis.com/gmail/v1/users/me/profile"
        );
    }
}
