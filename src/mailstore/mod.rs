//! Mail store abstraction — paginated unread listing plus per-message
//! mutations. Pure I/O, no classification logic.

pub mod gmail;
pub mod types;

pub use gmail::GmailStore;
pub use types::RawMessage;

use async_trait::async_trait;

use crate::error::MailStoreError;
use crate::mailstore::types::MessageList;

/// One page of unread message IDs.
#[derive(Debug, Clone, Default)]
pub struct UnreadPage {
    pub ids: Vec<String>,
    /// Opaque cursor for the next page; `None` means the listing is done.
    pub next_page_token: Option<String>,
}

impl From<MessageList> for UnreadPage {
    fn from(list: MessageList) -> Self {
        Self {
            ids: list
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| m.id)
                .collect(),
            next_page_token: list.next_page_token,
        }
    }
}

/// Mailbox operations consumed by the sweep pipeline.
///
/// Authentication/consent is outside this trait; implementations are
/// constructed from already-valid credentials.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Address of the authenticated account, used to namespace the ledger.
    ///
    /// Failure here is fatal to the run: without an identity there is no
    /// safe ledger file to load.
    async fn profile_address(&self) -> Result<String, MailStoreError>;

    /// List one page of unread message IDs.
    ///
    /// Transport failures propagate so the driver can report a sweep that
    /// stopped early instead of one that silently completed.
    async fn list_unread(&self, page_token: Option<&str>)
    -> Result<UnreadPage, MailStoreError>;

    /// Fetch a message in full format.
    async fn fetch_full(&self, id: &str) -> Result<RawMessage, MailStoreError>;

    /// Remove the UNREAD label. Idempotent; removing an absent label is a
    /// no-op on the provider side.
    async fn remove_unread_label(&self, id: &str) -> Result<(), MailStoreError>;

    /// Permanently delete a message. Not reversible; only called after a
    /// positive ignorable verdict.
    async fn delete(&self, id: &str) -> Result<(), MailStoreError>;
}
