//! Sweep driver — pages through unread mail, classifies, acts, records.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::config::{ActionMode, UnparseablePolicy};
use crate::error::MailStoreError;
use crate::ledger::{LedgerDetail, LedgerEntry, ProcessedLedger};
use crate::mailstore::MailStore;
use crate::message::NormalizedMessage;

/// Per-message outcome in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Verdict false — left unread.
    Kept,
    /// Verdict true, UNREAD label removed.
    MarkedRead,
    /// Verdict true, message deleted.
    Deleted,
    /// Verdict true but the store mutation failed.
    ActionFailed,
    /// Fetch or parse failed; never classified.
    Unparseable,
}

impl Disposition {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::MarkedRead => "marked-read",
            Self::Deleted => "deleted",
            Self::ActionFailed => "action-failed",
            Self::Unparseable => "unparseable",
        }
    }

    /// Action string recorded in the ledger entry.
    fn ledger_action(&self) -> &'static str {
        match self {
            Self::Kept => "none",
            Self::MarkedRead => "mark-read",
            Self::Deleted => "delete",
            Self::ActionFailed => "action-failed",
            Self::Unparseable => "unparseable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageOutcome {
    pub id: String,
    pub disposition: Disposition,
}

/// Aggregate result of one sweep run.
///
/// This is the structured output of the pipeline; formatting it for a
/// terminal is the binary's job.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Unread messages listed across all pages, including already-handled
    /// ones.
    pub total_unread: usize,
    pub pages_fetched: usize,
    /// Messages successfully marked read or deleted this run.
    pub handled: usize,
    /// Messages classified and kept as personal/important.
    pub kept: usize,
    /// Messages skipped because the ledger already contained them.
    pub skipped_processed: usize,
    /// Messages that could not be fetched or parsed.
    pub parse_failures: usize,
    /// Set when pagination stopped on a transport error rather than a
    /// missing next-page token.
    pub fetch_error: Option<String>,
    /// Model identifier used for every verdict this run.
    pub model: String,
    pub outcomes: Vec<MessageOutcome>,
}

impl RunReport {
    pub fn remaining_unread(&self) -> usize {
        self.total_unread.saturating_sub(self.handled)
    }
}

/// Orchestrates one pass over the whole mailbox.
///
/// Strictly sequential: one message is fetched, classified, and acted on
/// before the next begins. The ledger is owned here and written after every
/// message.
pub struct InboxSweeper {
    store: Arc<dyn MailStore>,
    classifier: Classifier,
    ledger: ProcessedLedger,
    action: ActionMode,
    unparseable_policy: UnparseablePolicy,
}

impl InboxSweeper {
    pub fn new(
        store: Arc<dyn MailStore>,
        classifier: Classifier,
        ledger: ProcessedLedger,
        action: ActionMode,
        unparseable_policy: UnparseablePolicy,
    ) -> Self {
        Self {
            store,
            classifier,
            ledger,
            action,
            unparseable_policy,
        }
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    /// Sweep the whole mailbox once.
    ///
    /// Single-message failures are logged and skipped; only a failed page
    /// listing ends the run early, and that is surfaced in the report
    /// instead of masquerading as completion.
    pub async fn run(&mut self) -> RunReport {
        let mut report = RunReport {
            model: self.classifier.model_name().to_string(),
            ..RunReport::default()
        };
        let mut page_token: Option<String> = None;

        loop {
            let page = match self.store.list_unread(page_token.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "Failed to list unread messages; stopping sweep early");
                    report.fetch_error = Some(e.to_string());
                    break;
                }
            };

            report.pages_fetched += 1;
            report.total_unread += page.ids.len();
            debug!(
                page = report.pages_fetched,
                messages = page.ids.len(),
                "Fetched page of unread messages"
            );

            for id in &page.ids {
                self.process_message(id, &mut report).await;
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            total_unread = report.total_unread,
            pages = report.pages_fetched,
            handled = report.handled,
            kept = report.kept,
            "Sweep complete"
        );
        report
    }

    async fn process_message(&mut self, id: &str, report: &mut RunReport) {
        if self.ledger.contains(id) {
            debug!(%id, "Already handled in a previous run; skipping");
            report.skipped_processed += 1;
            return;
        }

        let message = match self.fetch_and_parse(id).await {
            Some(message) => message,
            None => {
                report.parse_failures += 1;
                report.outcomes.push(MessageOutcome {
                    id: id.to_string(),
                    disposition: Disposition::Unparseable,
                });
                if self.unparseable_policy == UnparseablePolicy::MarkHandled {
                    self.record(
                        id,
                        LedgerDetail {
                            id: id.to_string(),
                            subject: String::new(),
                            from: String::new(),
                            body: String::new(),
                            action: Disposition::Unparseable.ledger_action().to_string(),
                            recorded_at: Utc::now(),
                        },
                    );
                }
                return;
            }
        };

        info!(%id, subject = %message.subject, from = %message.from, "Fetched message");

        let ignorable = self.classifier.classify(&message).await;
        let disposition = if ignorable {
            match self.apply_action(id).await {
                Ok(disposition) => {
                    report.handled += 1;
                    disposition
                }
                Err(e) => {
                    // The ID is still recorded below: a permanently broken
                    // message must not be retried forever.
                    warn!(%id, error = %e, "Failed to apply action");
                    Disposition::ActionFailed
                }
            }
        } else {
            debug!(%id, "Message kept as personal/important");
            report.kept += 1;
            Disposition::Kept
        };

        self.record(
            id,
            LedgerDetail {
                id: id.to_string(),
                subject: message.subject.clone(),
                from: message.from.clone(),
                body: message.body.clone(),
                action: disposition.ledger_action().to_string(),
                recorded_at: Utc::now(),
            },
        );
        debug!(%id, outcome = disposition.label(), "Message recorded");
        report.outcomes.push(MessageOutcome {
            id: id.to_string(),
            disposition,
        });
    }

    async fn fetch_and_parse(&self, id: &str) -> Option<NormalizedMessage> {
        let raw = match self.store.fetch_full(id).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%id, error = %e, "Failed to fetch message");
                return None;
            }
        };
        let parsed = NormalizedMessage::from_raw(&raw);
        if parsed.is_none() {
            warn!(%id, "Failed to parse message");
        }
        parsed
    }

    async fn apply_action(&self, id: &str) -> Result<Disposition, MailStoreError> {
        match self.action {
            ActionMode::MarkRead => {
                self.store.remove_unread_label(id).await?;
                info!(%id, "Marked as read");
                Ok(Disposition::MarkedRead)
            }
            ActionMode::Delete => {
                self.store.delete(id).await?;
                info!(%id, "Deleted");
                Ok(Disposition::Deleted)
            }
        }
    }

    fn record(&mut self, id: &str, detail: LedgerDetail) {
        self.ledger.mark(id, LedgerEntry::Detail(detail));
        if let Err(e) = self.ledger.flush() {
            warn!(%id, error = %e, "Failed to flush ledger; progress for this message is not durable");
        }
    }
}
