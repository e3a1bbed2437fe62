//! Processed-set ledger — the durable record of already-handled messages.
//!
//! One JSON file per mailbox address. An ID present in the ledger is never
//! fetched, classified, or acted on again; the set only grows. Every mark is
//! flushed before the next message is touched, so a crash loses at most the
//! in-flight message's result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// What was recorded for one handled message.
///
/// Untagged so ledger files written by earlier revisions of the tool (bare
/// `true` markers) keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    /// Bare handled marker from the legacy file format.
    Seen(bool),
    /// Full detail record; everything written today uses this form.
    Detail(LedgerDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDetail {
    pub id: String,
    pub subject: String,
    pub from: String,
    /// Plain-text body as classified, for manual review of what was acted on.
    pub body: String,
    /// "mark-read", "delete", "none" (kept), "action-failed", or
    /// "unparseable".
    pub action: String,
    pub recorded_at: DateTime<Utc>,
}

/// Persisted mapping from message ID to handled-marker.
pub struct ProcessedLedger {
    entries: HashMap<String, LedgerEntry>,
    path: PathBuf,
}

impl ProcessedLedger {
    /// Load the ledger for `address` from `dir`, starting empty when no
    /// file exists yet.
    ///
    /// A file that exists but cannot be read or parsed is fatal: sweeping
    /// without the processed set could re-apply destructive actions.
    pub fn load(dir: &Path, address: &str) -> Result<Self, LedgerError> {
        let path = dir.join(file_name(address));
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| LedgerError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(LedgerError::Io(e)),
        };
        Ok(Self { entries, path })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Record a handled message. Append-only; re-marking an ID replaces its
    /// detail but never removes it.
    pub fn mark(&mut self, id: impl Into<String>, entry: LedgerEntry) {
        self.entries.insert(id.into(), entry);
    }

    /// Write the full mapping to disk, via a temp file and rename so a
    /// crash mid-write cannot corrupt the previous snapshot.
    pub fn flush(&self) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Ledger file name for a mailbox address. `@` becomes `_at_` and any other
/// character outside `[A-Za-z0-9._-]` becomes `_`, so distinct accounts
/// cannot collide on one file.
fn file_name(address: &str) -> String {
    let sanitized: String = address
        .replace('@', "_at_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("processed_{sanitized}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(action: &str) -> LedgerEntry {
        LedgerEntry::Detail(LedgerDetail {
            id: "m1".to_string(),
            subject: "Hello".to_string(),
            from: "ada@example.com".to_string(),
            body: "Hi there".to_string(),
            action: action.to_string(),
            recorded_at: Utc::now(),
        })
    }

    #[test]
    fn file_name_substitutes_at_sign() {
        assert_eq!(
            file_name("user@example.com"),
            "processed_user_at_example.com.json"
        );
    }

    #[test]
    fn file_name_substitutes_odd_characters() {
        assert_eq!(
            file_name("first+tag@ex ample.com"),
            "processed_first_tag_at_ex_ample.com.json"
        );
    }

    #[test]
    fn load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn mark_flush_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        ledger.mark("m1", detail("mark-read"));
        ledger.flush().unwrap();

        let reloaded = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("m1"));
        assert!(!reloaded.contains("m2"));
    }

    #[test]
    fn loads_legacy_boolean_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name("user@example.com"));
        std::fs::write(&path, r#"{"m1": true, "m2": true}"#).unwrap();

        let ledger = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains("m1"));
        assert!(ledger.contains("m2"));
    }

    #[test]
    fn mixed_legacy_and_detail_entries_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name("user@example.com"));
        std::fs::write(
            &path,
            r#"{
                "m1": true,
                "m2": {
                    "id": "m2",
                    "subject": "Sale",
                    "from": "deals@shop.example",
                    "body": "50% off",
                    "action": "mark-read",
                    "recorded_at": "2024-01-15T10:00:00Z"
                }
            }"#,
        )
        .unwrap();

        let ledger = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        assert!(ledger.contains("m1"));
        assert!(ledger.contains("m2"));
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name("user@example.com"));
        std::fs::write(&path, "{not json").unwrap();

        let result = ProcessedLedger::load(dir.path(), "user@example.com");
        assert!(matches!(result, Err(LedgerError::Corrupt { .. })));
    }

    #[test]
    fn accounts_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = ProcessedLedger::load(dir.path(), "a@example.com").unwrap();
        a.mark("m1", LedgerEntry::Seen(true));
        a.flush().unwrap();

        let b = ProcessedLedger::load(dir.path(), "b@example.com").unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn remark_replaces_without_growing() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = ProcessedLedger::load(dir.path(), "user@example.com").unwrap();
        ledger.mark("m1", LedgerEntry::Seen(true));
        ledger.mark("m1", detail("delete"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn flush_creates_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cache");
        let mut ledger = ProcessedLedger::load(&nested, "user@example.com").unwrap();
        ledger.mark("m1", LedgerEntry::Seen(true));
        ledger.flush().unwrap();
        assert!(ledger.path().exists());
    }
}
