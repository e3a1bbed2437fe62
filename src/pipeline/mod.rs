//! The sweep pipeline.
//!
//! Every unread message flows through:
//! 1. ledger dedupe check — already-handled IDs are never touched again
//! 2. fetch + parse — full-format fetch, normalized record
//! 3. classification — one model call, conservative on failure
//! 4. action — mark-read or delete, only on a positive verdict
//! 5. ledger write — recorded and flushed before the next message

pub mod sweep;

pub use sweep::{Disposition, InboxSweeper, MessageOutcome, RunReport};
