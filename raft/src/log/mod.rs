//! Durable storage behind the write-ahead log.
//!
//! A [`LogStore`] persists the entries of every partition hosted by the
//! process, keyed by `(partition, id)`. One store instance is shared by all
//! partitions; each partition's WAL worker is the only task issuing calls
//! for its partition, so implementations only need to make individual calls
//! safe to run concurrently across partitions.
//!
//! # Record resolution
//!
//! A log entry is written at most twice under a given `(partition, id)`: once
//! as `Proposed` (or `ProposedCheckpoint`) and once more when the commit
//! supersedes it. Readers always resolve to the latest record written for an
//! id.
//!
//! # Durability
//!
//! `propose` and `commit` must be synchronously durable: once either returns,
//! the record survives a process crash.

use core::fmt;

use crate::message::LogEntry;

#[cfg(any(feature = "test", test))]
#[macro_use]
pub mod tests;
pub mod memory;

/// Storage interface for partition logs.
pub trait LogStore: Send + Sync + 'static {
    /// The type of error returned by fallible operations.
    type Error: fmt::Display;

    /// Durably writes a proposed record for `log.id`.
    fn propose(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error>;

    /// Durably writes the committed record superseding the proposed record
    /// at `log.id`.
    fn commit(&self, partition: u32, log: &LogEntry) -> Result<(), Self::Error>;

    /// Returns the partition's resolved entries in ascending id order,
    /// starting after the highest committed checkpoint. Recovery replays
    /// exactly this range.
    fn read_logs(&self, partition: u32) -> Result<Vec<LogEntry>, Self::Error>;

    /// Returns the partition's resolved entries with `id >= start_id` in
    /// ascending id order.
    fn read_logs_range(&self, partition: u32, start_id: u64) -> Result<Vec<LogEntry>, Self::Error>;

    /// Returns the highest id persisted for the partition, or 0 when the
    /// partition has no entries.
    fn get_max_log(&self, partition: u32) -> Result<u64, Self::Error>;

    /// Returns the highest term persisted for the partition, or 0 when the
    /// partition has no entries.
    fn get_current_term(&self, partition: u32) -> Result<u64, Self::Error>;

    /// Whether any record exists for `(partition, id)`.
    fn exists(&self, partition: u32, id: u64) -> Result<bool, Self::Error>;
}

/// Returns the ids of `entries` past the highest committed checkpoint.
///
/// Shared by store implementations to honor the `read_logs` resumption rule.
pub fn after_last_checkpoint(entries: &[LogEntry]) -> impl Iterator<Item = &LogEntry> {
    let resume_after = entries
        .iter()
        .filter(|log| log.entry_type() == crate::message::RaftLogType::CommittedCheckpoint)
        .map(|log| log.id)
        .max()
        .unwrap_or(0);
    entries.iter().filter(move |log| log.id > resume_after)
}
