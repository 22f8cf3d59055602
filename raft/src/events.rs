//! Callbacks through which the embedding application observes replication.

use crate::message::LogEntry;

/// The embedder's view of the replicated log.
///
/// Callbacks run on the WAL worker thread of the partition that produced the
/// event, so implementations should return quickly. Returning `false` from a
/// delivery callback reports a handling failure; the entry stays committed
/// and the failure is surfaced through [`replication_error`].
///
/// [`replication_error`]: Self::replication_error
pub trait ReplicationEvents: Send + Sync {
    /// A committed entry was received from the partition leader.
    fn replication_received(&self, log_type: &str, data: &[u8]) -> bool;

    /// A committed entry was replayed from durable storage during recovery.
    fn replication_restored(&self, log_type: &str, data: &[u8]) -> bool;

    /// Delivery of a committed entry failed.
    fn replication_error(&self, log: &LogEntry);
}

/// An events sink that accepts every delivery and ignores errors.
pub struct NoopEvents;

impl ReplicationEvents for NoopEvents {
    fn replication_received(&self, _log_type: &str, _data: &[u8]) -> bool {
        true
    }

    fn replication_restored(&self, _log_type: &str, _data: &[u8]) -> bool {
        true
    }

    fn replication_error(&self, _log: &LogEntry) {}
}
