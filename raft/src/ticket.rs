//! Proposal tickets: the leader-side handle for an in-flight batch.

use std::collections::BTreeSet;

use crate::message::LogEntry;

/// Tracks one proposed batch from durable proposal to quorum commit.
///
/// A ticket is keyed by the hybrid timestamp assigned to the batch, which is
/// unique on the leader and strictly increasing, and lives until leader
/// step-down or reaping. The leader's own acknowledgment is implicit, so the
/// quorum check counts `acknowledged + 1`.
pub struct ProposalTicket {
    logs: Vec<LogEntry>,
    expected: BTreeSet<String>,
    acknowledged: BTreeSet<String>,
    last_id: u64,
    committed: bool,
}

/// The observable state of a ticket, polled by replication clients.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TicketState {
    /// The ticket was never issued or has already been reaped.
    NotFound,
    /// The batch is durably proposed on the leader and awaiting quorum.
    Proposed {
        /// The highest id in the batch.
        last_index: u64,
    },
    /// The batch is durably committed on the leader.
    Committed {
        /// The highest id in the batch.
        last_index: u64,
    },
}

impl ProposalTicket {
    /// Creates a ticket for a freshly proposed batch, expecting an
    /// acknowledgment from every endpoint in `expected`.
    pub fn new(logs: Vec<LogEntry>, expected: BTreeSet<String>) -> Self {
        let last_id = logs.iter().map(|log| log.id).max().unwrap_or(0);
        ProposalTicket {
            logs,
            expected,
            acknowledged: BTreeSet::new(),
            last_id,
            committed: false,
        }
    }

    /// Records an acknowledgment from `endpoint`. Endpoints outside the
    /// expected set are ignored.
    pub fn acknowledge(&mut self, endpoint: String) {
        if self.expected.contains(&endpoint) {
            self.acknowledged.insert(endpoint);
        }
    }

    /// Whether acknowledgments, counting the leader's implicit one, reach
    /// `quorum`.
    pub fn has_quorum(&self, quorum: usize) -> bool {
        self.acknowledged.len() + 1 >= quorum
    }

    /// Replaces the batch with its committed records and marks the ticket
    /// satisfied.
    pub fn mark_committed(&mut self, logs: Vec<LogEntry>) {
        self.logs = logs;
        self.committed = true;
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn acknowledged(&self) -> &BTreeSet<String> {
        &self.acknowledged
    }

    pub fn committed(&self) -> bool {
        self.committed
    }

    /// The state reported to `GetTicketState` pollers.
    pub fn state(&self) -> TicketState {
        if self.committed {
            TicketState::Committed {
                last_index: self.last_id,
            }
        } else {
            TicketState::Proposed {
                last_index: self.last_id,
            }
        }
    }
}
