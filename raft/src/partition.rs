//! Wiring of the three per-partition agents and the handle to drive them.

use std::sync::Arc;
use std::time::Duration;

use core::fmt;

use crossbeam_channel::{bounded, Sender};

use crate::clock::HybridClock;
use crate::config::RaftConfig;
use crate::events::ReplicationEvents;
use crate::log::LogStore;
use crate::message::{HybridTime, InboundMessage};
use crate::responder;
use crate::state::{self, NodeRole, NodeState, ProposedEntry, ReplicateReply, RoleCell, SmMessage};
use crate::ticket::TicketState;
use crate::transport::Transport;
use crate::wal;

/// How long ask-style calls wait for the state machine before giving up.
const ASK_TIMEOUT: Duration = Duration::from_secs(5);

/// An error asking the partition's state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AskError {
    /// The state machine mailbox is gone.
    PartitionGone,
    /// The state machine did not answer within the ask deadline.
    Timeout,
}

/// A handle to one partition's replication engine.
///
/// Spawning a partition starts its three single-consumer agents: the state
/// machine owning election state, the WAL worker owning the durable indices,
/// and the responder owning outbound transport calls. The handle is cheap to
/// clone and every method is safe to call from any thread.
#[derive(Clone)]
pub struct PartitionHandle {
    partition: u32,
    sm: Sender<SmMessage>,
    role: Arc<RoleCell>,
}

impl PartitionHandle {
    /// Spawns the agents for `partition` and returns the handle driving
    /// them.
    pub fn spawn<S: LogStore>(
        partition: u32,
        config: Arc<RaftConfig>,
        store: Arc<S>,
        transport: Arc<dyn Transport>,
        events: Arc<dyn ReplicationEvents>,
        clock: Arc<HybridClock>,
    ) -> PartitionHandle {
        let responder = responder::spawn(partition, transport);
        let wal = wal::spawn(partition, store, events);
        let role = Arc::new(RoleCell::new());
        let sm = state::spawn(partition, config, wal, responder, clock, Arc::clone(&role));
        PartitionHandle {
            partition,
            sm,
            role,
        }
    }

    pub fn id(&self) -> u32 {
        self.partition
    }

    /// Posts the periodic tick advancing the partition's timers.
    pub fn check_leader(&self) {
        let _ = self.sm.send(SmMessage::CheckLeader);
    }

    /// Replaces the partition's peer list.
    pub fn update_nodes(&self, peers: Vec<String>) {
        let _ = self.sm.send(SmMessage::UpdateNodes { peers });
    }

    /// Asks for the partition's role, term and known leader.
    pub fn node_state(&self) -> Result<NodeState, AskError> {
        self.ask(|reply| SmMessage::NodeState { reply })
    }

    /// The last role the state machine published. Never blocks and may be
    /// stale by one transition.
    pub fn role_quick(&self) -> NodeRole {
        self.role.load()
    }

    /// Submits a batch for replication; see [`ReplicateReply`] for the
    /// commit contract.
    pub fn replicate_logs(&self, entries: Vec<ProposedEntry>) -> Result<ReplicateReply, AskError> {
        self.ask(|reply| SmMessage::ReplicateLogs { entries, reply })
    }

    /// Submits a checkpoint marker for replication.
    pub fn replicate_checkpoint(&self) -> Result<ReplicateReply, AskError> {
        self.ask(|reply| SmMessage::ReplicateCheckpoint { reply })
    }

    /// Polls the state of a previously issued proposal ticket.
    pub fn ticket_state(&self, time: HybridTime) -> Result<TicketState, AskError> {
        self.ask(|reply| SmMessage::TicketState { time, reply })
    }

    /// Enqueues an inbound wire message onto the state machine mailbox.
    pub fn deliver(&self, message: InboundMessage) {
        let message = match message {
            InboundMessage::RequestVotes(request) => SmMessage::RequestVotes(request),
            InboundMessage::Vote(request) => SmMessage::Vote(request),
            InboundMessage::AppendLogs(request) => SmMessage::AppendLogs(request),
            InboundMessage::CompleteAppendLogs(request) => SmMessage::CompleteAppendLogs(request),
        };
        let _ = self.sm.send(message);
    }

    fn ask<R>(&self, message: impl FnOnce(Sender<R>) -> SmMessage) -> Result<R, AskError> {
        let (reply, response) = bounded(1);
        self.sm
            .send(message(reply))
            .map_err(|_| AskError::PartitionGone)?;
        response.recv_timeout(ASK_TIMEOUT).map_err(|_| AskError::Timeout)
    }
}

//
// AskError impls
//

impl fmt::Display for AskError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AskError::PartitionGone => fmt.write_str("partition is gone"),
            AskError::Timeout => fmt.write_str("partition did not answer in time"),
        }
    }
}
