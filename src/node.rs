//! The embedder-facing cluster node.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core::fmt;

use bytes::Bytes;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use log::{info, warn};

use raft::clock::HybridClock;
use raft::config::RaftConfig;
use raft::events::ReplicationEvents;
use raft::log::LogStore;
use raft::message::{HybridTime, InboundMessage, OperationStatus};
use raft::partition::{AskError, PartitionHandle};
use raft::state::{NodeRole, NodeState, ProposedEntry};
use raft::ticket::TicketState;
use raft::transport::Transport;

use crate::cluster::{Discovery, DiscoveryError};

/// The result of a replication call.
///
/// `success` only means the batch is durably proposed on the leader; commit
/// is asynchronous and observed by polling the ticket.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReplicateOutcome {
    pub success: bool,
    pub status: OperationStatus,
    pub ticket: Option<HybridTime>,
}

/// An error from a cluster node operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeError {
    /// The partition id is outside `0..max_partitions`.
    UnknownPartition(u32),
    /// The partition's state machine did not answer.
    Ask(AskError),
    /// Discovery rejected the local registration.
    Discovery(DiscoveryError),
}

/// One process's replica set: a replica of every partition, the ticker that
/// drives their timers, and the demux pump feeding them inbound traffic.
///
/// A node may simultaneously lead some partitions and follow others; all
/// per-partition state lives in the partitions themselves.
pub struct ClusterNode {
    config: Arc<RaftConfig>,
    discovery: Arc<dyn Discovery>,
    partitions: Vec<PartitionHandle>,
    ticker_stop: Sender<()>,
}

impl ClusterNode {
    /// Spawns every partition, registers the local endpoint with discovery
    /// and starts the CheckLeader ticker and the inbound pump draining
    /// `inbound` into the partitions.
    pub fn join_cluster<S: LogStore>(
        config: RaftConfig,
        discovery: Arc<dyn Discovery>,
        store: Arc<S>,
        transport: Arc<dyn Transport>,
        events: Arc<dyn ReplicationEvents>,
        inbound: Receiver<InboundMessage>,
    ) -> Result<ClusterNode, NodeError> {
        let config = Arc::new(config);
        let clock = Arc::new(HybridClock::new());

        let partitions: Vec<PartitionHandle> = (0..config.max_partitions)
            .map(|partition| {
                PartitionHandle::spawn(
                    partition,
                    Arc::clone(&config),
                    Arc::clone(&store),
                    Arc::clone(&transport),
                    Arc::clone(&events),
                    Arc::clone(&clock),
                )
            })
            .collect();

        discovery
            .register(&config.local_endpoint())
            .map_err(NodeError::Discovery)?;

        let (ticker_stop, stopped) = bounded(1);
        spawn_ticker(partitions.clone(), config.check_leader_interval, stopped);
        spawn_inbound_pump(partitions.clone(), inbound, config.local_endpoint());

        let node = ClusterNode {
            config,
            discovery,
            partitions,
            ticker_stop,
        };
        node.update_nodes();
        info!(
            "joined cluster as {} hosting {} partitions",
            node.config.local_endpoint(),
            node.partitions.len()
        );
        Ok(node)
    }

    /// Re-reads discovery and pushes the fresh peer list to every partition.
    pub fn update_nodes(&self) {
        let endpoints = self.discovery.nodes();
        for partition in &self.partitions {
            partition.update_nodes(endpoints.clone());
        }
    }

    /// The `host:port` endpoint this node is known by.
    pub fn local_endpoint(&self) -> String {
        self.config.local_endpoint()
    }

    /// Whether this node currently leads `partition`, as reported by the
    /// partition's state machine.
    pub fn am_i_leader(&self, partition: u32) -> Result<bool, NodeError> {
        Ok(self.node_state(partition)?.role == NodeRole::Leader)
    }

    /// Non-blocking leader check; may lag the state machine by a transition.
    pub fn am_i_leader_quick(&self, partition: u32) -> bool {
        self.partition(partition)
            .map(|handle| handle.role_quick() == NodeRole::Leader)
            .unwrap_or(false)
    }

    /// The partition's role, term and currently known leader.
    pub fn node_state(&self, partition: u32) -> Result<NodeState, NodeError> {
        self.partition(partition)?.node_state().map_err(NodeError::Ask)
    }

    /// Replicates one payload under `log_type` through `partition`.
    pub fn replicate_logs(
        &self,
        partition: u32,
        log_type: &str,
        data: impl Into<Bytes>,
    ) -> Result<ReplicateOutcome, NodeError> {
        self.replicate_many(partition, log_type, vec![data.into()])
    }

    /// Replicates a batch of payloads under `log_type` as one proposal with
    /// one ticket.
    pub fn replicate_many(
        &self,
        partition: u32,
        log_type: &str,
        batch: Vec<Bytes>,
    ) -> Result<ReplicateOutcome, NodeError> {
        let entries = batch
            .into_iter()
            .map(|data| ProposedEntry {
                log_type: log_type.to_string(),
                data,
            })
            .collect();
        let reply = self
            .partition(partition)?
            .replicate_logs(entries)
            .map_err(NodeError::Ask)?;
        Ok(ReplicateOutcome {
            success: reply.status == OperationStatus::Success,
            status: reply.status,
            ticket: reply.ticket,
        })
    }

    /// Replicates a checkpoint marker through `partition`.
    pub fn replicate_checkpoint(&self, partition: u32) -> Result<ReplicateOutcome, NodeError> {
        let reply = self
            .partition(partition)?
            .replicate_checkpoint()
            .map_err(NodeError::Ask)?;
        Ok(ReplicateOutcome {
            success: reply.status == OperationStatus::Success,
            status: reply.status,
            ticket: reply.ticket,
        })
    }

    /// Polls the state of a replication ticket issued by `partition`.
    pub fn ticket_state(
        &self,
        partition: u32,
        ticket: HybridTime,
    ) -> Result<TicketState, NodeError> {
        self.partition(partition)?
            .ticket_state(ticket)
            .map_err(NodeError::Ask)
    }

    /// Stops the CheckLeader ticker. Partitions stay responsive to inbound
    /// traffic until the process exits.
    pub fn shutdown(&self) {
        let _ = self.ticker_stop.try_send(());
    }

    fn partition(&self, partition: u32) -> Result<&PartitionHandle, NodeError> {
        self.partitions
            .get(partition as usize)
            .ok_or(NodeError::UnknownPartition(partition))
    }
}

impl Drop for ClusterNode {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_ticker(partitions: Vec<PartitionHandle>, interval: u64, stopped: Receiver<()>) {
    let tick = crossbeam_channel::tick(Duration::from_millis(interval));
    let _ = thread::spawn(move || loop {
        select! {
            recv(tick) -> _ => {
                for partition in &partitions {
                    partition.check_leader();
                }
            }
            recv(stopped) -> _ => break,
        }
    });
}

fn spawn_inbound_pump(
    partitions: Vec<PartitionHandle>,
    inbound: Receiver<InboundMessage>,
    local: String,
) {
    let _ = thread::spawn(move || {
        for message in inbound {
            match partitions.get(message.partition() as usize) {
                Some(partition) => partition.deliver(message),
                None => warn!(
                    "{} dropping message for unknown partition: {}",
                    local, message
                ),
            }
        }
    });
}

//
// NodeError impls
//

impl fmt::Display for NodeError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::UnknownPartition(partition) => {
                write!(fmt, "partition {} is not hosted here", partition)
            }
            NodeError::Ask(err) => write!(fmt, "{}", err),
            NodeError::Discovery(err) => write!(fmt, "{}", err),
        }
    }
}
