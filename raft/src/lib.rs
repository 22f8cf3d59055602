//! Per-partition Raft replication engine.
//!
//! A process hosts one replica of every partition in a cluster; each
//! partition is an independent Raft instance with its own leader, term and
//! durable log. The engine for one partition is three long-lived agents
//! exchanging messages through single-consumer mailboxes:
//!
//! * The **state machine** ([`state`]) owns the role, term, election timers
//!   and in-flight proposal tickets. It is driven by inbound wire messages,
//!   client replication requests and a periodic `CheckLeader` tick.
//! * The **WAL worker** ([`wal`]) owns the partition's propose and commit
//!   indices and serializes every access to the durable [log store](log).
//! * The **responder** ([`responder`]) performs outbound transport calls so
//!   the state machine never waits on the network.
//!
//! State is never shared between agents, only messages, so nothing within a
//! partition takes a lock. Spawn a partition with
//! [`PartitionHandle::spawn`](partition::PartitionHandle::spawn), give it a
//! [`LogStore`](log::LogStore), a [`Transport`](transport::Transport) and a
//! [`ReplicationEvents`](events::ReplicationEvents) sink, and route inbound
//! wire messages to it with
//! [`deliver`](partition::PartitionHandle::deliver).
//!
//! Replication is ticket-based: a leader acknowledges a client as soon as a
//! batch is durably proposed and returns the batch's hybrid timestamp; the
//! client polls the ticket until a quorum of followers has acknowledged the
//! batch and it commits.

pub mod clock;
pub mod config;
pub mod events;
pub mod log;
pub mod message;
pub mod partition;
pub mod responder;
pub mod state;
pub mod ticket;
pub mod transport;
pub mod wal;
