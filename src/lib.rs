//! Embeddable partitioned replication over Raft.
//!
//! A `quorumlog` cluster is a fixed set of nodes replicating a set of
//! independent log partitions. Each partition elects its own leader and
//! replicates its own write-ahead log; one process hosts a replica of every
//! partition and may lead some while following others.
//!
//! The consensus engine itself lives in the [`raft`] crate; this crate adds
//! what an embedder needs around it: peer [discovery](cluster), an
//! in-process [transport](ChannelTransport), and the
//! [`ClusterNode`] tying one process's replicas together.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use quorumlog::{ChannelTransport, ClusterNode, StaticDiscovery};
//! use raft::config::RaftConfig;
//! use raft::events::NoopEvents;
//! use raft::log::memory::MemoryLogStore;
//!
//! let config = RaftConfig::default();
//! let discovery = Arc::new(StaticDiscovery::new());
//! let transport = ChannelTransport::new();
//! let inbound = transport.bind(&config.local_endpoint());
//!
//! let node = ClusterNode::join_cluster(
//!     config,
//!     discovery,
//!     Arc::new(MemoryLogStore::new()),
//!     Arc::new(transport),
//!     Arc::new(NoopEvents),
//!     inbound,
//! )
//! .unwrap();
//!
//! node.update_nodes();
//! if node.am_i_leader(0).unwrap() {
//!     let outcome = node.replicate_logs(0, "greeting", &b"hi"[..]).unwrap();
//!     println!("proposed with ticket {:?}", outcome.ticket);
//! }
//! ```

pub mod cluster;
mod node;
mod transport;

pub use cluster::{Discovery, DiscoveryError, LanDiscovery, StaticDiscovery};
pub use node::{ClusterNode, NodeError, ReplicateOutcome};
pub use storage::FileLogStore;
pub use transport::ChannelTransport;
