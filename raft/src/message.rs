//! Message types exchanged between replicas.
//!
//! This module provides the data types carried over the wire between cluster
//! nodes, plus the hybrid logical timestamps that stamp every proposal and
//! vote. All types serialize through `prost` with explicit field tags so that
//! any binary transport can carry them unchanged.

use core::cmp::Ordering;
use core::fmt;

/// A hybrid logical timestamp: a physical wall-clock component in
/// milliseconds paired with a logical counter that breaks ties between events
/// sharing the same millisecond.
///
/// Timestamps order by `physical` first and `counter` second. The leader keys
/// proposal tickets by the timestamp assigned to the batch, so every
/// timestamp returned by [`HybridClock`](crate::clock::HybridClock) is
/// strictly greater than any returned before it.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HybridTime {
    /// Milliseconds of physical wall-clock time.
    #[prost(int64, required, tag = "1")]
    pub physical: i64,

    /// Logical counter disambiguating events within one millisecond.
    #[prost(uint32, required, tag = "2")]
    pub counter: u32,
}

/// The lifecycle state of a replicated log entry.
///
/// Entries enter the log as `Proposed` and are superseded by a `Committed`
/// record once a quorum has acknowledged them. Checkpoint entries follow the
/// same two steps under their own pair of states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RaftLogType {
    Proposed = 0,
    Committed = 1,
    ProposedCheckpoint = 2,
    CommittedCheckpoint = 3,
}

/// The outcome of a replication or append operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Success = 0,
    Errored = 1,
    NodeIsNotLeader = 2,
    LeaderInOldTerm = 3,
    LeaderInOutdatedTerm = 4,
}

/// An entry in a partition's replicated log.
#[derive(Clone, PartialEq, prost::Message)]
pub struct LogEntry {
    /// Monotonic per-partition id, starting at 1.
    #[prost(uint64, required, tag = "1")]
    pub id: u64,

    /// The term under which the entry was proposed.
    #[prost(uint64, required, tag = "2")]
    pub term: u64,

    /// The entry's lifecycle state, see [`RaftLogType`].
    #[prost(enumeration = "RaftLogType", tag = "3")]
    pub entry_type: i32,

    /// Opaque user tag describing the payload.
    #[prost(string, required, tag = "4")]
    pub log_type: String,

    /// Opaque payload bytes.
    #[prost(bytes = "vec", required, tag = "5")]
    pub data: Vec<u8>,

    /// Proposal time on the leader, receive time on a follower.
    #[prost(message, required, tag = "6")]
    pub time: HybridTime,
}

/// A request for votes broadcast by a candidate.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RequestVotesRequest {
    #[prost(uint32, required, tag = "1")]
    pub partition: u32,

    /// The term the candidate is running in.
    #[prost(uint64, required, tag = "2")]
    pub term: u64,

    /// The highest log id stored by the candidate.
    #[prost(uint64, required, tag = "3")]
    pub max_log_id: u64,

    #[prost(message, required, tag = "4")]
    pub time: HybridTime,

    /// The candidate's `host:port` endpoint.
    #[prost(string, required, tag = "5")]
    pub endpoint: String,
}

/// A vote granted to a candidate in response to [`RequestVotesRequest`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct VoteRequest {
    #[prost(uint32, required, tag = "1")]
    pub partition: u32,

    /// The term the vote is granted in.
    #[prost(uint64, required, tag = "2")]
    pub term: u64,

    /// The highest log id stored by the voter.
    #[prost(uint64, required, tag = "3")]
    pub max_log_id: u64,

    #[prost(message, required, tag = "4")]
    pub time: HybridTime,

    /// The voter's `host:port` endpoint.
    #[prost(string, required, tag = "5")]
    pub endpoint: String,
}

/// A request to append log entries to a follower, or a bare heartbeat when
/// `logs` is empty.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendLogsRequest {
    #[prost(uint32, required, tag = "1")]
    pub partition: u32,

    /// The sender's leadership term.
    #[prost(uint64, required, tag = "2")]
    pub term: u64,

    #[prost(message, required, tag = "3")]
    pub time: HybridTime,

    /// The sender's `host:port` endpoint.
    #[prost(string, required, tag = "4")]
    pub endpoint: String,

    /// Consecutive log entries to append; empty for heartbeats.
    #[prost(message, repeated, tag = "5")]
    pub logs: Vec<LogEntry>,
}

/// The acknowledgment a replica sends back after processing
/// [`AppendLogsRequest`]. Asynchronous transports deliver it as a reverse
/// call; synchronous ones may fold the same fields into
/// [`AppendLogsResponse`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct CompleteAppendLogsRequest {
    #[prost(uint32, required, tag = "1")]
    pub partition: u32,

    #[prost(enumeration = "OperationStatus", tag = "2")]
    pub status: i32,

    /// The acknowledging replica's commit index, or -1 when the request was
    /// a heartbeat or was rejected as a whole.
    #[prost(int64, required, tag = "3")]
    pub committed_index: i64,

    /// Echo of the timestamp that identified the append round.
    #[prost(message, required, tag = "4")]
    pub time: HybridTime,

    /// The acknowledging replica's `host:port` endpoint.
    #[prost(string, required, tag = "5")]
    pub endpoint: String,
}

/// The synchronous-transport shape of an append acknowledgment.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendLogsResponse {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub status: i32,

    #[prost(int64, required, tag = "2")]
    pub committed_index: i64,
}

/// Envelope for any inbound wire message, suitable for binary framing.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Envelope {
    #[prost(oneof = "InboundMessage", tags = "1, 2, 3, 4")]
    pub message: Option<InboundMessage>,
}

/// An inbound wire message, demultiplexed by kind and partition onto the
/// target partition's state machine mailbox.
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum InboundMessage {
    #[prost(message, tag = "1")]
    RequestVotes(RequestVotesRequest),

    #[prost(message, tag = "2")]
    Vote(VoteRequest),

    #[prost(message, tag = "3")]
    AppendLogs(AppendLogsRequest),

    #[prost(message, tag = "4")]
    CompleteAppendLogs(CompleteAppendLogsRequest),
}

//
// HybridTime impls
//

impl HybridTime {
    /// Milliseconds of physical time elapsed between `earlier` and `self`.
    /// Negative when `self` is physically older.
    pub fn millis_since(&self, earlier: &HybridTime) -> i64 {
        self.physical.saturating_sub(earlier.physical)
    }
}

impl Copy for HybridTime {}

impl Eq for HybridTime {}

impl PartialOrd for HybridTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HybridTime {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.physical, self.counter).cmp(&(other.physical, other.counter))
    }
}

impl fmt::Display for HybridTime {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { physical, counter } = self;
        fmt.debug_tuple("HybridTime")
            .field(physical)
            .field(counter)
            .finish()
    }
}

//
// RaftLogType impls
//

impl RaftLogType {
    /// Whether this state marks a checkpoint entry.
    pub fn is_checkpoint(self) -> bool {
        match self {
            RaftLogType::ProposedCheckpoint | RaftLogType::CommittedCheckpoint => true,
            RaftLogType::Proposed | RaftLogType::Committed => false,
        }
    }

    /// Whether this state marks a committed entry.
    pub fn is_committed(self) -> bool {
        match self {
            RaftLogType::Committed | RaftLogType::CommittedCheckpoint => true,
            RaftLogType::Proposed | RaftLogType::ProposedCheckpoint => false,
        }
    }

    /// The committed state corresponding to this state.
    pub fn committed_form(self) -> RaftLogType {
        match self {
            RaftLogType::Proposed | RaftLogType::Committed => RaftLogType::Committed,
            RaftLogType::ProposedCheckpoint | RaftLogType::CommittedCheckpoint => {
                RaftLogType::CommittedCheckpoint
            }
        }
    }
}

//
// LogEntry impls
//

impl LogEntry {
    /// Builds a not-yet-numbered `Proposed` entry; the WAL worker assigns the
    /// id when the entry is durably proposed.
    pub fn proposed(term: u64, log_type: String, data: Vec<u8>, time: HybridTime) -> LogEntry {
        LogEntry {
            id: 0,
            term,
            entry_type: RaftLogType::Proposed as i32,
            log_type,
            data,
            time,
        }
    }

    /// Builds a not-yet-numbered `ProposedCheckpoint` entry. The payload of a
    /// checkpoint is irrelevant to replay.
    pub fn proposed_checkpoint(term: u64, time: HybridTime) -> LogEntry {
        LogEntry {
            id: 0,
            term,
            entry_type: RaftLogType::ProposedCheckpoint as i32,
            log_type: String::new(),
            data: Vec::new(),
            time,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("LogEntry")
            .field("id", &self.id)
            .field("term", &self.term)
            .field("type", &self.entry_type())
            .field("log_type", &self.log_type)
            .field("data", &self.data.len())
            .finish()
    }
}

//
// Request impls
//

impl fmt::Display for RequestVotesRequest {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("RequestVotesRequest")
            .field("partition", &self.partition)
            .field("term", &self.term)
            .field("max_log_id", &self.max_log_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl fmt::Display for VoteRequest {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("VoteRequest")
            .field("partition", &self.partition)
            .field("term", &self.term)
            .field("max_log_id", &self.max_log_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl fmt::Display for AppendLogsRequest {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("AppendLogsRequest")
            .field("partition", &self.partition)
            .field("term", &self.term)
            .field("endpoint", &self.endpoint)
            .field("logs", &self.logs.len())
            .finish()
    }
}

impl fmt::Display for CompleteAppendLogsRequest {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("CompleteAppendLogsRequest")
            .field("partition", &self.partition)
            .field("status", &self.status())
            .field("committed_index", &self.committed_index)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

//
// InboundMessage impls
//

impl InboundMessage {
    /// The partition the message targets, used to demultiplex onto the right
    /// state machine mailbox.
    pub fn partition(&self) -> u32 {
        match self {
            InboundMessage::RequestVotes(request) => request.partition,
            InboundMessage::Vote(request) => request.partition,
            InboundMessage::AppendLogs(request) => request.partition,
            InboundMessage::CompleteAppendLogs(request) => request.partition,
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundMessage::RequestVotes(request) => fmt::Display::fmt(request, fmt),
            InboundMessage::Vote(request) => fmt::Display::fmt(request, fmt),
            InboundMessage::AppendLogs(request) => fmt::Display::fmt(request, fmt),
            InboundMessage::CompleteAppendLogs(request) => fmt::Display::fmt(request, fmt),
        }
    }
}
