//! The outbound side of the wire transport.
//!
//! The engine is transport-agnostic: the responder hands fully-built requests
//! to a [`Transport`] implementation and ignores everything but the error.
//! Replies travel back as inbound messages (a vote in response to a request
//! for votes, a complete-append in response to an append), never as return
//! values, so implementations may discard whatever their wire-level response
//! is.
//!
//! Known bindings outside this crate: HTTP/JSON at
//! `/v1/raft/request-vote`, `/v1/raft/vote`, `/v1/raft/append-logs` and
//! `/v1/raft/complete-append-logs`, a binary RPC service exposing the same
//! four methods, and the in-process channel transport used by the embedder
//! crate. Implementations should bound each call with their own deadline
//! (around 5 s for votes and 10 s for appends); an expired call simply
//! surfaces as a transport error and is dropped.

use core::fmt;

use crate::message::{
    AppendLogsRequest, CompleteAppendLogsRequest, RequestVotesRequest, VoteRequest,
};

/// An error carrying a request to a peer. Always logged and dropped; missing
/// acknowledgments are resolved by the CheckLeader timers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// The peer endpoint is unknown or unreachable.
    Unreachable(String),
    /// The request reached the wire but failed to complete.
    Failed(String),
}

/// The four outbound RPCs a replica performs against its peers.
pub trait Transport: Send + Sync {
    /// Asks `endpoint` for its vote in a new term.
    fn request_votes(
        &self,
        endpoint: &str,
        request: RequestVotesRequest,
    ) -> Result<(), TransportError>;

    /// Grants a vote to the candidate at `endpoint`.
    fn vote(&self, endpoint: &str, request: VoteRequest) -> Result<(), TransportError>;

    /// Sends log entries, or a heartbeat, to the replica at `endpoint`.
    fn append_logs(&self, endpoint: &str, request: AppendLogsRequest)
        -> Result<(), TransportError>;

    /// Acknowledges an append round to the leader at `endpoint`.
    fn complete_append_logs(
        &self,
        endpoint: &str,
        request: CompleteAppendLogsRequest,
    ) -> Result<(), TransportError>;
}

//
// TransportError impls
//

impl fmt::Display for TransportError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unreachable(endpoint) => {
                write!(fmt, "endpoint {} is unreachable", endpoint)
            }
            TransportError::Failed(reason) => write!(fmt, "transport call failed: {}", reason),
        }
    }
}
