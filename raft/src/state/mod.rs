//! The per-partition state machine: single owner of all election state.
//!
//! One state machine runs per partition and is the only mutator of the
//! partition's role, term, timers, expected-leader map, follower match
//! indices and in-flight proposal tickets, so none of that state is ever
//! locked. It consumes control messages from its mailbox one at a time and
//! emits outbound traffic by posting to the partition's responder.
//!
//! Timers never block: a periodic `CheckLeader` message drives heartbeats,
//! election timeouts and candidacy expiry. A failure inside any handler is
//! logged and the next message is processed; a single bad message cannot
//! halt a partition.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use core::fmt;

use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::HybridClock;
use crate::config::RaftConfig;
use crate::message::{
    AppendLogsRequest, CompleteAppendLogsRequest, HybridTime, LogEntry, OperationStatus,
    RequestVotesRequest, VoteRequest,
};
use crate::responder::ResponderMessage;
use crate::ticket::{ProposalTicket, TicketState};
use crate::wal::WalHandle;

/// How long a committed ticket stays answerable before reaping.
const TICKET_RETENTION_MS: i64 = 60_000;

/// How far behind a follower's match index replication rewinds, to tolerate
/// lost acknowledgments without a full log scan.
const MATCH_INDEX_REWIND: u64 = 3;

/// The role a replica plays in its partition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
}

/// A lock-free cell publishing the state machine's current role, so leader
/// checks that tolerate staleness never have to queue a message.
pub struct RoleCell(AtomicU8);

/// A snapshot of a partition's externally visible state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeState {
    pub role: NodeRole,
    pub term: u64,
    pub leader: Option<String>,
}

/// A client payload awaiting proposal.
pub struct ProposedEntry {
    pub log_type: String,
    pub data: Bytes,
}

/// The reply to a replication request. Commit is asynchronous: a `Success`
/// reply means the batch is durably proposed on the leader, and the ticket
/// can be polled until it reports committed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReplicateReply {
    pub status: OperationStatus,
    pub ticket: Option<HybridTime>,
}

/// A control message consumed by the state machine.
pub enum SmMessage {
    /// Periodic tick advancing every timer.
    CheckLeader,
    /// Replaces the peer list after a discovery refresh.
    UpdateNodes { peers: Vec<String> },
    /// Reports the partition's role, term and known leader.
    NodeState { reply: Sender<NodeState> },
    /// Reports the state of a proposal ticket.
    TicketState {
        time: HybridTime,
        reply: Sender<TicketState>,
    },
    /// Leader-side client request to replicate a batch.
    ReplicateLogs {
        entries: Vec<ProposedEntry>,
        reply: Sender<ReplicateReply>,
    },
    /// Leader-side client request to replicate a checkpoint marker.
    ReplicateCheckpoint { reply: Sender<ReplicateReply> },
    /// Inbound append or heartbeat from a leader.
    AppendLogs(AppendLogsRequest),
    /// Inbound acknowledgment of an append round.
    CompleteAppendLogs(CompleteAppendLogsRequest),
    /// Inbound request for our vote.
    RequestVotes(RequestVotesRequest),
    /// Inbound vote granted to our candidacy.
    Vote(VoteRequest),
}

/// An error inside a state machine handler. Logged by the run loop; never
/// fatal to the partition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RaftError {
    Wal(crate::wal::WalError),
}

/// Spawns the state machine thread for a partition and returns its mailbox.
pub fn spawn(
    partition: u32,
    config: Arc<RaftConfig>,
    wal: WalHandle,
    responder: Sender<ResponderMessage>,
    clock: Arc<HybridClock>,
    role_cell: Arc<RoleCell>,
) -> Sender<SmMessage> {
    let (sender, receiver) = unbounded();
    let _ = thread::spawn(move || {
        let mut rng = StdRng::from_entropy();
        let election_timeout =
            rng.gen_range(config.start_election_timeout..=config.end_election_timeout);
        StateMachine {
            partition,
            local: config.local_endpoint(),
            config,
            peers: Vec::new(),
            role: NodeRole::Follower,
            role_cell,
            current_term: 0,
            leader: None,
            last_heartbeat: HybridTime::default(),
            last_vote: HybridTime::default(),
            voting_started: HybridTime::default(),
            election_timeout,
            votes_by_term: BTreeMap::new(),
            expected_leader_by_term: BTreeMap::new(),
            match_index: BTreeMap::new(),
            active_proposals: BTreeMap::new(),
            recovered: false,
            wal,
            responder,
            clock,
            rng,
        }
        .run(receiver)
    });
    sender
}

struct StateMachine {
    partition: u32,
    config: Arc<RaftConfig>,
    /// The local node's `host:port` endpoint.
    local: String,
    /// Every other node in the cluster.
    peers: Vec<String>,

    role: NodeRole,
    role_cell: Arc<RoleCell>,
    current_term: u64,
    leader: Option<String>,

    last_heartbeat: HybridTime,
    last_vote: HybridTime,
    voting_started: HybridTime,
    /// Current randomized election timeout in milliseconds; grows after
    /// every failed candidacy to break symmetric livelocks.
    election_timeout: u64,

    /// Endpoints that voted for this node's candidacy, by term. The local
    /// self-vote owns the term key, which is what blocks granting a vote to
    /// anyone else in a term this node ran in.
    votes_by_term: BTreeMap<u64, BTreeSet<String>>,
    /// The single endpoint this node will accept appends from, by term.
    expected_leader_by_term: BTreeMap<u64, String>,
    /// Per follower, the commit index it last acknowledged.
    match_index: BTreeMap<String, u64>,
    /// In-flight and recently committed proposal tickets, ordered by their
    /// hybrid timestamp so reaping can walk the prefix.
    active_proposals: BTreeMap<HybridTime, ProposalTicket>,

    recovered: bool,

    wal: WalHandle,
    responder: Sender<ResponderMessage>,
    clock: Arc<HybridClock>,
    rng: StdRng,
}

impl StateMachine {
    fn run(mut self, receiver: Receiver<SmMessage>) {
        for message in receiver {
            let started = Instant::now();
            if let Err(err) = self.handle(message) {
                error!("partition {} handler failed: {}", self.partition, err);
            }
            let elapsed = started.elapsed().as_millis() as u64;
            if elapsed >= self.config.slow_state_machine_log {
                warn!(
                    "partition {} spent {} ms on one message",
                    self.partition, elapsed
                );
            }
        }
    }

    fn handle(&mut self, message: SmMessage) -> Result<(), RaftError> {
        self.ensure_recovered()?;
        match message {
            SmMessage::CheckLeader => self.check_leader(),
            SmMessage::UpdateNodes { peers } => {
                self.update_nodes(peers);
                Ok(())
            }
            SmMessage::NodeState { reply } => {
                let _ = reply.send(NodeState {
                    role: self.role,
                    term: self.current_term,
                    leader: self.leader.clone(),
                });
                Ok(())
            }
            SmMessage::TicketState { time, reply } => {
                let state = match self.active_proposals.get(&time) {
                    Some(ticket) => ticket.state(),
                    None => TicketState::NotFound,
                };
                let _ = reply.send(state);
                Ok(())
            }
            SmMessage::ReplicateLogs { entries, reply } => {
                let time = self.clock.local_event();
                let logs = entries
                    .into_iter()
                    .map(|entry| {
                        LogEntry::proposed(
                            self.current_term,
                            entry.log_type,
                            entry.data.to_vec(),
                            time,
                        )
                    })
                    .collect();
                let _ = reply.send(self.replicate(time, logs));
                Ok(())
            }
            SmMessage::ReplicateCheckpoint { reply } => {
                let time = self.clock.local_event();
                let logs = vec![LogEntry::proposed_checkpoint(self.current_term, time)];
                let _ = reply.send(self.replicate(time, logs));
                Ok(())
            }
            SmMessage::AppendLogs(request) => self.handle_append_logs(request),
            SmMessage::CompleteAppendLogs(request) => self.handle_complete_append_logs(request),
            SmMessage::RequestVotes(request) => self.handle_request_votes(request),
            SmMessage::Vote(request) => self.handle_vote(request),
        }
    }

    /// Replays the durable log before the first message is processed. Runs
    /// at most once per lifetime; a failure leaves the flag unset so the
    /// next message retries.
    fn ensure_recovered(&mut self) -> Result<(), RaftError> {
        if self.recovered {
            return Ok(());
        }
        let commit_index = self.wal.recover()?;
        self.current_term = self.wal.current_term()?;
        self.last_heartbeat = self.clock.local_event();
        self.recovered = true;
        info!(
            "partition {} ready at term {} with commit index {}",
            self.partition, self.current_term, commit_index
        );
        Ok(())
    }

    //
    // timers
    //

    fn check_leader(&mut self) -> Result<(), RaftError> {
        let now = self.clock.local_event();
        match self.role {
            NodeRole::Leader => {
                if now.millis_since(&self.last_heartbeat)
                    >= self.config.heartbeat_interval as i64
                {
                    self.send_heartbeat(now);
                }
                self.reap_tickets(now);
                Ok(())
            }
            NodeRole::Candidate => {
                if now.millis_since(&self.voting_started) < self.config.voting_timeout as i64 {
                    return Ok(());
                }
                info!(
                    "partition {} candidacy at term {} timed out without quorum",
                    self.partition, self.current_term
                );
                self.set_role(NodeRole::Follower);
                self.leader = None;
                self.expected_leader_by_term.clear();
                self.match_index.clear();
                self.active_proposals.clear();
                let low = self.config.start_election_timeout_increment;
                let high = self.config.end_election_timeout_increment;
                self.election_timeout += self.rng.gen_range(low..=high);
                self.last_heartbeat = now;
                Ok(())
            }
            NodeRole::Follower => {
                if now.millis_since(&self.last_heartbeat) < self.election_timeout as i64 {
                    return Ok(());
                }
                if now.millis_since(&self.last_vote) < 2 * self.election_timeout as i64 {
                    return Ok(());
                }
                self.start_election(now)
            }
        }
    }

    fn start_election(&mut self, now: HybridTime) -> Result<(), RaftError> {
        self.set_role(NodeRole::Candidate);
        self.current_term += 1;
        self.voting_started = now;
        self.votes_by_term
            .entry(self.current_term)
            .or_insert_with(BTreeSet::new)
            .insert(self.local.clone());

        let max_log_id = self.wal.max_log()?;
        info!(
            "partition {} became candidate at term {} with max log {}",
            self.partition, self.current_term, max_log_id
        );
        for peer in self.peers.clone() {
            let request = RequestVotesRequest {
                partition: self.partition,
                term: self.current_term,
                max_log_id,
                time: self.clock.send_event(),
                endpoint: self.local.clone(),
            };
            let _ = self
                .responder
                .send(ResponderMessage::SendRequestVotes { to: peer, request });
        }
        Ok(())
    }

    fn send_heartbeat(&mut self, now: HybridTime) {
        self.last_heartbeat = now;
        for peer in self.peers.clone() {
            self.post_append_logs(peer, Vec::new(), self.clock.send_event());
        }
    }

    /// Drops committed tickets old enough that no client still polls them.
    fn reap_tickets(&mut self, now: HybridTime) {
        let horizon = now.physical - TICKET_RETENTION_MS;
        let expired: Vec<HybridTime> = self
            .active_proposals
            .iter()
            .take_while(|(time, _)| time.physical < horizon)
            .filter(|(_, ticket)| ticket.committed())
            .map(|(time, _)| *time)
            .collect();
        for time in expired {
            self.active_proposals.remove(&time);
        }
    }

    //
    // elections
    //

    fn handle_request_votes(&mut self, request: RequestVotesRequest) -> Result<(), RaftError> {
        let vote_term = request.term;
        if self.votes_by_term.contains_key(&vote_term) {
            debug!(
                "partition {} ignoring vote request at term {} it ran in",
                self.partition, vote_term
            );
            return Ok(());
        }
        if self.role != NodeRole::Follower && vote_term == self.current_term {
            return Ok(());
        }
        if self.current_term > vote_term {
            debug!(
                "partition {} ignoring vote request at old term {} < {}",
                self.partition, vote_term, self.current_term
            );
            return Ok(());
        }
        if self.expected_leader_by_term.contains_key(&vote_term) {
            return Ok(());
        }

        let max_log_id = self.wal.max_log()?;
        if max_log_id > request.max_log_id {
            // our log is ahead of the requester's; raise the term so this
            // node seeks leadership itself
            self.current_term += 1;
            info!(
                "partition {} refused vote for {} behind at log {} < {}",
                self.partition, request.endpoint, request.max_log_id, max_log_id
            );
            return Ok(());
        }

        self.expected_leader_by_term
            .insert(vote_term, request.endpoint.clone());
        let received = self.clock.receive_event(request.time);
        self.last_heartbeat = received;
        self.last_vote = received;

        info!(
            "partition {} voting for {} at term {}",
            self.partition, request.endpoint, vote_term
        );
        let reply = VoteRequest {
            partition: self.partition,
            term: vote_term,
            max_log_id,
            time: self.clock.send_event(),
            endpoint: self.local.clone(),
        };
        let _ = self.responder.send(ResponderMessage::SendVote {
            to: request.endpoint,
            request: reply,
        });
        Ok(())
    }

    fn handle_vote(&mut self, request: VoteRequest) -> Result<(), RaftError> {
        if self.role == NodeRole::Follower {
            debug!(
                "partition {} ignoring unsolicited vote from {}",
                self.partition, request.endpoint
            );
            return Ok(());
        }
        if request.term < self.current_term {
            return Ok(());
        }
        if self.role == NodeRole::Leader {
            self.match_index
                .insert(request.endpoint, request.max_log_id);
            return Ok(());
        }

        let max_log_id = self.wal.max_log()?;
        if max_log_id < request.max_log_id {
            // refuse to lead behind a voter
            info!(
                "partition {} ignoring vote from {} ahead at log {} > {}",
                self.partition, request.endpoint, request.max_log_id, max_log_id
            );
            return Ok(());
        }

        let votes = self
            .votes_by_term
            .entry(request.term)
            .or_insert_with(BTreeSet::new);
        votes.insert(request.endpoint.clone());
        let count = votes.len();
        self.match_index
            .insert(request.endpoint, request.max_log_id);

        if count >= quorum_size(self.peers.len()) {
            self.become_leader();
        }
        Ok(())
    }

    fn become_leader(&mut self) {
        self.set_role(NodeRole::Leader);
        self.leader = Some(self.local.clone());
        let now = self.clock.local_event();
        info!(
            "partition {} became leader at term {}",
            self.partition, self.current_term
        );
        self.send_heartbeat(now);
    }

    //
    // leader replication
    //

    fn replicate(&mut self, time: HybridTime, logs: Vec<LogEntry>) -> ReplicateReply {
        if self.role != NodeRole::Leader {
            return ReplicateReply {
                status: OperationStatus::NodeIsNotLeader,
                ticket: None,
            };
        }
        if self.peers.is_empty() {
            warn!(
                "partition {} cannot replicate without known peers",
                self.partition
            );
            return ReplicateReply {
                status: OperationStatus::Errored,
                ticket: None,
            };
        }

        let logs = match self.wal.propose(self.current_term, time, logs) {
            Ok(logs) => logs,
            Err(err) => {
                error!(
                    "partition {} failed to propose batch: {}",
                    self.partition, err
                );
                return ReplicateReply {
                    status: OperationStatus::Errored,
                    ticket: None,
                };
            }
        };

        let expected = self.peers.iter().cloned().collect();
        self.active_proposals
            .insert(time, ProposalTicket::new(logs, expected));

        for peer in self.peers.clone() {
            self.send_entries_since_match(peer, time);
        }
        ReplicateReply {
            status: OperationStatus::Success,
            ticket: Some(time),
        }
    }

    /// Sends `peer` everything from a little before its acknowledged match
    /// index; the rewind covers acknowledgments lost on the wire, and the
    /// follower's sequence checks make redundant entries a no-op.
    fn send_entries_since_match(&mut self, peer: String, time: HybridTime) {
        let from_id = self
            .match_index
            .get(&peer)
            .copied()
            .unwrap_or(0)
            .saturating_sub(MATCH_INDEX_REWIND);
        match self.wal.range(from_id) {
            Ok(logs) => self.post_append_logs(peer, logs, time),
            Err(err) => warn!(
                "partition {} could not read log range for {}: {}",
                self.partition, peer, err
            ),
        }
    }

    fn handle_complete_append_logs(
        &mut self,
        request: CompleteAppendLogsRequest,
    ) -> Result<(), RaftError> {
        if request.committed_index > 0 {
            self.match_index
                .insert(request.endpoint.clone(), request.committed_index as u64);
        }
        if request.status() != OperationStatus::Success {
            warn!(
                "partition {} append to {} failed: {:?}",
                self.partition,
                request.endpoint,
                request.status()
            );
            return Ok(());
        }

        let time = request.time;
        let sender = request.endpoint;
        let quorum = quorum_size(self.peers.len());
        let (resend, quorum_reached) = match self.active_proposals.get_mut(&time) {
            None => return Ok(()),
            Some(ticket) => {
                ticket.acknowledge(sender.clone());
                if ticket.committed() {
                    (Some(ticket.logs().to_vec()), None)
                } else if ticket.has_quorum(quorum) {
                    (None, Some(ticket.logs().to_vec()))
                } else {
                    (None, None)
                }
            }
        };
        if let Some(committed) = resend {
            // a straggler acknowledged after the quorum; show it the
            // committed batch right away
            self.post_append_logs(sender, committed, self.clock.send_event());
            return Ok(());
        }
        let logs = match quorum_reached {
            Some(logs) => logs,
            None => return Ok(()),
        };

        let (commit_index, committed) = match self.wal.commit(self.current_term, time, logs) {
            Ok(committed) => committed,
            Err(err) => {
                // the ticket stays proposed; the next acknowledgment retries
                error!(
                    "partition {} failed to commit batch {}: {}",
                    self.partition, time, err
                );
                return Ok(());
            }
        };
        info!(
            "partition {} committed through {} at term {}",
            self.partition,
            commit_index - 1,
            self.current_term
        );

        let participants: Vec<String> = match self.active_proposals.get_mut(&time) {
            Some(ticket) => {
                ticket.mark_committed(committed.clone());
                ticket.acknowledged().iter().cloned().collect()
            }
            None => Vec::new(),
        };
        // let every acknowledging follower observe the commit on its next
        // append round
        for peer in participants {
            self.post_append_logs(peer, committed.clone(), self.clock.send_event());
        }
        Ok(())
    }

    //
    // follower replication
    //

    fn handle_append_logs(&mut self, request: AppendLogsRequest) -> Result<(), RaftError> {
        let leader_term = request.term;
        let from = request.endpoint.clone();

        if self.current_term > leader_term {
            debug!(
                "partition {} rejecting append from {} at old term {} < {}",
                self.partition, from, leader_term, self.current_term
            );
            self.post_complete_append_logs(
                from,
                OperationStatus::LeaderInOldTerm,
                -1,
                request.time,
            );
            return Ok(());
        }
        if let Some(expected) = self.expected_leader_by_term.get(&leader_term) {
            if expected != &from {
                debug!(
                    "partition {} rejecting append from {}; expecting {} at term {}",
                    self.partition, from, expected, leader_term
                );
                self.post_complete_append_logs(
                    from,
                    OperationStatus::LeaderInOldTerm,
                    -1,
                    request.time,
                );
                return Ok(());
            }
        }

        if self.leader.as_ref() != Some(&from) || self.role != NodeRole::Follower {
            self.set_role(NodeRole::Follower);
            self.match_index.clear();
            self.active_proposals.clear();
            info!(
                "partition {} following {} at term {}",
                self.partition, from, leader_term
            );
        }
        self.current_term = leader_term;
        self.leader = Some(from.clone());
        self.expected_leader_by_term
            .insert(leader_term, from.clone());
        self.last_heartbeat = self.clock.receive_event(request.time);

        if request.logs.is_empty() {
            self.post_complete_append_logs(from, OperationStatus::Success, -1, request.time);
            return Ok(());
        }

        match self
            .wal
            .propose_or_commit(leader_term, request.time, request.logs)
        {
            Ok(commit_index) => {
                self.post_complete_append_logs(
                    from,
                    OperationStatus::Success,
                    commit_index,
                    request.time,
                );
            }
            Err(err) => {
                error!(
                    "partition {} failed to apply append from {}: {}",
                    self.partition, from, err
                );
                self.post_complete_append_logs(from, OperationStatus::Errored, -1, request.time);
            }
        }
        Ok(())
    }

    //
    // plumbing
    //

    fn update_nodes(&mut self, peers: Vec<String>) {
        let local = &self.local;
        self.peers = peers.into_iter().filter(|peer| peer != local).collect();
        debug!(
            "partition {} now sees {} peers",
            self.partition,
            self.peers.len()
        );
    }

    fn set_role(&mut self, role: NodeRole) {
        self.role = role;
        self.role_cell.store(role);
    }

    /// `time` identifies the append round: acknowledgments echo it back, so
    /// rounds that carry a fresh proposal batch must use the batch's ticket
    /// timestamp.
    fn post_append_logs(&self, to: String, logs: Vec<LogEntry>, time: HybridTime) {
        let request = AppendLogsRequest {
            partition: self.partition,
            term: self.current_term,
            time,
            endpoint: self.local.clone(),
            logs,
        };
        let _ = self
            .responder
            .send(ResponderMessage::SendAppendLogs { to, request });
    }

    fn post_complete_append_logs(
        &self,
        to: String,
        status: OperationStatus,
        committed_index: i64,
        time: HybridTime,
    ) {
        let request = CompleteAppendLogsRequest {
            partition: self.partition,
            status: status as i32,
            committed_index,
            time,
            endpoint: self.local.clone(),
        };
        let _ = self
            .responder
            .send(ResponderMessage::SendCompleteAppendLogs { to, request });
    }
}

/// The number of acknowledgments, counting the leader's implicit one, needed
/// to commit a batch or win an election in a cluster with `peer_count` peers
/// besides the local node.
pub fn quorum_size(peer_count: usize) -> usize {
    core::cmp::max(2, (peer_count + 1) / 2)
}

//
// NodeRole impls
//

impl fmt::Display for NodeRole {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Follower => fmt.write_str("follower"),
            NodeRole::Candidate => fmt.write_str("candidate"),
            NodeRole::Leader => fmt.write_str("leader"),
        }
    }
}

//
// RoleCell impls
//

impl RoleCell {
    pub fn new() -> Self {
        RoleCell(AtomicU8::new(NodeRole::Follower as u8))
    }

    pub fn load(&self) -> NodeRole {
        match self.0.load(Ordering::Relaxed) {
            2 => NodeRole::Leader,
            1 => NodeRole::Candidate,
            _ => NodeRole::Follower,
        }
    }

    fn store(&self, role: NodeRole) {
        self.0.store(role as u8, Ordering::Relaxed);
    }
}

impl Default for RoleCell {
    fn default() -> Self {
        RoleCell::new()
    }
}

//
// RaftError impls
//

impl fmt::Display for RaftError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaftError::Wal(err) => write!(fmt, "wal: {}", err),
        }
    }
}

impl From<crate::wal::WalError> for RaftError {
    fn from(err: crate::wal::WalError) -> Self {
        RaftError::Wal(err)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest(
        peer_count,
        expected,
        case(0, 2),
        case(1, 2),
        case(2, 2),
        case(3, 2),
        case(4, 2),
        case(5, 3),
        case(6, 3),
        case(7, 4)
    )]
    fn quorum_counts_the_leader_implicitly(peer_count: usize, expected: usize) {
        assert_eq!(quorum_size(peer_count), expected);
    }

    #[test]
    fn role_cell_round_trips() {
        let cell = RoleCell::new();
        assert_eq!(cell.load(), NodeRole::Follower);
        cell.store(NodeRole::Leader);
        assert_eq!(cell.load(), NodeRole::Leader);
        cell.store(NodeRole::Candidate);
        assert_eq!(cell.load(), NodeRole::Candidate);
    }
}
