//! The responder: the partition's single outbound network consumer.
//!
//! The state machine never touches the transport itself; it posts send
//! requests here so that its own latency stays bounded by local work. Every
//! transport failure is logged and dropped, and the missing acknowledgment is
//! eventually resolved by a CheckLeader timeout.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

use crate::message::{
    AppendLogsRequest, CompleteAppendLogsRequest, RequestVotesRequest, VoteRequest,
};
use crate::transport::Transport;

/// A request for the responder to put on the wire.
pub enum ResponderMessage {
    SendRequestVotes {
        to: String,
        request: RequestVotesRequest,
    },
    SendVote {
        to: String,
        request: VoteRequest,
    },
    SendAppendLogs {
        to: String,
        request: AppendLogsRequest,
    },
    SendCompleteAppendLogs {
        to: String,
        request: CompleteAppendLogsRequest,
    },
}

/// Spawns the responder thread for a partition and returns its mailbox.
pub fn spawn(partition: u32, transport: Arc<dyn Transport>) -> Sender<ResponderMessage> {
    let (sender, receiver) = unbounded();
    let _ = thread::spawn(move || run(partition, receiver, transport));
    sender
}

fn run(partition: u32, receiver: Receiver<ResponderMessage>, transport: Arc<dyn Transport>) {
    for message in receiver {
        let result = match message {
            ResponderMessage::SendRequestVotes { to, request } => transport
                .request_votes(&to, request)
                .map_err(|err| (to, "request votes", err)),
            ResponderMessage::SendVote { to, request } => {
                transport.vote(&to, request).map_err(|err| (to, "vote", err))
            }
            ResponderMessage::SendAppendLogs { to, request } => transport
                .append_logs(&to, request)
                .map_err(|err| (to, "append logs", err)),
            ResponderMessage::SendCompleteAppendLogs { to, request } => transport
                .complete_append_logs(&to, request)
                .map_err(|err| (to, "complete append logs", err)),
        };

        if let Err((to, kind, err)) = result {
            warn!(
                "partition {} dropped {} to {}: {}",
                partition, kind, to, err
            );
        }
    }
}
