//! An in-process transport delivering wire messages over channels.
//!
//! Every node of an in-process cluster shares one [`ChannelTransport`];
//! binding an endpoint yields the receiver the node drains into its
//! partitions. The same [`Transport`] seam is where an HTTP/JSON or binary
//! RPC transport plugs in for real deployments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{unbounded, Receiver, Sender};

use raft::message::{
    AppendLogsRequest, CompleteAppendLogsRequest, InboundMessage, RequestVotesRequest, VoteRequest,
};
use raft::transport::{Transport, TransportError};

/// A shared registry of endpoint mailboxes acting as the cluster's network.
#[derive(Clone)]
pub struct ChannelTransport {
    registry: Arc<Mutex<HashMap<String, Sender<InboundMessage>>>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        ChannelTransport {
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attaches `endpoint` to the network and returns the receiver carrying
    /// everything sent to it. Binding an endpoint again replaces the
    /// previous receiver.
    pub fn bind(&self, endpoint: &str) -> Receiver<InboundMessage> {
        let (sender, receiver) = unbounded();
        let mut registry = self.lock();
        registry.insert(endpoint.to_string(), sender);
        receiver
    }

    /// Detaches `endpoint`; its receiver disconnects and in-flight sends to
    /// it start failing.
    pub fn unbind(&self, endpoint: &str) {
        let mut registry = self.lock();
        registry.remove(endpoint);
    }

    fn deliver(&self, endpoint: &str, message: InboundMessage) -> Result<(), TransportError> {
        let registry = self.lock();
        let sender = registry
            .get(endpoint)
            .ok_or_else(|| TransportError::Unreachable(endpoint.to_string()))?;
        sender
            .send(message)
            .map_err(|_| TransportError::Unreachable(endpoint.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Sender<InboundMessage>>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        ChannelTransport::new()
    }
}

impl Transport for ChannelTransport {
    fn request_votes(
        &self,
        endpoint: &str,
        request: RequestVotesRequest,
    ) -> Result<(), TransportError> {
        self.deliver(endpoint, InboundMessage::RequestVotes(request))
    }

    fn vote(&self, endpoint: &str, request: VoteRequest) -> Result<(), TransportError> {
        self.deliver(endpoint, InboundMessage::Vote(request))
    }

    fn append_logs(
        &self,
        endpoint: &str,
        request: AppendLogsRequest,
    ) -> Result<(), TransportError> {
        self.deliver(endpoint, InboundMessage::AppendLogs(request))
    }

    fn complete_append_logs(
        &self,
        endpoint: &str,
        request: CompleteAppendLogsRequest,
    ) -> Result<(), TransportError> {
        self.deliver(endpoint, InboundMessage::CompleteAppendLogs(request))
    }
}

#[cfg(test)]
mod tests {
    use raft::message::HybridTime;

    use super::*;

    fn vote(partition: u32) -> VoteRequest {
        VoteRequest {
            partition,
            term: 1,
            max_log_id: 0,
            time: HybridTime::default(),
            endpoint: String::from("localhost:1"),
        }
    }

    #[test]
    fn delivers_to_the_bound_endpoint() {
        let transport = ChannelTransport::new();
        let inbound = transport.bind("localhost:2");

        transport.vote("localhost:2", vote(3)).unwrap();
        match inbound.recv().unwrap() {
            InboundMessage::Vote(request) => assert_eq!(request.partition, 3),
            other => panic!("unexpected message: {}", other),
        }
    }

    #[test]
    fn unknown_endpoints_are_unreachable() {
        let transport = ChannelTransport::new();
        let result = transport.vote("localhost:9", vote(0));
        assert_eq!(
            result,
            Err(TransportError::Unreachable(String::from("localhost:9")))
        );
    }

    #[test]
    fn unbound_endpoints_stop_receiving() {
        let transport = ChannelTransport::new();
        let _inbound = transport.bind("localhost:2");
        transport.unbind("localhost:2");
        assert!(transport.vote("localhost:2", vote(0)).is_err());
    }
}
