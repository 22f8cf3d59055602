#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};

use raft::clock::HybridClock;
use raft::config::RaftConfig;
use raft::events::ReplicationEvents;
use raft::log::memory::MemoryLogStore;
use raft::message::{
    AppendLogsRequest, CompleteAppendLogsRequest, InboundMessage, LogEntry, RequestVotesRequest,
    VoteRequest,
};
use raft::partition::PartitionHandle;
use raft::state::NodeRole;
use raft::transport::{Transport, TransportError};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An in-process transport delivering wire messages over channels keyed by
/// endpoint.
#[derive(Clone)]
pub struct LoopbackTransport {
    registry: Arc<Mutex<HashMap<String, Sender<InboundMessage>>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        LoopbackTransport {
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn bind(&self, endpoint: &str) -> Receiver<InboundMessage> {
        let (sender, receiver) = unbounded();
        let mut registry = self.registry.lock().unwrap();
        registry.insert(endpoint.to_string(), sender);
        receiver
    }

    fn deliver(&self, endpoint: &str, message: InboundMessage) -> Result<(), TransportError> {
        let registry = self.registry.lock().unwrap();
        let sender = registry
            .get(endpoint)
            .ok_or_else(|| TransportError::Unreachable(endpoint.to_string()))?;
        sender
            .send(message)
            .map_err(|_| TransportError::Unreachable(endpoint.to_string()))
    }
}

impl Transport for LoopbackTransport {
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

/// Records every delivery for assertions.
#[derive(Default)]
pub struct RecordingEvents {
    pub received: Mutex<Vec<(String, Vec<u8>)>>,
    pub restored: Mutex<Vec<(String, Vec<u8>)>>,
    pub errored: Mutex<Vec<u64>>,
}

impl RecordingEvents {
    pub fn received_count(&self, log_type: &str) -> usize {
        let received = self.received.lock().unwrap();
        received.iter().filter(|(kind, _)| kind == log_type).count()
    }

    pub fn restored_count(&self, log_type: &str) -> usize {
        let restored = self.restored.lock().unwrap();
        restored.iter().filter(|(kind, _)| kind == log_type).count()
    }
}

impl ReplicationEvents for RecordingEvents {
    fn replication_received(&self, log_type: &str, data: &[u8]) -> bool {
        let mut received = self.received.lock().unwrap();
        received.push((log_type.to_string(), data.to_vec()));
        true
    }

    fn replication_restored(&self, log_type: &str, data: &[u8]) -> bool {
        let mut restored = self.restored.lock().unwrap();
        restored.push((log_type.to_string(), data.to_vec()));
        true
    }

    fn replication_error(&self, log: &LogEntry) {
        let mut errored = self.errored.lock().unwrap();
        errored.push(log.id);
    }
}

pub struct TestReplica {
    pub endpoint: String,
    pub handle: PartitionHandle,
    pub store: Arc<MemoryLogStore>,
    pub events: Arc<RecordingEvents>,
}

/// A single-partition cluster of replicas wired over a loopback transport,
/// with a ticker thread per replica driving CheckLeader.
pub struct TestCluster {
    pub transport: LoopbackTransport,
    pub replicas: Vec<TestReplica>,
    stop: Arc<AtomicBool>,
}

pub fn test_config(port: u16) -> RaftConfig {
    RaftConfig {
        host: String::from("localhost"),
        port,
        max_partitions: 1,
        start_election_timeout: 150,
        end_election_timeout: 400,
        start_election_timeout_increment: 50,
        end_election_timeout_increment: 150,
        heartbeat_interval: 100,
        voting_timeout: 150,
        check_leader_interval: 40,
        slow_state_machine_log: 1_000,
    }
}

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

impl TestCluster {
    pub fn start(size: u16) -> TestCluster {
        let stores = (0..size).map(|_| Arc::new(MemoryLogStore::new())).collect();
        TestCluster::start_with_stores(stores)
    }

    /// Starts one replica per store, so tests can pre-seed or reuse storage
    /// across restarts.
    pub fn start_with_stores(stores: Vec<Arc<MemoryLogStore>>) -> TestCluster {
        init_logging();
        let transport = LoopbackTransport::new();
        let clock = Arc::new(HybridClock::new());
        let stop = Arc::new(AtomicBool::new(false));

        let replicas: Vec<TestReplica> = stores
            .into_iter()
            .enumerate()
            .map(|(index, store)| {
                let config = Arc::new(test_config(7000 + index as u16));
                let endpoint = config.local_endpoint();
                let events = Arc::new(RecordingEvents::default());
                let handle = PartitionHandle::spawn(
                    0,
                    Arc::clone(&config),
                    Arc::clone(&store),
                    Arc::new(transport.clone()),
                    Arc::clone(&events) as Arc<dyn ReplicationEvents>,
                    Arc::clone(&clock),
                );

                let inbound = transport.bind(&endpoint);
                let router = handle.clone();
                let _ = thread::spawn(move || {
                    for message in inbound {
                        router.deliver(message);
                    }
                });

                let ticker = handle.clone();
                let tick = crossbeam_channel::tick(Duration::from_millis(
                    config.check_leader_interval,
                ));
                let ticker_stop = Arc::clone(&stop);
                let _ = thread::spawn(move || {
                    for _ in tick {
                        if ticker_stop.load(Ordering::Relaxed) {
                            break;
                        }
                        ticker.check_leader();
                    }
                });

                TestReplica {
                    endpoint,
                    handle,
                    store,
                    events,
                }
            })
            .collect();

        let cluster = TestCluster {
            transport,
            replicas,
            stop,
        };
        cluster.update_all();
        cluster
    }

    /// Pushes the full endpoint list to every replica.
    pub fn update_all(&self) {
        let endpoints: Vec<String> = self
            .replicas
            .iter()
            .map(|replica| replica.endpoint.clone())
            .collect();
        for replica in &self.replicas {
            replica.handle.update_nodes(endpoints.clone());
        }
    }

    /// Stops the tickers so a stopped cluster goes quiet; threads blocked on
    /// mailboxes die with the process.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn leader_index(&self) -> Option<usize> {
        self.replicas
            .iter()
            .position(|replica| replica.handle.role_quick() == NodeRole::Leader)
    }

    /// Waits until some replica reports leadership and returns its index.
    pub fn wait_for_leader(&self) -> usize {
        self.wait_until("a leader is elected", |cluster| cluster.leader_index())
    }

    /// Polls `probe` until it yields a value or the wait timeout elapses.
    pub fn wait_until<T>(
        &self,
        what: &str,
        mut probe: impl FnMut(&TestCluster) -> Option<T>,
    ) -> T {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            if let Some(value) = probe(self) {
                return value;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting until {}",
                what
            );
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        self.shutdown();
    }
}
