//! Configurable parameters of a cluster node.

/// Configuration shared by every partition hosted in a process.
///
/// All intervals and timeouts are in milliseconds. The same configuration
/// must be used by every node in a cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RaftConfig {
    /// Host the local node advertises to its peers.
    pub host: String,

    /// Port the local node advertises to its peers.
    pub port: u16,

    /// Number of partitions hosted by the process; partition ids run from 0
    /// to `max_partitions - 1`.
    pub max_partitions: u32,

    /// Lower bound of the initial randomized election timeout.
    pub start_election_timeout: u64,

    /// Upper bound of the initial randomized election timeout.
    pub end_election_timeout: u64,

    /// Lower bound of the random amount added to the election timeout after
    /// a failed candidacy.
    pub start_election_timeout_increment: u64,

    /// Upper bound of the random amount added to the election timeout after
    /// a failed candidacy.
    pub end_election_timeout_increment: u64,

    /// How long a leader waits between heartbeats to its followers.
    pub heartbeat_interval: u64,

    /// How long a candidate waits for a quorum of votes before reverting to
    /// follower.
    pub voting_timeout: u64,

    /// Period of the CheckLeader tick that drives every timer.
    pub check_leader_interval: u64,

    /// Processing time above which a single state machine message is logged
    /// as slow.
    pub slow_state_machine_log: u64,
}

impl RaftConfig {
    /// The `host:port` endpoint the local node is known by in the cluster.
    pub fn local_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RaftConfig {
    fn default() -> Self {
        RaftConfig {
            host: String::from("127.0.0.1"),
            port: 8686,
            max_partitions: 1,
            start_election_timeout: 1_500,
            end_election_timeout: 4_000,
            start_election_timeout_increment: 500,
            end_election_timeout_increment: 1_500,
            heartbeat_interval: 1_000,
            voting_timeout: 1_500,
            check_leader_interval: 500,
            slow_state_machine_log: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_endpoint_joins_host_and_port() {
        let config = RaftConfig {
            host: String::from("10.0.0.7"),
            port: 9000,
            ..RaftConfig::default()
        };
        assert_eq!(config.local_endpoint(), "10.0.0.7:9000");
    }

    #[test]
    fn default_timeouts_are_ordered() {
        let config = RaftConfig::default();
        assert!(config.start_election_timeout < config.end_election_timeout);
        assert!(config.start_election_timeout_increment < config.end_election_timeout_increment);
        assert!(config.check_leader_interval <= config.heartbeat_interval);
    }
}
