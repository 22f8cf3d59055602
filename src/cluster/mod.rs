//! Cluster membership: who the peers are and how they are found.

use std::sync::Mutex;

use core::fmt;

mod util;

/// How a node announces itself and enumerates its peers.
///
/// Endpoints are `host:port` strings; `nodes` returns the full cluster view
/// including the local endpoint, and each partition filters itself out.
pub trait Discovery: Send + Sync {
    /// Announces the local endpoint to the cluster.
    fn register(&self, endpoint: &str) -> Result<(), DiscoveryError>;

    /// Returns every currently known cluster endpoint.
    fn nodes(&self) -> Vec<String>;
}

/// An error announcing the local endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DiscoveryError {
    Failed(String),
}

/// A discovery backed by a plain endpoint list.
///
/// Used two ways: pre-filled with a fixed peer list, or shared between the
/// nodes of an in-process cluster so that `register` calls accumulate into
/// one view.
pub struct StaticDiscovery {
    endpoints: Mutex<Vec<String>>,
}

/// Discovery by scanning the local network for listening peers, for clusters
/// deployed on one flat network segment.
///
/// Enumerates the host's private IPv4 addresses and probes a small window of
/// ports around `listening_port` on each /24 neighborhood. Registration is
/// implicit: a node is discoverable as soon as its transport listens.
pub struct LanDiscovery {
    listening_port: u16,
}

//
// StaticDiscovery impls
//

impl StaticDiscovery {
    /// An empty registry that fills up as nodes register.
    pub fn new() -> Self {
        StaticDiscovery {
            endpoints: Mutex::new(Vec::new()),
        }
    }

    /// A fixed, manually provided cluster view.
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        StaticDiscovery {
            endpoints: Mutex::new(endpoints),
        }
    }
}

impl Default for StaticDiscovery {
    fn default() -> Self {
        StaticDiscovery::new()
    }
}

impl Discovery for StaticDiscovery {
    fn register(&self, endpoint: &str) -> Result<(), DiscoveryError> {
        let mut endpoints = self
            .endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !endpoints.iter().any(|known| known == endpoint) {
            endpoints.push(endpoint.to_string());
        }
        Ok(())
    }

    fn nodes(&self) -> Vec<String> {
        let endpoints = self
            .endpoints
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        endpoints.clone()
    }
}

//
// LanDiscovery impls
//

impl LanDiscovery {
    pub fn new(listening_port: u16) -> Self {
        LanDiscovery { listening_port }
    }
}

impl Discovery for LanDiscovery {
    fn register(&self, _endpoint: &str) -> Result<(), DiscoveryError> {
        // nothing to announce; peers find this node by probing its port
        Ok(())
    }

    fn nodes(&self) -> Vec<String> {
        let addresses = util::local_network_ip_addresses(util::host_ip_addresses());
        let ports: Vec<u16> = (0..2u16).map(|offset| self.listening_port + offset).collect();
        util::scan_ip_range(addresses, ports)
    }
}

//
// DiscoveryError impls
//

impl fmt::Display for DiscoveryError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Failed(reason) => write!(fmt, "discovery failed: {}", reason),
        }
    }
}
