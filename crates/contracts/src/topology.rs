//! Topology - replica membership of one logical function

use std::collections::HashMap;

/// Current replica name -> address mapping
pub type Topology = HashMap<String, String>;

/// Kind of change reported by a topology watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointChange {
    /// Endpoints were added or changed
    Updated,
    /// The function's endpoints object was removed
    Deleted,
}

/// One replica address as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Pod / replica name (may be empty when the orchestrator omits it)
    pub name: String,
    /// `ip:port`
    pub addr: String,
}

/// Endpoints of one logical function
#[derive(Debug, Clone, Default)]
pub struct FunctionEndpoints {
    pub namespace: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub pods: Vec<Endpoint>,
}

/// Event emitted by a topology watcher
#[derive(Debug, Clone)]
pub struct EndpointEvent {
    pub change: EndpointChange,
    pub endpoints: FunctionEndpoints,
}

impl FunctionEndpoints {
    /// Snapshot as name -> address; unnamed pods are keyed by address
    pub fn to_topology(&self) -> Topology {
        self.pods
            .iter()
            .map(|pod| {
                let name = if pod.name.is_empty() {
                    pod.addr.clone()
                } else {
                    pod.name.clone()
                };
                (name, pod.addr.clone())
            })
            .collect()
    }
}
