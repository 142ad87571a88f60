//! Topology tracking - endpoint events -> replica snapshots

use tracing::debug;

use contracts::{EndpointChange, EndpointEvent, Topology};

/// Replicas added and removed by one topology update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyChange {
    /// Newly started replica names, sorted
    pub added: Vec<String>,
    /// Stopped replica names, sorted
    pub removed: Vec<String>,
}

impl TopologyChange {
    /// True when the update was a no-op
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Folds endpoint events of one function into full topology snapshots
///
/// Events for other functions are ignored. A delete event, or an update with
/// no pods, yields an empty snapshot.
#[derive(Debug, Clone)]
pub struct TopologyReducer {
    function: String,
    snapshot: Topology,
}

impl TopologyReducer {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            snapshot: Topology::new(),
        }
    }

    /// Apply an event; returns the new snapshot when it differs from the last one
    pub fn apply(&mut self, event: &EndpointEvent) -> Option<Topology> {
        if event.endpoints.name != self.function {
            debug!(
                function = %self.function,
                other = %event.endpoints.name,
                "Ignoring endpoint event for another function"
            );
            return None;
        }

        let next = match event.change {
            EndpointChange::Updated => event.endpoints.to_topology(),
            EndpointChange::Deleted => Topology::new(),
        };

        if next == self.snapshot {
            return None;
        }

        self.snapshot = next.clone();
        Some(next)
    }

    /// Last snapshot produced
    pub fn snapshot(&self) -> &Topology {
        &self.snapshot
    }
}
