//! Router - replica pools of one logical function behind one task queue
//!
//! The router owns the shared task queue and the shared response queue. Both
//! are created once and outlive every replica; pools come and go as topology
//! snapshots arrive. Topology mutation is serialized by the replica map lock.

use async_channel::{Receiver, Sender, TrySendError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Connect, ContractError, DispatchConfig, EndpointEvent, RouterConfig, SubmitPolicy, Task,
    TaskResponse, Topology,
};
use invoker::HttpConnector;

use crate::error::DispatcherError;
use crate::metrics::MetricsSnapshot;
use crate::pool::ReplicaPool;
use crate::topology::{TopologyChange, TopologyReducer};

/// Dispatch router for one logical function
pub struct Router<C: Connect = HttpConnector> {
    function: String,
    config: RouterConfig,
    connector: C,
    replicas: Mutex<HashMap<String, ReplicaPool>>,
    watching: AtomicBool,
    input_tx: Sender<Task>,
    input_rx: Receiver<Task>,
    output_tx: Sender<TaskResponse>,
    output_rx: Receiver<TaskResponse>,
}

impl<C: Connect> Router<C> {
    /// Create a router with no replicas
    pub fn new(function: impl Into<String>, config: RouterConfig, connector: C) -> Self {
        let (input_tx, input_rx) = async_channel::bounded(config.input_capacity.max(1));
        let (output_tx, output_rx) = async_channel::bounded(config.output_capacity.max(1));

        Self {
            function: function.into(),
            config,
            connector,
            replicas: Mutex::new(HashMap::new()),
            watching: AtomicBool::new(false),
            input_tx,
            input_rx,
            output_tx,
            output_rx,
        }
    }

    /// Logical function name
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Reconcile running replicas with a full topology snapshot
    ///
    /// Replicas missing from `topology` are stopped and dropped, new names
    /// get a freshly started pool. A name that is already running keeps its
    /// original address.
    #[instrument(
        name = "router_update_endpoints",
        skip(self, topology),
        fields(function = %self.function, replicas = topology.len())
    )]
    pub async fn update_endpoints(&self, topology: &Topology) -> TopologyChange {
        let mut replicas = self.replicas.lock().await;

        let mut removed: Vec<String> = replicas
            .keys()
            .filter(|name| !topology.contains_key(*name))
            .cloned()
            .collect();
        removed.sort();

        let mut added: Vec<String> = topology
            .keys()
            .filter(|name| !replicas.contains_key(*name))
            .cloned()
            .collect();
        added.sort();

        let mut stopping = Vec::with_capacity(removed.len());
        for name in &removed {
            if let Some(mut pool) = replicas.remove(name) {
                info!(replica = %name, address = %pool.address(), "Removing replica");
                pool.signal_stop();
                stopping.push(pool);
            }
        }

        for (name, pool) in replicas.iter() {
            if let Some(address) = topology.get(name) {
                if address != pool.address() {
                    warn!(
                        replica = %name,
                        current = %pool.address(),
                        reported = %address,
                        "Replica address changed under the same name, keeping current address"
                    );
                }
            }
        }

        for name in &added {
            let address = &topology[name];
            info!(replica = %name, address = %address, workers = self.config.workers, "Adding replica");
            let pool = ReplicaPool::start(
                name.clone(),
                self.connector.connect(address),
                self.config.workers,
                self.input_rx.clone(),
                self.output_tx.clone(),
            );
            replicas.insert(name.clone(), pool);
        }

        observability::record_replica_count(&self.function, replicas.len());

        let change = TopologyChange { added, removed };
        if !change.is_empty() {
            debug!(
                added = change.added.len(),
                removed = change.removed.len(),
                total = replicas.len(),
                "Topology updated"
            );
        }
        drop(replicas);

        join_pools(stopping).await;
        change
    }

    /// Stop and drop one replica; false if it was not running
    #[instrument(name = "router_del_instance", skip(self), fields(function = %self.function))]
    pub async fn del_instance(&self, name: &str) -> bool {
        let mut pool = {
            let mut replicas = self.replicas.lock().await;
            let Some(pool) = replicas.remove(name) else {
                return false;
            };
            observability::record_replica_count(&self.function, replicas.len());
            pool
        };

        info!(replica = %name, address = %pool.address(), "Removing replica");
        pool.signal_stop();
        pool.join().await;
        true
    }

    /// Enqueue tasks in order on the shared task queue
    ///
    /// Returns the number of tasks enqueued. Under [`SubmitPolicy::Reject`] a
    /// full queue fails with [`DispatcherError::QueueFull`] naming the first
    /// task that did not fit; tasks before it stay enqueued.
    pub async fn submit<I>(&self, tasks: I) -> Result<usize, DispatcherError>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut submitted = 0;

        for task in tasks {
            match self.config.submit_policy {
                SubmitPolicy::Block => self
                    .input_tx
                    .send(task)
                    .await
                    .map_err(|_| DispatcherError::QueueClosed)?,
                SubmitPolicy::Reject => match self.input_tx.try_send(task) {
                    Ok(()) => {}
                    Err(TrySendError::Full(task)) => {
                        warn!(
                            function = %self.function,
                            sequence = task.sequence,
                            submitted,
                            "Task queue full, rejecting"
                        );
                        return Err(DispatcherError::QueueFull {
                            sequence: task.sequence,
                        });
                    }
                    Err(TrySendError::Closed(_)) => return Err(DispatcherError::QueueClosed),
                },
            }
            submitted += 1;
            observability::record_task_submitted(&self.function);
        }

        observability::record_queue_depth(&self.function, self.input_tx.len());
        Ok(submitted)
    }

    /// Shared response queue; the router never consumes from it
    pub fn responses(&self) -> Receiver<TaskResponse> {
        self.output_rx.clone()
    }

    /// Names of running replicas, sorted
    pub async fn replica_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.replicas.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of running replicas
    pub async fn replica_count(&self) -> usize {
        self.replicas.lock().await.len()
    }

    /// Per-replica metrics, sorted by replica name
    pub async fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let replicas = self.replicas.lock().await;
        let mut metrics: Vec<(String, MetricsSnapshot)> = replicas
            .iter()
            .map(|(name, pool)| (name.clone(), pool.metrics().snapshot()))
            .collect();
        metrics.sort_by(|a, b| a.0.cmp(&b.0));
        metrics
    }

    /// Tasks waiting in the shared queue
    pub fn queue_len(&self) -> usize {
        self.input_tx.len()
    }

    /// Stop every replica and close the task queue
    ///
    /// Every pool is signalled before any is awaited, and tasks still queued
    /// are discarded, so only invocations already in flight produce
    /// responses. Later submits fail with [`DispatcherError::QueueClosed`].
    #[instrument(name = "router_shutdown", skip(self), fields(function = %self.function))]
    pub async fn shutdown(&self) {
        let pools: Vec<ReplicaPool> = {
            let mut replicas = self.replicas.lock().await;
            let mut pools: Vec<ReplicaPool> = replicas.drain().map(|(_, pool)| pool).collect();
            for pool in &mut pools {
                pool.signal_stop();
            }
            pools
        };

        self.input_tx.close();
        let mut discarded = 0usize;
        while self.input_rx.try_recv().is_ok() {
            discarded += 1;
        }
        observability::record_replica_count(&self.function, 0);
        observability::record_queue_depth(&self.function, 0);

        join_pools(pools).await;

        info!(discarded, "Router shutdown complete");
    }

    /// Follow a stream of endpoint events
    ///
    /// Events are reduced to snapshots of this router's function and applied
    /// with [`Router::update_endpoints`]. The task ends when `events` closes.
    /// Only one watcher may be attached to a router.
    pub fn watch(
        self: Arc<Self>,
        mut events: mpsc::Receiver<EndpointEvent>,
    ) -> Result<JoinHandle<()>, DispatcherError> {
        if self.watching.swap(true, Ordering::SeqCst) {
            return Err(ContractError::topology(&self.function, "a watcher is already attached").into());
        }

        let handle = tokio::spawn(async move {
            let mut reducer = TopologyReducer::new(self.function.clone());
            info!(function = %self.function, "Watching endpoints");

            while let Some(event) = events.recv().await {
                if let Some(topology) = reducer.apply(&event) {
                    self.update_endpoints(&topology).await;
                }
            }

            self.watching.store(false, Ordering::SeqCst);
            info!(function = %self.function, "Endpoint event stream closed");
        });

        Ok(handle)
    }
}

/// Wait for signalled pools concurrently
async fn join_pools(pools: Vec<ReplicaPool>) {
    let mut joins = JoinSet::new();
    for pool in pools {
        joins.spawn(pool.join());
    }
    while let Some(result) = joins.join_next().await {
        if let Err(e) = result {
            error!(error = ?e, "Replica pool join panicked");
        }
    }
}

/// Build an HTTP router from configuration and start the static replicas
#[instrument(
    name = "router_create",
    skip(config),
    fields(function = %config.function.name, replicas = config.replicas.len())
)]
pub async fn create_router(config: &DispatchConfig) -> Result<Router, DispatcherError> {
    let connector = HttpConnector::new(&config.invoker)?;
    let router = Router::new(config.function.name.clone(), config.router.clone(), connector);

    if !config.replicas.is_empty() {
        router.update_endpoints(&config.topology()).await;
    }

    Ok(router)
}
