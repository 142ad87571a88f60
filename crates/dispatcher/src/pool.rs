//! ReplicaPool - fixed set of workers bound to one replica address
//!
//! Every worker pulls from the task queue it was given at start. The router
//! hands the same queue to every pool, which is what load-balances tasks
//! across replicas: whichever worker of whichever replica is idle first takes
//! the next task. Do not split it into per-replica queues.
//!
//! ## Stop semantics
//!
//! Each worker owns one stop signal and checks it before dequeuing. Once the
//! signal is delivered the worker never takes another task; a task already
//! being invoked runs to completion and its response is delivered before
//! [`ReplicaPool::stop`] returns.

use async_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Invocation, Invoke, InvokeError, Task, TaskResponse};

use crate::metrics::ReplicaMetrics;

/// Handle to the running workers of one replica
pub struct ReplicaPool {
    /// Replica name
    name: String,
    /// Replica address, fixed for the pool's lifetime
    address: String,
    /// One stop signal per worker
    stops: Vec<oneshot::Sender<()>>,
    /// Worker task handles
    workers: Vec<JoinHandle<()>>,
    /// Shared metrics
    metrics: Arc<ReplicaMetrics>,
}

impl ReplicaPool {
    /// Spawn `worker_count` workers pulling from `input`
    ///
    /// Responses go to the task's own sink when it has one, else to `output`.
    /// Must be called from within a tokio runtime.
    #[instrument(
        name = "replica_pool_start",
        skip(name, invoker, input, output),
        fields(address = %invoker.address())
    )]
    pub fn start<I>(
        name: impl Into<String>,
        invoker: I,
        worker_count: usize,
        input: Receiver<Task>,
        output: Sender<TaskResponse>,
    ) -> Self
    where
        I: Invoke + Sync + 'static,
    {
        let name = name.into();
        let address = invoker.address().to_string();
        let invoker = Arc::new(invoker);
        let metrics = Arc::new(ReplicaMetrics::new());

        let mut stops = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (stop_tx, stop_rx) = oneshot::channel();
            let worker = Worker {
                index,
                replica: name.clone(),
                invoker: Arc::clone(&invoker),
                input: input.clone(),
                output: output.clone(),
                metrics: Arc::clone(&metrics),
            };
            workers.push(tokio::spawn(worker.run(stop_rx)));
            stops.push(stop_tx);
        }

        debug!(replica = %name, address = %address, workers = worker_count, "Replica pool started");

        Self {
            name,
            address,
            stops,
            workers,
            metrics,
        }
    }

    /// Replica name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replica address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Number of workers
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<ReplicaMetrics> {
        &self.metrics
    }

    /// Deliver the stop signal to every worker without waiting
    ///
    /// Workers stop dequeuing right away; [`ReplicaPool::join`] waits for
    /// the in-flight invocations.
    pub fn signal_stop(&mut self) {
        for stop in self.stops.drain(..) {
            // Err means the worker already exited
            let _ = stop.send(());
        }
    }

    /// Wait until every worker has exited
    #[instrument(name = "replica_pool_join", skip(self), fields(replica = %self.name))]
    pub async fn join(self) {
        let worker_count = self.workers.len();
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!(replica = %self.name, error = ?e, "Worker task panicked");
            }
        }

        debug!(replica = %self.name, workers = worker_count, "Replica pool stopped");
    }

    /// Signal every worker and wait until all of them have exited
    pub async fn stop(mut self) {
        self.signal_stop();
        self.join().await;
    }
}

/// Turn an invocation result into the task's response
pub fn respond(
    address: &str,
    worker: usize,
    task: Task,
    result: Result<Invocation, InvokeError>,
    elapsed: Duration,
) -> TaskResponse {
    match result {
        Ok(invocation) => TaskResponse::success(address, worker, task, invocation, elapsed),
        Err(e) => TaskResponse::failure(address, worker, task, e, elapsed),
    }
}

struct Worker<I> {
    index: usize,
    replica: String,
    invoker: Arc<I>,
    input: Receiver<Task>,
    output: Sender<TaskResponse>,
    metrics: Arc<ReplicaMetrics>,
}

impl<I> Worker<I>
where
    I: Invoke + Sync + 'static,
{
    async fn run(self, mut stop: oneshot::Receiver<()>) {
        debug!(replica = %self.replica, worker = self.index, "Worker started");

        loop {
            tokio::select! {
                biased;

                _ = &mut stop => break,
                task = self.input.recv() => match task {
                    Ok(task) => self.handle(task).await,
                    Err(_) => {
                        debug!(replica = %self.replica, worker = self.index, "Task queue closed");
                        break;
                    }
                },
            }
        }

        debug!(replica = %self.replica, worker = self.index, "Worker done");
    }

    async fn handle(&self, mut task: Task) {
        let sink = task.response_sink.take();

        self.metrics.begin();
        let started = Instant::now();
        let result = self.invoker.invoke(task.body.clone()).await;
        let elapsed = started.elapsed();

        if let Err(ref e) = result {
            warn!(
                replica = %self.replica,
                worker = self.index,
                sequence = task.sequence,
                error = %e,
                "Invocation failed"
            );
        }

        let response = respond(self.invoker.address(), self.index, task, result, elapsed);
        let success = response.is_ok();
        self.metrics.finish(success);
        observability::record_response(&self.replica, success, elapsed.as_secs_f64() * 1000.0);

        let sequence = response.sequence();
        let delivered = match sink {
            Some(sink) => sink.send(response).await.is_ok(),
            None => self.output.send(response).await.is_ok(),
        };
        if !delivered {
            warn!(
                replica = %self.replica,
                worker = self.index,
                sequence,
                "Response receiver dropped, response lost"
            );
        }
    }
}
