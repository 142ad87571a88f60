//! FunctionClient - point-to-point client bound to one replica address
//!
//! `workers == 0` gives a synchronous client that calls the invoker inline.
//! `workers > 0` gives an asynchronous client backed by a dedicated
//! single-replica pool; responses are drained from [`FunctionClient::responses`].

use async_channel::{Receiver, Sender};
use std::time::Instant;
use tracing::{debug, instrument};

use contracts::{ClientConfig, Invoke, Task, TaskResponse, DEFAULT_QUEUE_CAPACITY};
use invoker::HttpInvoker;

use crate::error::DispatcherError;
use crate::pool::{respond, ReplicaPool};

enum Mode<I> {
    Sync(I),
    Async {
        address: String,
        pool: ReplicaPool,
        input: Sender<Task>,
        sink: Sender<TaskResponse>,
        responses: Receiver<TaskResponse>,
    },
}

/// Client for one replica address
pub struct FunctionClient<I = HttpInvoker> {
    mode: Mode<I>,
}

impl FunctionClient<HttpInvoker> {
    /// Create an HTTP client from configuration
    ///
    /// Async mode must be created inside a tokio runtime.
    pub fn new(config: &ClientConfig) -> Result<Self, DispatcherError> {
        let invoker = HttpInvoker::new(&config.address, &config.invoker)?;
        Ok(Self::with_invoker(invoker, config.workers))
    }
}

impl<I> FunctionClient<I>
where
    I: Invoke + Sync + 'static,
{
    /// Wrap an existing invoker
    pub fn with_invoker(invoker: I, workers: usize) -> Self {
        if workers == 0 {
            debug!(address = %invoker.address(), "Sync client created");
            return Self {
                mode: Mode::Sync(invoker),
            };
        }

        let address = invoker.address().to_string();
        let (input, input_rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let (sink, responses) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let pool = ReplicaPool::start(
            address.clone(),
            invoker,
            workers,
            input_rx,
            sink.clone(),
        );
        debug!(address = %address, workers, "Async client created");

        Self {
            mode: Mode::Async {
                address,
                pool,
                input,
                sink,
                responses,
            },
        }
    }

    /// Whether this client dispatches through a worker pool
    pub fn is_async(&self) -> bool {
        matches!(self.mode, Mode::Async { .. })
    }

    /// Replica address
    pub fn address(&self) -> &str {
        match &self.mode {
            Mode::Sync(invoker) => invoker.address(),
            Mode::Async { address, .. } => address,
        }
    }

    /// Invoke the replica and wait for the response
    ///
    /// # Errors
    /// [`DispatcherError::Configuration`] on an async client. Invocation
    /// failures come back inside the response.
    #[instrument(name = "client_submit", skip(self, task), fields(sequence = task.sequence))]
    pub async fn submit(&self, task: Task) -> Result<TaskResponse, DispatcherError> {
        let Mode::Sync(invoker) = &self.mode else {
            return Err(DispatcherError::configuration(
                "submit called on an async client, use submit_async",
            ));
        };

        let started = Instant::now();
        let result = invoker.invoke(task.body.clone()).await;
        let elapsed = started.elapsed();

        let response = respond(invoker.address(), 0, task, result, elapsed);
        observability::record_response(
            invoker.address(),
            response.is_ok(),
            elapsed.as_secs_f64() * 1000.0,
        );
        Ok(response)
    }

    /// Queue a task for the client's pool; the response arrives on
    /// [`FunctionClient::responses`]
    ///
    /// # Errors
    /// [`DispatcherError::Configuration`] on a sync client,
    /// [`DispatcherError::QueueClosed`] once the client is closed.
    pub async fn submit_async(&self, task: Task) -> Result<(), DispatcherError> {
        let Mode::Async { input, sink, .. } = &self.mode else {
            return Err(DispatcherError::configuration(
                "submit_async called on a sync client, use submit",
            ));
        };

        input
            .send(task.with_sink(sink.clone()))
            .await
            .map_err(|_| DispatcherError::QueueClosed)
    }

    /// Response queue of an async client
    pub fn responses(&self) -> Option<&Receiver<TaskResponse>> {
        match &self.mode {
            Mode::Async { responses, .. } => Some(responses),
            Mode::Sync(_) => None,
        }
    }

    /// Stop the pool of an async client; a sync client has nothing to stop
    pub async fn close(self) {
        if let Mode::Async { pool, input, .. } = self.mode {
            input.close();
            pool.stop().await;
        }
    }
}
