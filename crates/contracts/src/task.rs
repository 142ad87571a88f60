//! Task / TaskResponse - the unit of work and its outcome

use bytes::Bytes;
use std::time::Duration;

use crate::{Invocation, InvokeError};

/// Channel an async submission uses to receive its own response
pub type ResponseSink = async_channel::Sender<TaskResponse>;

/// One unit of work for a remote replica
///
/// `retries` counts failed dispatch attempts recorded by the engine. It is
/// bumped by the worker whose invocation failed and never reset.
#[derive(Debug, Clone)]
pub struct Task {
    /// Caller-assigned sequence number
    pub sequence: i64,

    /// Raw request body, sent without any envelope
    pub body: Bytes,

    /// Failed dispatch attempts so far
    pub retries: u32,

    /// Per-task response route; overrides the pool's output queue when set
    pub response_sink: Option<ResponseSink>,
}

impl Task {
    /// Create a task without a response sink
    pub fn new(sequence: i64, body: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            body: body.into(),
            retries: 0,
            response_sink: None,
        }
    }

    /// Route this task's response to `sink`
    pub fn with_sink(mut self, sink: ResponseSink) -> Self {
        self.response_sink = Some(sink);
        self
    }
}

/// Outcome of dispatching one task to one replica
#[derive(Debug)]
pub struct TaskResponse {
    /// Address of the replica that handled the task
    pub address: String,

    /// Index of the worker that handled the task (diagnostics only)
    pub worker: usize,

    /// The task this response belongs to
    pub task: Task,

    /// Raw response body
    pub body: Bytes,

    /// HTTP status code (0 when the call failed)
    pub status_code: u16,

    /// Status line, e.g. `200 OK`
    pub status: String,

    /// Raw JSON log payload returned by the replica (may be empty)
    pub log: String,

    /// Wall time spent in the invocation, retries included
    pub elapsed: Duration,

    /// Set when the invocation failed
    pub error: Option<InvokeError>,
}

impl TaskResponse {
    /// Build a successful response from an invocation result
    pub fn success(
        address: impl Into<String>,
        worker: usize,
        task: Task,
        invocation: Invocation,
        elapsed: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            worker,
            task,
            body: invocation.body,
            status_code: invocation.status_code,
            status: invocation.status,
            log: invocation.log,
            elapsed,
            error: None,
        }
    }

    /// Build an error response; increments `task.retries`
    pub fn failure(
        address: impl Into<String>,
        worker: usize,
        mut task: Task,
        error: InvokeError,
        elapsed: Duration,
    ) -> Self {
        task.retries += 1;
        Self {
            address: address.into(),
            worker,
            task,
            body: Bytes::new(),
            status_code: 0,
            status: String::new(),
            log: String::new(),
            elapsed,
            error: Some(error),
        }
    }

    /// True when no error is attached
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Sequence of the originating task
    pub fn sequence(&self) -> i64 {
        self.task.sequence
    }
}
