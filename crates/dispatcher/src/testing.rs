//! In-memory invokers for unit tests

use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{Connect, Invocation, Invoke, InvokeError};

/// Echoes the request body back, or fails every call
#[derive(Debug, Clone)]
pub struct MockInvoker {
    address: String,
    fail: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockInvoker {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            fail: false,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(address: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(address)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Invoke for MockInvoker {
    fn address(&self) -> &str {
        &self.address
    }

    async fn invoke(&self, body: Bytes) -> Result<Invocation, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(InvokeError::transport(&self.address, 6, "connection refused"));
        }
        Ok(Invocation {
            status_code: 200,
            status: "200 OK".to_string(),
            body,
            log: String::new(),
        })
    }
}

/// Hands out [`MockInvoker`]s and records every address it connected
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    connected: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl MockConnector {
    /// Every invoker handed out sleeps `delay` per call
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn connected(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }
}

impl Connect for MockConnector {
    type Invoker = MockInvoker;

    fn connect(&self, address: &str) -> MockInvoker {
        self.connected.lock().unwrap().push(address.to_string());
        MockInvoker::new(address).with_delay(self.delay)
    }
}
