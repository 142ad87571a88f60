//! Invoke / Connect traits - the Invocation Unit interface
//!
//! Workers only see these traits, so pools and routers can run against any
//! transport (HTTP in production, in-memory mocks in tests).

use bytes::Bytes;

use crate::InvokeError;

/// Successful result of one call to a replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Status code
    pub status_code: u16,
    /// Status line, e.g. `200 OK`
    pub status: String,
    /// Full response body
    pub body: Bytes,
    /// Structured log payload from the replica (may be empty)
    pub log: String,
}

/// Performs calls against one replica address
///
/// Implementations own their retry policy; an `Err` means the retry budget
/// is exhausted.
#[trait_variant::make(Invoke: Send)]
pub trait LocalInvoke {
    /// Replica address this invoker is bound to
    fn address(&self) -> &str;

    /// Send `body` to the replica
    ///
    /// # Errors
    /// Returns the final transport failure after retries
    async fn invoke(&self, body: Bytes) -> Result<Invocation, InvokeError>;
}

/// Builds invokers for replica addresses
///
/// The router calls this once per new replica.
pub trait Connect: Send + Sync + 'static {
    /// Invoker type produced for each replica
    type Invoker: Invoke + Sync + 'static;

    /// Bind an invoker to `address`
    fn connect(&self, address: &str) -> Self::Invoker;
}
