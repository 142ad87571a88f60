//! HttpInvoker - one retry-aware HTTP call per task

use bytes::Bytes;
use reqwest::{Client, Method, Response};
use tracing::{debug, instrument};

use contracts::{
    Connect, Invocation, Invoke, InvokeError, InvokerConfig, LogLevel, LOGS_HEADER,
    LOG_LEVEL_HEADER,
};

use crate::retry::RetryPolicy;

/// Shared HTTP settings; hands out one [`HttpInvoker`] per replica address
///
/// All invokers share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
    method: Method,
    log_level: Option<LogLevel>,
    policy: RetryPolicy,
    trace_attempts: bool,
}

impl HttpConnector {
    /// Create a connector from invoker configuration
    ///
    /// # Errors
    /// Invalid HTTP method or HTTP client construction failure
    pub fn new(config: &InvokerConfig) -> Result<Self, InvokeError> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| InvokeError::setup(format!("invalid method '{}': {e}", config.method)))?;

        let client = Client::builder()
            .build()
            .map_err(|e| InvokeError::setup(e.to_string()))?;

        Ok(Self {
            client,
            method,
            log_level: config.log_level,
            policy: RetryPolicy::from_config(config),
            trace_attempts: config.trace_attempts_enabled(),
        })
    }

    /// Retry policy applied by every invoker of this connector
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl Connect for HttpConnector {
    type Invoker = HttpInvoker;

    fn connect(&self, address: &str) -> HttpInvoker {
        HttpInvoker {
            address: address.to_string(),
            url: replica_url(address),
            client: self.client.clone(),
            method: self.method.clone(),
            log_level: self.log_level,
            policy: self.policy,
            trace_attempts: self.trace_attempts,
        }
    }
}

/// Replica URL: bare `host:port` gets an `http://` prefix
fn replica_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Invoker bound to a single replica address
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    address: String,
    url: String,
    client: Client,
    method: Method,
    log_level: Option<LogLevel>,
    policy: RetryPolicy,
    trace_attempts: bool,
}

/// Last failure seen while retrying
enum Failure {
    Transport(String),
    Status(u16),
}

impl HttpInvoker {
    /// Create a standalone invoker for `address`
    pub fn new(address: &str, config: &InvokerConfig) -> Result<Self, InvokeError> {
        Ok(HttpConnector::new(config)?.connect(address))
    }

    /// Full URL requests are sent to
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once(&self, body: Bytes) -> reqwest::Result<Response> {
        let mut request = self.client.request(self.method.clone(), &self.url).body(body);
        if let Some(level) = self.log_level {
            request = request.header(LOG_LEVEL_HEADER, level.as_str());
        }
        request.send().await
    }

    async fn read_response(&self, response: Response) -> Result<Invocation, InvokeError> {
        let status = response.status();
        let log = response
            .headers()
            .get(LOGS_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| InvokeError::body(&self.address, e.to_string()))?;

        let status_line = format!(
            "{} {}",
            status.as_str(),
            status.canonical_reason().unwrap_or_default()
        );

        Ok(Invocation {
            status_code: status.as_u16(),
            status: status_line.trim_end().to_string(),
            body,
            log,
        })
    }
}

impl Invoke for HttpInvoker {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(
        name = "http_invoker_invoke",
        skip(self, body),
        fields(address = %self.address, bytes = body.len())
    )]
    async fn invoke(&self, body: Bytes) -> Result<Invocation, InvokeError> {
        let attempts = self.policy.max_attempts();
        let mut last_failure = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = self.policy.backoff(attempt - 1);
                if self.trace_attempts {
                    debug!(
                        address = %self.address,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "Retrying request"
                    );
                }
                observability::record_retry(&self.address);
                tokio::time::sleep(wait).await;
            }

            match self.send_once(body.clone()).await {
                Ok(response) if RetryPolicy::is_retryable_status(response.status()) => {
                    if self.trace_attempts {
                        debug!(
                            address = %self.address,
                            attempt,
                            status = response.status().as_u16(),
                            "Server error"
                        );
                    }
                    last_failure = Some(Failure::Status(response.status().as_u16()));
                }
                Ok(response) => return self.read_response(response).await,
                Err(e) if e.is_builder() => {
                    return Err(InvokeError::request(&self.address, e.to_string()));
                }
                Err(e) => {
                    if self.trace_attempts {
                        debug!(address = %self.address, attempt, error = %e, "Request failed");
                    }
                    last_failure = Some(Failure::Transport(e.to_string()));
                }
            }
        }

        Err(match last_failure {
            Some(Failure::Status(status)) => InvokeError::ServerStatus {
                address: self.address.clone(),
                attempts,
                status,
            },
            Some(Failure::Transport(message)) => {
                InvokeError::transport(&self.address, attempts, message)
            }
            None => InvokeError::transport(&self.address, 0, "no attempt was made"),
        })
    }
}
