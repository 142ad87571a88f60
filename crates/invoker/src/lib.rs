//! # Invoker
//!
//! The Invocation Unit: one HTTP call to one replica with bounded retry.
//!
//! 负责：
//! - 构造请求 (方法、日志级别 header)
//! - 指数退避重试 (仅限传输错误与 5xx)
//! - 解析副本返回的结构化日志

pub mod http;
pub mod logs;
pub mod retry;

pub use http::{HttpConnector, HttpInvoker};
pub use logs::{format_logs, parse_logs, LogFormatError, LogRecord};
pub use retry::RetryPolicy;

use contracts::TaskResponse;

/// Format the log payload attached to a response
///
/// An empty payload yields no lines.
pub fn response_log_lines(response: &TaskResponse) -> Result<Vec<String>, LogFormatError> {
    if response.log.trim().is_empty() {
        return Ok(Vec::new());
    }
    format_logs(response.log.as_bytes())
}
