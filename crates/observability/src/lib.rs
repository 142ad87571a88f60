//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，输出到 stderr)
//! - Prometheus 指标导出
//! - 分发指标记录与响应统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_logging, DispatchStats, LogConfig, LogFormat};
//!
//! init_logging(&LogConfig::from_verbosity(1, false, LogFormat::Compact))?;
//!
//! let mut stats = DispatchStats::new();
//! while let Ok(resp) = router.responses().recv().await {
//!     stats.update(&resp);
//! }
//! println!("{}", stats.summary());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_queue_depth, record_replica_count, record_response, record_retry,
    record_task_submitted, DispatchStats, DispatchSummary, RunningStats, StatsSummary,
};

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// 日志格式
    pub format: LogFormat,
    /// 默认日志级别 (EnvFilter 指令)
    pub level: String,
    /// 是否允许 RUST_LOG 覆盖默认级别
    pub env_override: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            env_override: true,
        }
    }
}

impl LogConfig {
    /// 由命令行的 `-v` 次数与 `-q` 推导配置
    ///
    /// `quiet` 固定为 warn，且不受 RUST_LOG 影响。
    pub fn from_verbosity(verbose: u8, quiet: bool, format: LogFormat) -> Self {
        if quiet {
            return Self {
                format,
                level: "warn".to_string(),
                env_override: false,
            };
        }

        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            format,
            level: level.to_string(),
            env_override: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.env_override {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
        } else {
            EnvFilter::new(&self.level)
        }
    }
}

/// 初始化 Tracing 订阅器
///
/// 日志写入 stderr，stdout 留给命令输出。
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(format = ?config.format, level = %config.level, "Logging initialized");
    Ok(())
}

/// 安装 Prometheus 导出器
///
/// Tracing 需已由 [`init_logging`] 初始化。
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
