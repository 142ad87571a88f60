//! DispatchConfig - Config Loader 输出
//!
//! 描述一个逻辑函数的完整分发配置：调用参数、路由器、静态副本列表。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{LogLevel, Topology};

/// 默认 HTTP 方法
pub const DEFAULT_METHOD: &str = "PUT";

/// 默认最大重试次数（不含首次调用）
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// 默认最小退避时间 (毫秒)
pub const DEFAULT_RETRY_MIN_BACKOFF_MS: u64 = 50;

/// 最大退避 = 最小退避 × 该系数
pub const MAX_BACKOFF_FACTOR: u64 = 20;

/// 任务队列 / 响应队列默认容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的分发配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 目标逻辑函数
    #[validate(nested)]
    pub function: FunctionConfig,

    /// 调用参数
    #[serde(default)]
    #[validate(nested)]
    pub invoker: InvokerConfig,

    /// 路由器参数
    #[serde(default)]
    #[validate(nested)]
    pub router: RouterConfig,

    /// 静态副本列表 (初始拓扑)
    #[serde(default)]
    #[validate(nested)]
    pub replicas: Vec<ReplicaConfig>,
}

impl DispatchConfig {
    /// 静态副本列表转换为拓扑快照
    pub fn topology(&self) -> Topology {
        self.replicas
            .iter()
            .map(|r| (r.name.clone(), r.address.clone()))
            .collect()
    }
}

/// 逻辑函数标识
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FunctionConfig {
    /// 函数名称
    #[validate(length(min = 1, message = "function name cannot be empty"))]
    pub name: String,
}

/// 单次调用 (Invocation Unit) 配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvokerConfig {
    /// HTTP 方法
    #[serde(default = "default_method")]
    #[validate(length(min = 1, message = "method cannot be empty"))]
    pub method: String,

    /// 发送给副本的日志级别 (可选)
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// 最大重试次数
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,

    /// 最小退避时间 (毫秒)，必须 >= 1
    #[serde(default = "default_retry_min_backoff_ms")]
    #[validate(range(min = 1, message = "retry_min_backoff_ms must be >= 1"))]
    pub retry_min_backoff_ms: u64,

    /// 是否记录每次尝试的 debug 日志 (默认跟随 log_level == debug)
    #[serde(default)]
    pub trace_attempts: Option<bool>,
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn default_max_retry() -> u32 {
    DEFAULT_MAX_RETRY
}

fn default_retry_min_backoff_ms() -> u64 {
    DEFAULT_RETRY_MIN_BACKOFF_MS
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            log_level: None,
            max_retry: DEFAULT_MAX_RETRY,
            retry_min_backoff_ms: DEFAULT_RETRY_MIN_BACKOFF_MS,
            trace_attempts: None,
        }
    }
}

impl InvokerConfig {
    /// 最大退避时间 (毫秒)
    pub fn retry_max_backoff_ms(&self) -> u64 {
        self.retry_min_backoff_ms.saturating_mul(MAX_BACKOFF_FACTOR)
    }

    /// 实际生效的逐次尝试日志开关
    pub fn trace_attempts_enabled(&self) -> bool {
        self.trace_attempts
            .unwrap_or(self.log_level == Some(LogLevel::Debug))
    }
}

/// 队列满时的提交策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// 等待队列空出
    #[default]
    Block,
    /// 立即返回 QueueFull
    Reject,
}

/// 路由器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouterConfig {
    /// 每个副本的 worker 数
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, message = "workers must be >= 1"))]
    pub workers: usize,

    /// 共享任务队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "input_capacity must be >= 1"))]
    pub input_capacity: usize,

    /// 共享响应队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "output_capacity must be >= 1"))]
    pub output_capacity: usize,

    /// 提交策略
    #[serde(default)]
    pub submit_policy: SubmitPolicy,
}

fn default_workers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            input_capacity: DEFAULT_QUEUE_CAPACITY,
            output_capacity: DEFAULT_QUEUE_CAPACITY,
            submit_policy: SubmitPolicy::Block,
        }
    }
}

/// 静态副本
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplicaConfig {
    /// 副本名称 (唯一)
    #[validate(length(min = 1, message = "replica name cannot be empty"))]
    pub name: String,

    /// 副本地址 (host:port 或完整 URL)
    #[validate(length(min = 1, message = "replica address cannot be empty"))]
    pub address: String,
}

/// 点对点客户端配置
///
/// `workers == 0` 为同步模式，`workers > 0` 为异步模式。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// 目标地址
    pub address: String,

    /// worker 数
    #[serde(default)]
    pub workers: usize,

    /// 调用参数
    #[serde(default)]
    pub invoker: InvokerConfig,
}
