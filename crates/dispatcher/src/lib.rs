//! # Dispatcher
//!
//! 副本分发模块。
//!
//! 负责：
//! - 为每个副本维护固定数量的 worker (`ReplicaPool`)
//! - 所有副本共享同一个任务队列与响应队列 (`Router`)
//! - 根据拓扑快照增删副本
//! - 点对点客户端 (`FunctionClient`)

pub mod client;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod router;
pub mod topology;

#[cfg(test)]
pub(crate) mod testing;

pub use client::FunctionClient;
pub use contracts::{Task, TaskResponse};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, ReplicaMetrics};
pub use pool::{respond, ReplicaPool};
pub use router::{create_router, Router};
pub use topology::{TopologyChange, TopologyReducer};
