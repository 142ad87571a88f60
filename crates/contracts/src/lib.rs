//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Dispatch Model
//! - A [`Task`] is an opaque body plus a caller-chosen `sequence`
//! - Every replica of one logical function is interchangeable, so all workers
//!   of all replicas pull from one shared task queue
//! - Each dispatched task yields exactly one [`TaskResponse`]

mod config;
mod error;
mod invoke;
mod log_level;
mod task;
mod topology;

pub use config::*;
pub use error::*;
pub use invoke::*;
pub use log_level::LogLevel;
pub use task::*;
pub use topology::*;

/// Request header carrying the per-call log verbosity hint
pub const LOG_LEVEL_HEADER: &str = "x-nuclio-log-level";

/// Response header carrying the replica's JSON log records
pub const LOGS_HEADER: &str = "X-Nuclio-Logs";
