//! Command implementations.

mod dispatch;
mod invoke;
mod validate;

pub use dispatch::run_dispatch;
pub use invoke::run_invoke;
pub use validate::run_validate;
