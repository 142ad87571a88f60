//! # fndispatch CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 单地址调用 (`invoke`)
//! - 基于配置的多副本分发 (`dispatch`)
//! - 配置校验 (`validate`)

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_dispatch, run_invoke, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_logging(&cli.log_config())?;

    info!(version = env!("CARGO_PKG_VERSION"), "fndispatch starting");

    let result = match &cli.command {
        Commands::Invoke(args) => run_invoke(args).await,
        Commands::Dispatch(args) => run_dispatch(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
