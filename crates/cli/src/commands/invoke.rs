//! `invoke` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::{ClientConfig, InvokerConfig, Task};
use dispatcher::FunctionClient;

use crate::cli::InvokeArgs;
use crate::error::CliError;

/// Execute the `invoke` command
pub async fn run_invoke(args: &InvokeArgs) -> Result<()> {
    let config = ClientConfig {
        address: args.address.clone(),
        workers: 0,
        invoker: InvokerConfig {
            method: args.method.clone(),
            log_level: Some(args.log_level),
            ..Default::default()
        },
    };

    let client = FunctionClient::new(&config)
        .with_context(|| format!("Failed to create client for {}", args.address))?;

    info!(address = %args.address, method = %args.method, "Invoking function");
    let response = client.submit(Task::new(0, args.body.clone())).await?;

    if let Some(err) = response.error {
        return Err(CliError::task_failed(response.task.sequence, err.to_string()).into());
    }

    std::fs::write(&args.output, &response.body)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to write response body to {}", args.output.display()))?;

    println!("{}", String::from_utf8_lossy(&response.body));
    println!("{}", response.status);

    match invoker::response_log_lines(&response) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(e) => warn!(error = %e, "Replica returned malformed logs"),
    }

    info!(
        status = response.status_code,
        elapsed_ms = response.elapsed.as_millis() as u64,
        "Invocation complete"
    );
    Ok(())
}
