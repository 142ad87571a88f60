//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DispatchConfig, SubmitPolicy};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    function: String,
    method: String,
    max_attempts: u32,
    workers_per_replica: usize,
    replica_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    function: config.function.name.clone(),
                    method: config.invoker.method.to_ascii_uppercase(),
                    max_attempts: config.invoker.max_retry.saturating_add(1),
                    workers_per_replica: config.router.workers,
                    replica_count: config.replicas.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &DispatchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.replicas.is_empty() {
        warnings.push("No replicas configured - submitted tasks will wait in the queue".to_string());
    }

    if config.invoker.max_retry == 0 {
        warnings.push("invoker.max_retry is 0 - failed calls are never retried".to_string());
    }

    if config.router.submit_policy == SubmitPolicy::Reject
        && config.router.input_capacity < config.router.workers * config.replicas.len().max(1)
    {
        warnings.push(
            "router.input_capacity is below the total worker count - submits may be rejected"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Function: {}", summary.function);
            println!("  Method: {}", summary.method);
            println!("  Attempts per task: {}", summary.max_attempts);
            println!("  Workers per replica: {}", summary.workers_per_replica);
            println!("  Replicas: {}", summary.replica_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_summary() {
        let file = write_config(
            r#"
[function]
name = "echo"

[[replicas]]
name = "echo-1"
address = "localhost:30000"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.function, "echo");
        assert_eq!(summary.max_attempts, 6);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_no_replicas_warns() {
        let file = write_config("[function]\nname = \"echo\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(result.valid);
        assert_eq!(result.warnings.unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config("[function]\nname = \"\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("function.name"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/dispatch.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
