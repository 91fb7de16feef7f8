//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{SinkType, ServiceBlueprint};
use serde::Serialize;
use tracing::info;

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
    topic: String,
    sink: String,
    filter_count: usize,
    reporter: bool,
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
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
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
                    version: format!("{:?}", blueprint.version),
                    topic: blueprint.consumer.topic.clone(),
                    sink: format!("{} ({:?})", blueprint.sink.name, blueprint.sink.sink_type),
                    filter_count: blueprint.pipeline.filters.len(),
                    reporter: blueprint.reporter.is_some(),
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
fn collect_warnings(blueprint: &ServiceBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sink.sink_type == SinkType::Log {
        warnings.push("Sink type is 'log' - messages will be logged, not delivered".to_string());
    }

    if blueprint.source.replay_path.is_none() {
        warnings.push("source.replay_path is not set - `run` requires --replay".to_string());
    }

    if blueprint.sink.request_timeout_secs == 0 {
        warnings.push("sink.request_timeout_secs is 0 - upserts may block indefinitely".to_string());
    }

    if blueprint.consumer.reporter_secret_path.is_some() && blueprint.reporter.is_none() {
        warnings.push(
            "consumer.reporter_secret_path is set but no [reporter] section exists".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Topic: {}", summary.topic);
            println!("  Sink: {}", summary.sink);
            println!("  Filters: {}", summary.filter_count);
            println!("  Reporter: {}", if summary.reporter { "yes" } else { "no" });
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
