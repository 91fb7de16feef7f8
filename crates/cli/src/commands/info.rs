//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{SecretsConfig, ServiceBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    consumer: ConsumerInfo,
    secrets: String,
    sink: SinkInfo,
    pipeline: PipelineInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reporter: Option<ReporterInfo>,
}

#[derive(Serialize)]
struct ConsumerInfo {
    system: String,
    topic: String,
    application: String,
    schema_creds_path: String,
    sink_secret_path: String,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    object: String,
    request_timeout_secs: u64,
}

#[derive(Serialize)]
struct PipelineInfo {
    union_policy: String,
    filter_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<String>,
}

#[derive(Serialize)]
struct ReporterInfo {
    base_url: String,
    resource: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn describe_secrets(secrets: &SecretsConfig) -> String {
    match secrets {
        SecretsConfig::File { path } => format!("file ({})", path.display()),
        SecretsConfig::Vault { address, mount, .. } => format!("vault ({address}, mount {mount})"),
        SecretsConfig::Memory { entries } => format!("memory ({} paths)", entries.len()),
    }
}

fn build_config_info(blueprint: &ServiceBlueprint, args: &InfoArgs) -> ConfigInfo {
    let filters = if args.filters {
        blueprint
            .pipeline
            .filters
            .iter()
            .map(|rule| format!("{:?}", rule))
            .collect()
    } else {
        Vec::new()
    };

    let reporter = blueprint.reporter.as_ref().map(|reporter| ReporterInfo {
        base_url: reporter.base_url.clone(),
        resource: blueprint.reporter_resource().unwrap_or_default(),
    });

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        consumer: ConsumerInfo {
            system: blueprint.consumer.system.clone(),
            topic: blueprint.consumer.topic.clone(),
            application: blueprint.consumer.application.clone(),
            schema_creds_path: blueprint.consumer.credentials_path(),
            sink_secret_path: blueprint.consumer.sink_secret_path.clone(),
        },
        secrets: describe_secrets(&blueprint.secrets),
        sink: SinkInfo {
            name: blueprint.sink.name.clone(),
            sink_type: format!("{:?}", blueprint.sink.sink_type),
            object: blueprint.sink.object.clone(),
            request_timeout_secs: blueprint.sink.request_timeout_secs,
        },
        pipeline: PipelineInfo {
            union_policy: format!("{:?}", blueprint.pipeline.union_policy),
            filter_count: blueprint.pipeline.filters.len(),
            filters,
        },
        replay_path: blueprint
            .source
            .replay_path
            .as_ref()
            .map(|p| p.display().to_string()),
        reporter,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Record Bridge Configuration ===\n");
    println!("Version: {}", info.version);

    println!("\nConsumer:");
    println!("  System: {}", info.consumer.system);
    println!("  Topic: {}", info.consumer.topic);
    println!("  Application: {}", info.consumer.application);
    println!("  Registry credentials: {}", info.consumer.schema_creds_path);
    println!("  Sink secret: {}", info.consumer.sink_secret_path);

    println!("\nSecrets: {}", info.secrets);

    println!("\nSink:");
    println!("  Name: {}", info.sink.name);
    println!("  Type: {}", info.sink.sink_type);
    println!("  Object: {}", info.sink.object);
    println!("  Request timeout: {}s", info.sink.request_timeout_secs);

    println!("\nPipeline:");
    println!("  Union policy: {}", info.pipeline.union_policy);
    println!("  Filters: {}", info.pipeline.filter_count);
    for filter in &info.pipeline.filters {
        println!("    - {}", filter);
    }

    if let Some(ref path) = info.replay_path {
        println!("\nReplay: {}", path);
    }
    if let Some(ref reporter) = info.reporter {
        println!("\nReporter: {} (resource {})", reporter.base_url, reporter.resource);
    }
    println!();
}
