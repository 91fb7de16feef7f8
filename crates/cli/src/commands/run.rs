//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::bridge::{Bridge, BridgeConfig};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref topic) = args.topic {
        info!(topic = %topic, "Overriding topic from CLI");
        blueprint.consumer.topic = topic.clone();
    }

    info!(
        system = %blueprint.consumer.system,
        topic = %blueprint.consumer.topic,
        application = %blueprint.consumer.application,
        sink = %blueprint.sink.name,
        filters = blueprint.pipeline.filters.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let bridge = Bridge::new(BridgeConfig {
        blueprint,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        replay_path: args.replay.clone(),
        replay_delay_ms: args.replay_delay_ms,
    });

    info!("Starting bridge...");
    let outcome = bridge.run(shutdown_signal()).await?;
    outcome.stats.print_summary();

    if let Some(fatal) = outcome.fatal {
        error!(key = ?fatal.key(), error = %fatal, "Bridge stopped on fatal failure");
        return Err(CliError::from(fatal).into());
    }

    if outcome.drained() {
        info!(
            delivered = outcome.stats.summary.messages_delivered,
            "Source drained, bridge finished"
        );
    } else {
        warn!(
            delivered = outcome.stats.summary.messages_delivered,
            "Bridge stopped before the source was drained"
        );
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::ServiceBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Consumer:");
    println!("  System: {}", blueprint.consumer.system);
    println!("  Topic: {}", blueprint.consumer.topic);
    println!("  Application: {}", blueprint.consumer.application);
    println!("\nSink:");
    println!("  {} ({:?})", blueprint.sink.name, blueprint.sink.sink_type);
    println!("  Object: {}", blueprint.sink.object);
    println!("\nPipeline:");
    println!("  Union policy: {:?}", blueprint.pipeline.union_policy);
    println!("  Filters: {}", blueprint.pipeline.filters.len());
    if let Some(resource) = blueprint.reporter_resource() {
        println!("\nReporter resource: {}", resource);
    }
    println!();
}
