//! Bridge orchestrator - composes resolver, pipeline and dispatcher.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use contracts::{SecretStore, ServiceBlueprint};
use dispatcher::{Dispatcher, HttpOutcomeReporter, StopReason, create_sink};
use ingestion::{Pipeline, PipelineConfig, ReplayConfig, ReplayRecordSource, RuleFilter};
use observability::{BridgeSummary, record_consumer_up};
use registry::{AnySecretStore, SchemaResolver};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::BridgeStats;
use crate::error::{CliError, Result};

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// The service blueprint
    pub blueprint: ServiceBlueprint,

    /// Run timeout (None = until the source ends or a signal arrives)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Replay capture overriding `source.replay_path`
    pub replay_path: Option<PathBuf>,

    /// Replay delay overriding `source.replay_delay_ms`
    pub replay_delay_ms: Option<u64>,
}

/// How a bridge run ended
#[derive(Debug)]
pub struct BridgeOutcome {
    pub stats: BridgeStats,
    /// Set when delivery stopped on a fatal failure
    pub fatal: Option<dispatcher::FatalError>,
}

/// Main bridge orchestrator
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Run the bridge until the source ends, a fatal failure, `shutdown`
    /// resolves or the timeout elapses
    ///
    /// Startup failures (secrets, schema resolution, sink authentication,
    /// source) are returned before any task is started.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<BridgeOutcome> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;
        let topic = blueprint.consumer.topic.clone();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let secrets =
            AnySecretStore::from_config(&blueprint.secrets).map_err(|e| CliError::startup("secrets", e))?;
        info!(backend = secrets.kind(), "Secret store ready");

        let resolver = SchemaResolver::for_consumer(secrets.clone(), &blueprint.consumer);
        let descriptor = resolver
            .resolve_consumer(&blueprint.consumer)
            .await
            .map_err(|e| CliError::startup("schema resolution", e))?;

        let sink = create_sink(&blueprint.sink, &secrets, &blueprint.consumer.sink_secret_path)
            .await
            .map_err(|e| CliError::startup("sink", e))?;

        let reporter = self.build_reporter(&secrets).await?;
        let source = self.open_source()?;
        let filter = RuleFilter::from_rules(&blueprint.pipeline.filters);

        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) = Pipeline::start(
            source,
            PipelineConfig::from_blueprint(&blueprint.consumer, &blueprint.pipeline),
            descriptor,
            filter,
            &cancel,
        )
        .map_err(|e| CliError::startup("pipeline", e))?;
        record_consumer_up(&topic, true);

        let dispatcher = Dispatcher::new(sink, outputs.decoded, outputs.errors);
        let dispatch_metrics = dispatcher.metrics();
        let mut task = match reporter {
            Some(reporter) => dispatcher.with_reporter(reporter).spawn(cancel.clone()),
            None => dispatcher.spawn(cancel.clone()),
        };

        info!(topic = %topic, sink = %blueprint.sink.name, "Bridge running");

        let timeout = async {
            match self.config.timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        let joined = tokio::select! {
            joined = &mut task => Some(joined),
            _ = shutdown => {
                warn!("Received shutdown signal, stopping bridge...");
                None
            }
            _ = timeout => {
                info!("Run timeout reached, stopping bridge...");
                None
            }
        };

        cancel.cancel();
        pipeline.shutdown().await;
        let joined = match joined {
            Some(joined) => joined,
            None => task.await,
        };
        record_consumer_up(&topic, false);

        let (stop, latency, fatal) = match joined {
            Ok(Ok(summary)) => (Some(summary.reason), summary.upsert_latency_ms, None),
            Ok(Err(fatal)) => (None, Default::default(), Some(fatal)),
            Err(e) => return Err(CliError::task_failed(e.to_string())),
        };

        let records = pipeline.metrics().snapshot();
        let deliveries = dispatch_metrics.snapshot();
        let summary = BridgeSummary {
            records_received: records.records_received,
            records_filtered: records.records_filtered,
            records_decoded: records.records_decoded,
            decode_errors: records.decode_errors,
            transport_errors: records.transport_errors,
            messages_delivered: deliveries.delivered,
            messages_failed: deliveries.failed,
            upsert_latency_ms: latency,
        };

        Ok(BridgeOutcome {
            stats: BridgeStats {
                topic,
                summary,
                stop,
                reporter_failures: deliveries.reporter_failures,
                duration: start_time.elapsed(),
            },
            fatal,
        })
    }

    async fn build_reporter<S: SecretStore + Sync>(
        &self,
        secrets: &S,
    ) -> Result<Option<HttpOutcomeReporter>> {
        let blueprint = &self.config.blueprint;
        let (Some(config), Some(resource)) = (&blueprint.reporter, blueprint.reporter_resource())
        else {
            return Ok(None);
        };
        let Some(path) = blueprint.consumer.reporter_secret_path.as_deref() else {
            return Err(CliError::startup(
                "reporter",
                contracts::ContractError::config(
                    "consumer.reporter_secret_path",
                    "required when a reporter is configured",
                ),
            ));
        };

        let secret = secrets
            .get_secret(path)
            .await
            .map_err(|e| CliError::startup("reporter", e))?;
        let reporter = HttpOutcomeReporter::from_secret(&config.base_url, resource, &secret, path)
            .map_err(|e| CliError::startup("reporter", e))?;
        info!(base_url = %config.base_url, resource = %reporter.resource(), "Outcome reporter ready");
        Ok(Some(reporter))
    }

    fn open_source(&self) -> Result<ReplayRecordSource> {
        let source = &self.config.blueprint.source;
        let path = self
            .config
            .replay_path
            .clone()
            .or_else(|| source.replay_path.clone())
            .ok_or(CliError::NoRecordSource)?;
        let delay = Duration::from_millis(self.config.replay_delay_ms.unwrap_or(source.replay_delay_ms));

        ReplayRecordSource::load(&path, ReplayConfig { delay })
            .map_err(|e| CliError::startup("source", e))
    }
}

impl BridgeOutcome {
    /// Whether the run ended because every record was consumed
    pub fn drained(&self) -> bool {
        self.stats.stop == Some(StopReason::ChannelsClosed)
    }
}
