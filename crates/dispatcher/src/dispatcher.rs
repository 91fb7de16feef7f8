//! Dispatcher - drains pipeline outputs into the sink

use std::sync::Arc;
use std::time::Instant;

use contracts::{DecodedMessage, MessageSink, OutcomeReporter, PipelineError};
use observability::{RunningStats, StatsSummary};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::field::Empty;
use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::error::FatalError;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::reporter::NoReporter;

/// Why the dispatch loop stopped without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cancellation was requested
    Cancelled,
    /// Both pipeline channels closed
    ChannelsClosed,
}

/// Result of a dispatch run that ended cleanly
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub reason: StopReason,
    pub metrics: MetricsSnapshot,
    pub upsert_latency_ms: StatsSummary,
}

/// Consumes decoded messages and pipeline errors, upserting in arrival order
///
/// One message is upserted at a time. The first failed upsert and the first
/// pipeline error both end the loop with a `FatalError`.
pub struct Dispatcher<K, R = NoReporter> {
    sink: K,
    reporter: R,
    decoded_rx: mpsc::Receiver<DecodedMessage>,
    error_rx: mpsc::Receiver<PipelineError>,
    metrics: Arc<DispatchMetrics>,
}

impl<K: MessageSink> Dispatcher<K> {
    pub fn new(
        sink: K,
        decoded_rx: mpsc::Receiver<DecodedMessage>,
        error_rx: mpsc::Receiver<PipelineError>,
    ) -> Self {
        Self {
            sink,
            reporter: NoReporter,
            decoded_rx,
            error_rx,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }
}

impl<K, R> Dispatcher<K, R>
where
    K: MessageSink,
    R: OutcomeReporter + Sync,
{
    /// Record delivery outcomes with `reporter`
    pub fn with_reporter<R2: OutcomeReporter + Sync>(self, reporter: R2) -> Dispatcher<K, R2> {
        Dispatcher {
            sink: self.sink,
            reporter,
            decoded_rx: self.decoded_rx,
            error_rx: self.error_rx,
            metrics: self.metrics,
        }
    }

    /// Shared metrics (readable while running)
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until cancelled, both channels close, or a fatal error occurs
    ///
    /// The sink is closed on every exit path.
    #[instrument(name = "dispatcher_run", skip_all, fields(sink = %self.sink.name()))]
    pub async fn run(mut self, cancel: CancellationToken) -> Result<DispatchSummary, FatalError> {
        info!("Dispatcher started");
        let mut latency = RunningStats::default();
        let mut decoded_open = true;
        let mut errors_open = true;

        let outcome = loop {
            if !decoded_open && !errors_open {
                break Ok(StopReason::ChannelsClosed);
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Ok(StopReason::Cancelled),

                message = self.decoded_rx.recv(), if decoded_open => match message {
                    Some(message) => {
                        if let Err(e) = self.deliver(&message, &mut latency).await {
                            break Err(e);
                        }
                    }
                    None => decoded_open = false,
                },

                failure = self.error_rx.recv(), if errors_open => match failure {
                    Some(failure) => break Err(self.on_pipeline_error(failure).await),
                    None => errors_open = false,
                },
            }
        };

        if let Err(e) = self.sink.close().await {
            warn!(error = %e, "Sink close failed");
        }

        match outcome {
            Ok(reason) => {
                let summary = DispatchSummary {
                    reason,
                    metrics: self.metrics.snapshot(),
                    upsert_latency_ms: latency.summary(),
                };
                info!(reason = ?reason, delivered = summary.metrics.delivered, "Dispatcher stopped");
                Ok(summary)
            }
            Err(fatal) => {
                error!(error = %fatal, "Dispatcher stopped on fatal error");
                Err(fatal)
            }
        }
    }

    async fn deliver(
        &mut self,
        message: &DecodedMessage,
        latency: &mut RunningStats,
    ) -> Result<(), FatalError> {
        let span = info_span!(
            "sink.upsert",
            sink = %self.sink.name(),
            key = %message.key,
            topic = %message.topic,
            otel.status_code = Empty,
            error = Empty,
        );

        async {
            let started = Instant::now();
            let result = self.sink.upsert(message).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let sink_name = self.sink.name().to_string();
            observability::record_upsert_latency_ms(&sink_name, elapsed_ms);

            match result {
                Ok(()) => {
                    latency.push(elapsed_ms);
                    self.metrics.inc_delivered();
                    observability::record_message_dispatched(&sink_name, true);
                    tracing::Span::current().record("otel.status_code", "OK");
                    info!(key = %message.key, "upserted message");

                    if let Err(e) = self.reporter.success(message).await {
                        self.metrics.inc_reporter_failures();
                        warn!(error = %e, "could not report success");
                    }
                    Ok(())
                }
                Err(e) => {
                    self.metrics.inc_failed();
                    observability::record_message_dispatched(&sink_name, false);
                    let span = tracing::Span::current();
                    span.record("otel.status_code", "ERROR");
                    span.record("error", tracing::field::display(&e));
                    error!(key = %message.key, error = %e, "error in upserting message");

                    if let Err(report_err) = self
                        .reporter
                        .failure(Some(&message.key), message.payload_str(), &e)
                        .await
                    {
                        self.metrics.inc_reporter_failures();
                        warn!(error = %report_err, "could not report failure");
                    }
                    Err(FatalError::Sink {
                        key: message.key.clone(),
                        source: e,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn on_pipeline_error(&mut self, failure: PipelineError) -> FatalError {
        self.metrics.inc_pipeline_errors();
        error!(
            key = failure.key().unwrap_or_default(),
            error = %failure.cause(),
            "error in record handler"
        );

        if let Err(e) = self
            .reporter
            .failure(failure.key(), failure.value(), failure.cause())
            .await
        {
            self.metrics.inc_reporter_failures();
            warn!(error = %e, "could not report failure");
        }
        FatalError::Pipeline(failure)
    }
}

impl<K, R> Dispatcher<K, R>
where
    K: MessageSink + 'static,
    R: OutcomeReporter + Sync + 'static,
{
    /// Spawn the dispatch loop as a task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<DispatchSummary, FatalError>> {
        tokio::spawn(self.run(cancel))
    }
}
