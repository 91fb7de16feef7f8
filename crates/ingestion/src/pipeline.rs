//! Pipeline - the consume loop
//!
//! Pulls raw records one at a time, filters, decodes and hands each result to
//! exactly one of two single-item channels. Every handoff waits until the
//! dispatcher has taken the value, so at most one record is in flight across
//! both channels and a failure is seen before any later record.

use std::sync::Arc;

use contracts::{
    ContractError, DecodedMessage, EncodingDescriptor, MessageFilter, PipelineError, RawRecord,
    RecordSource,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, field, info, info_span, instrument, warn, Instrument, Span};

use crate::config::{PipelineConfig, PipelineMetrics};
use crate::decode::decode;

/// Peer service recorded on consume/receive spans
pub const PEER_SERVICE: &str = "KAFKA";

/// Handoff channel capacity
const HANDOFF_CAPACITY: usize = 1;

/// Receiving ends of the pipeline's channels
///
/// Both channels close once the consume loop has returned.
#[derive(Debug)]
pub struct PipelineOutputs {
    /// Successfully decoded messages, in stream order
    pub decoded: mpsc::Receiver<DecodedMessage>,

    /// Per-record decode failures
    pub errors: mpsc::Receiver<PipelineError>,
}

/// Handle to a running pipeline
///
/// Dropping the handle cancels the loop without waiting for it.
pub struct PipelineHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    metrics: Arc<PipelineMetrics>,
}

impl PipelineHandle {
    /// Signal shutdown and wait until the loop has stopped
    ///
    /// On return both channels are closed and the source has been shut down.
    /// Calling it again is a no-op.
    #[instrument(name = "pipeline_shutdown", skip(self))]
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "consume loop terminated abnormally");
            }
        }
    }

    /// Whether the consume loop has returned
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Cancellation token of this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Consumer pipeline
pub struct Pipeline;

impl Pipeline {
    /// Start the consume loop
    ///
    /// The loop runs as its own task, cancelled by `parent` or by the returned
    /// handle. `filter = None` keeps every record.
    ///
    /// # Errors
    /// `ContractError::Config` when the configuration is unusable or no tokio
    /// runtime is available.
    #[instrument(
        name = "pipeline_start",
        skip(source, config, descriptor, filter, parent),
        fields(topic = %config.topic, kind = %descriptor.kind(), filtered = filter.is_some())
    )]
    pub fn start<S>(
        source: S,
        config: PipelineConfig,
        descriptor: EncodingDescriptor,
        filter: Option<Arc<dyn MessageFilter>>,
        parent: &CancellationToken,
    ) -> Result<(PipelineHandle, PipelineOutputs), ContractError>
    where
        S: RecordSource + Send + 'static,
    {
        if config.topic.trim().is_empty() {
            return Err(ContractError::config("topic", "must not be empty"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ContractError::config("runtime", e.to_string()))?;

        let (decoded_tx, decoded_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let cancel = parent.child_token();
        let metrics = Arc::new(PipelineMetrics::new());

        if !descriptor.kind().is_supported() {
            warn!(
                kind = %descriptor.kind(),
                "encoding kind is not decodable, every record will be reported as unexpected data"
            );
        }

        let consume = ConsumeLoop {
            source,
            config,
            descriptor,
            filter,
            decoded_tx,
            error_tx,
            cancel: cancel.clone(),
            metrics: metrics.clone(),
        };
        let task = runtime.spawn(consume.run());

        Ok((
            PipelineHandle {
                cancel,
                task: Some(task),
                metrics,
            },
            PipelineOutputs {
                decoded: decoded_rx,
                errors: error_rx,
            },
        ))
    }
}

/// State owned by the consume task
///
/// The channel senders live here, so both channels close exactly once, when
/// the task returns.
struct ConsumeLoop<S> {
    source: S,
    config: PipelineConfig,
    descriptor: EncodingDescriptor,
    filter: Option<Arc<dyn MessageFilter>>,
    decoded_tx: mpsc::Sender<DecodedMessage>,
    error_tx: mpsc::Sender<PipelineError>,
    cancel: CancellationToken,
    metrics: Arc<PipelineMetrics>,
}

impl<S: RecordSource> ConsumeLoop<S> {
    async fn run(mut self) {
        let span = info_span!(
            "kafka.consume",
            peer.service = PEER_SERVICE,
            topic = %self.config.topic,
            otel.scope.name = %self.config.instrumentation_name,
            source = %self.source.name(),
        );

        self.consume().instrument(span).await;
        self.source.shutdown();
    }

    async fn consume(&mut self) {
        info!("kafka consumer started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("kafka consumer shutting down");
                    return;
                }
                next = self.source.recv() => next,
            };

            match next {
                None => {
                    info!("record stream ended");
                    return;
                }
                Some(Err(e)) => {
                    self.metrics.record_transport_error();
                    observability::record_transport_error(&self.config.topic);
                    error!(error = %e, "kafka consumer error");
                }
                Some(Ok(record)) => {
                    if !self.receive(record).await {
                        return;
                    }
                }
            }
        }
    }

    /// Handle one record; `false` stops the loop
    async fn receive(&mut self, record: RawRecord) -> bool {
        let key = record.key_str().into_owned();
        let span = info_span!(
            "kafka.receive",
            peer.service = PEER_SERVICE,
            key = %key,
            partition = field::Empty,
            offset = field::Empty,
            outcome = field::Empty,
            otel.status_code = field::Empty,
            error = field::Empty,
        );
        if let (Some(partition), Some(offset)) = (record.partition, record.offset) {
            span.record("partition", partition);
            span.record("offset", offset);
        }

        self.process(key, record).instrument(span).await
    }

    async fn process(&mut self, key: String, record: RawRecord) -> bool {
        let span = Span::current();
        let topic = self.config.topic.as_str();

        self.metrics.record_received();
        observability::record_record_received(topic);
        info!(key = %key, topic = %topic, "received a message");

        if let Some(filter) = &self.filter {
            if !filter.keep(&record) {
                self.metrics.record_filtered();
                observability::record_record_filtered(topic);
                span.record("outcome", "filtered");
                debug!(key = %key, "message filtered");
                return true;
            }
        }

        match decode(
            &record,
            &self.descriptor,
            topic,
            self.config.union_policy,
        ) {
            Ok(message) => {
                if !handoff(&self.decoded_tx, &self.cancel, message, "decoded").await {
                    return false;
                }
                self.metrics.record_decoded();
                span.record("outcome", "decoded");
                span.record("otel.status_code", "OK");
                info!(key = %key, topic = %topic, "message decoded");
                true
            }
            Err(cause) => {
                self.metrics.record_decode_error();
                observability::record_decode_error(topic, &cause);
                span.record("outcome", "error");
                span.record("otel.status_code", "ERROR");
                span.record("error", field::display(&cause));
                error!(key = %key, topic = %topic, error = %cause, "unable to consume message");

                let failure = PipelineError::new(cause)
                    .with_key(key)
                    .with_value(record.value.to_string());
                handoff(&self.error_tx, &self.cancel, failure, "error").await
            }
        }
    }
}

/// Hand one value over and wait until the receiver has taken it
///
/// Capacity 1 means a permit is only free again once the value was received,
/// so waiting for `reserve` turns the send into a rendezvous. `false` when
/// cancelled or the receiver is gone.
async fn handoff<T>(
    tx: &mpsc::Sender<T>,
    cancel: &CancellationToken,
    value: T,
    channel: &'static str,
) -> bool {
    let taken = async {
        tx.send(value).await.map_err(|_| ())?;
        tx.reserve().await.map(drop).map_err(|_| ())
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        taken = taken => match taken {
            Ok(()) => true,
            Err(()) => {
                warn!(channel, "handoff channel has no receiver, stopping");
                false
            }
        },
    }
}
