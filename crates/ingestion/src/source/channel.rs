//! In-process record source

use async_channel::{bounded, Receiver, Sender};
use contracts::{ContractError, RawRecord, RecordSource};
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Producer side of a [`ChannelRecordSource`]
#[derive(Debug, Clone)]
pub struct RecordSender {
    name: String,
    tx: Sender<std::result::Result<RawRecord, ContractError>>,
}

impl RecordSender {
    /// Deliver a record, waiting while the source is full
    pub async fn send(&self, record: RawRecord) -> Result<()> {
        self.tx.send(Ok(record)).await.map_err(|_| self.closed())
    }

    /// Deliver a transport-level error in place of a record
    pub async fn send_transport_error(&self, message: impl Into<String>) -> Result<()> {
        self.tx
            .send(Err(ContractError::transport(message)))
            .await
            .map_err(|_| self.closed())
    }

    /// End the stream once buffered records are drained
    pub fn close(&self) {
        self.tx.close();
    }

    /// Whether the consuming side has shut down
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn closed(&self) -> IngestionError {
        IngestionError::SourceClosed {
            name: self.name.clone(),
        }
    }
}

/// Record source backed by a bounded async channel
///
/// The stream ends when every `RecordSender` is dropped or closed.
#[derive(Debug)]
pub struct ChannelRecordSource {
    name: String,
    rx: Receiver<std::result::Result<RawRecord, ContractError>>,
}

impl ChannelRecordSource {
    /// Create a source and its sender
    pub fn new(name: impl Into<String>, capacity: usize) -> (RecordSender, Self) {
        let name = name.into();
        let (tx, rx) = bounded(capacity.max(1));
        (
            RecordSender {
                name: name.clone(),
                tx,
            },
            Self { name, rx },
        )
    }
}

impl RecordSource for ChannelRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&mut self) -> Option<std::result::Result<RawRecord, ContractError>> {
        self.rx.recv().await.ok()
    }

    fn shutdown(&mut self) {
        if self.rx.close() {
            debug!(source = %self.name, "record source closed");
        }
    }
}
