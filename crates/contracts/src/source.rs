//! RecordSource trait - raw stream abstraction
//!
//! The wire-level stream client is an external collaborator. The pipeline only
//! sees an ordered sequence of raw records plus a shutdown operation.

use crate::{ContractError, RawRecord};

/// Ordered source of raw records
///
/// # Example
///
/// ```ignore
/// while let Some(next) = source.recv().await {
///     match next {
///         Ok(record) => handle(record),
///         Err(e) => warn!(error = %e, "transport error"),
///     }
/// }
/// source.shutdown();
/// ```
#[trait_variant::make(RecordSource: Send)]
pub trait LocalRecordSource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Receive the next record
    ///
    /// `None` means the stream has ended. `Some(Err(_))` carries a
    /// transport-level error for a single delivery; the stream may continue.
    async fn recv(&mut self) -> Option<Result<RawRecord, ContractError>>;

    /// Release the underlying connection
    ///
    /// Called once after the consume loop has stopped. Must be idempotent.
    fn shutdown(&mut self);
}
