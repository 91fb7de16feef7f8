//! MessageSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for sinks and outcome reporters.

use crate::{ContractError, DecodedMessage};

/// Downstream upsert target
///
/// All sink implementations must implement this trait.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Upsert one decoded message
    ///
    /// # Errors
    /// `ContractError::Api` for a non-2xx response, other variants for transport failures
    async fn upsert(&mut self, message: &DecodedMessage) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Side channel recording delivery outcomes in an external quality log
#[trait_variant::make(OutcomeReporter: Send)]
pub trait LocalOutcomeReporter {
    /// Record a delivered message
    async fn success(&self, message: &DecodedMessage) -> Result<(), ContractError>;

    /// Record a failed delivery or a record that could not be decoded
    async fn failure(
        &self,
        key: Option<&str>,
        payload: Option<&str>,
        error: &ContractError,
    ) -> Result<(), ContractError>;
}
