//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge: the record
//! data model, the collaborator traits (stream source, secret store, sink,
//! outcome reporter, filter) and the error taxonomy.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data flow
//! `RawRecord` (stream) -> `DecodedMessage` (pipeline) -> `MessageSink` (dispatcher)

mod blueprint;
mod encoding;
mod error;
mod filter;
mod record;
mod secrets;
mod sink;
mod source;

pub use blueprint::*;
pub use encoding::{EncodingDescriptor, EncodingKind};
pub use error::{ContractError, PipelineError};
pub use filter::MessageFilter;
pub use record::{DecodedMessage, RawRecord};
pub use secrets::{require_str, LocalSecretStore, SecretMap, SecretStore};
pub use sink::{LocalMessageSink, LocalOutcomeReporter, MessageSink, OutcomeReporter};
pub use source::{LocalRecordSource, RecordSource};
