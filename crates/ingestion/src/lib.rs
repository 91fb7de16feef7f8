//! # Ingestion Pipeline
//!
//! Record ingestion module.
//!
//! Responsibilities:
//! - Pull raw records from a `RecordSource`
//! - Filter records before decode
//! - Normalize union-tagged values into plain JSON
//! - Hand decoded messages and per-record errors to the dispatcher
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{ChannelRecordSource, Pipeline, PipelineConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let (tx, source) = ChannelRecordSource::new("orders", 16);
//! let (mut handle, mut outputs) = Pipeline::start(
//!     source,
//!     PipelineConfig::new("orders"),
//!     descriptor,
//!     None,
//!     &CancellationToken::new(),
//! )?;
//!
//! while let Some(message) = outputs.decoded.recv().await {
//!     // Upsert message
//! }
//! handle.shutdown().await;
//! ```

mod config;
mod decode;
mod error;
mod filter;
pub mod normalizer;
mod pipeline;
mod source;

// Re-exports
pub use config::{MetricsSnapshot, PipelineConfig, PipelineMetrics};
pub use contracts::{DecodedMessage, PipelineError, RawRecord};
pub use decode::decode;
pub use error::{IngestionError, Result};
pub use filter::RuleFilter;
pub use normalizer::{normalize, normalize_with, UnionTag};
pub use pipeline::{Pipeline, PipelineHandle, PipelineOutputs, PEER_SERVICE};
pub use source::{ChannelRecordSource, RecordSender, ReplayConfig, ReplayRecordSource};
