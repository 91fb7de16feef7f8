//! # Dispatcher
//!
//! Delivery module.
//!
//! Responsibilities:
//! - Drain decoded messages and pipeline errors
//! - Upsert each message into the configured sink, strictly in order
//! - Report delivery outcomes to the optional quality log
//! - Stop on the first fatal failure so the process can be restarted

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod oauth;
pub mod reporter;
pub mod sinks;

pub use dispatcher::{DispatchSummary, Dispatcher, StopReason};
pub use error::{DispatcherError, FatalError};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use oauth::{ClientCredentials, TokenSource};
pub use reporter::{HttpOutcomeReporter, NoReporter};
pub use sinks::{AnySink, LogSink, RestSink, RestSinkConfig, create_sink};
