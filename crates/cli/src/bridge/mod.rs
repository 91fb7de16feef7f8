//! Bridge orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Bridge, BridgeConfig};
pub use stats::BridgeStats;
