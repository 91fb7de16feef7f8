//! Raw record sources
//!
//! - `ChannelRecordSource`: fed in-process through a `RecordSender`
//! - `ReplayRecordSource`: replays a JSONL capture

mod channel;
mod replay;

pub use channel::{ChannelRecordSource, RecordSender};
pub use replay::{ReplayConfig, ReplayRecordSource};
