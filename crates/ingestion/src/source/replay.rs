//! Replay source - replays a captured stream from a JSONL file
//!
//! One record per line:
//!
//! ```text
//! {"key": "42", "value": {"name": {"string": "Alice"}}, "partition": 0, "offset": 17}
//! {"error": "broker connection reset"}
//! ```
//!
//! A line with `error` yields a transport error in place of a record.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{ContractError, RawRecord, RecordSource};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{IngestionError, Result};

/// Replay configuration
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Delay between records (zero = as fast as the pipeline drains)
    pub delay: Duration,
}

/// One captured line
#[derive(Debug, Deserialize)]
struct ReplayLine {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    partition: Option<i32>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    error: Option<String>,
}

impl ReplayLine {
    fn into_delivery(self) -> std::result::Result<RawRecord, ContractError> {
        if let Some(message) = self.error {
            return Err(ContractError::transport(message));
        }
        let mut record = RawRecord::new(self.key.unwrap_or_default(), self.value);
        record.partition = self.partition;
        record.offset = self.offset;
        Ok(record)
    }
}

/// Replays records loaded from a JSONL capture
pub struct ReplayRecordSource {
    name: String,
    path: PathBuf,
    pending: VecDeque<std::result::Result<RawRecord, ContractError>>,
    config: ReplayConfig,
    delivered: usize,
    stopped: bool,
}

impl ReplayRecordSource {
    /// Load every line of the capture
    pub fn load(path: &Path, config: ReplayConfig) -> Result<Self> {
        let file = File::open(path).map_err(|source| IngestionError::ReplayIo {
            path: path.to_path_buf(),
            source,
        })?;

        let mut pending = VecDeque::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| IngestionError::ReplayIo {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let parsed: ReplayLine =
                serde_json::from_str(&line).map_err(|e| IngestionError::ReplayRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;

            if parsed.error.is_none() && parsed.key.is_none() {
                return Err(IngestionError::ReplayRecord {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    message: "record line requires a 'key'".to_string(),
                });
            }
            pending.push_back(parsed.into_delivery());
        }

        info!(path = %path.display(), records = pending.len(), "Replay capture loaded");

        Ok(Self {
            name: format!("replay:{}", path.display()),
            path: path.to_path_buf(),
            pending,
            config,
            delivered: 0,
            stopped: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records not yet delivered
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl RecordSource for ReplayRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&mut self) -> Option<std::result::Result<RawRecord, ContractError>> {
        if self.stopped {
            return None;
        }
        if self.delivered > 0 && !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
        let next = self.pending.pop_front()?;
        self.delivered += 1;
        Some(next)
    }

    fn shutdown(&mut self) {
        if !self.stopped {
            self.stopped = true;
            debug!(
                source = %self.name,
                delivered = self.delivered,
                remaining = self.pending.len(),
                "replay stopped"
            );
        }
    }
}
