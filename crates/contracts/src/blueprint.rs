//! ServiceBlueprint - Config Loader output
//!
//! Describes one consumer: topic and secret paths, secret store, sink, pipeline
//! policy (filters, union unwrapping), record source and optional outcome reporter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Consumer identity and secret paths
    pub consumer: ConsumerConfig,

    /// Secret store backend
    pub secrets: SecretsConfig,

    /// Downstream sink
    pub sink: SinkConfig,

    /// Decode policy and filters
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Raw record source
    #[serde(default)]
    pub source: SourceConfig,

    /// Optional quality-log reporter
    #[serde(default)]
    pub reporter: Option<ReporterConfig>,
}

/// Consumer identity and secret locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Owning system identifier
    pub system: String,

    /// Topic to consume; also the registry subject
    pub topic: String,

    /// Application id (consumer group)
    pub application: String,

    /// Secret path holding the registry endpoint (`schema-registry-url`)
    pub schema_info_path: String,

    /// Secret path holding registry credentials; `{system}` is substituted
    pub schema_creds_path: String,

    /// Secret path holding the sink connection config
    pub sink_secret_path: String,

    /// Secret path holding the reporter credentials
    #[serde(default)]
    pub reporter_secret_path: Option<String>,

    /// Instrumentation scope recorded on pipeline spans
    #[serde(default = "default_instrumentation_name")]
    pub trace_instrumentation_name: String,
}

fn default_instrumentation_name() -> String {
    "record-bridge".to_string()
}

impl ConsumerConfig {
    /// Credential path with the owning system substituted
    pub fn credentials_path(&self) -> String {
        self.schema_creds_path.replace("{system}", &self.system)
    }
}

/// Secret store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretsConfig {
    /// TOML/JSON document with one table per secret path
    File { path: PathBuf },

    /// HashiCorp Vault KV v2
    Vault {
        address: String,
        #[serde(default = "default_vault_mount")]
        mount: String,
        #[serde(default = "default_vault_token_env")]
        token_env: String,
    },

    /// Inline secrets (local development)
    Memory {
        #[serde(default)]
        entries: HashMap<String, HashMap<String, Value>>,
    },
}

fn default_vault_mount() -> String {
    "kv".to_string()
}

fn default_vault_token_env() -> String {
    "VAULT_TOKEN".to_string()
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    #[serde(default = "default_sink_name")]
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Target object on the REST API
    #[serde(default = "default_sink_object")]
    pub object: String,

    /// Per-request timeout in seconds (0 = none)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_sink_name() -> String {
    "sink".to_string()
}

fn default_sink_object() -> String {
    "KafkaMessage__c".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// OAuth2-authenticated REST upsert
    Rest,
    /// Log output
    Log,
}

/// Union unwrapping policy of the record normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionPolicy {
    /// Unwrap only `{"string": v}` branches
    #[default]
    StringOnly,
    /// Unwrap every primitive branch (`int`, `long`, `float`, `double`, `boolean`, `bytes`, `string`)
    AllPrimitives,
}

/// Pipeline decode policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Union unwrapping policy
    #[serde(default)]
    pub union_policy: UnionPolicy,

    /// Filter rules; a record is kept when all rules match
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

/// Record filter rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FilterRule {
    /// Key starts with prefix
    KeyPrefix { prefix: String },

    /// Key is one of the listed keys
    KeyIn { keys: Vec<String> },

    /// Field at dotted path equals value
    FieldEquals { field: String, value: Value },

    /// Field at dotted path exists and is not null
    FieldPresent { field: String },
}

/// Raw record source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSONL file to replay
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Delay between replayed records in milliseconds
    #[serde(default)]
    pub replay_delay_ms: u64,
}

/// Quality-log reporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Reporter API base URL
    pub base_url: String,

    /// Resource name reported with every outcome (defaults to the topic)
    #[serde(default)]
    pub resource: Option<String>,
}

impl ServiceBlueprint {
    /// Resource name used by the outcome reporter
    pub fn reporter_resource(&self) -> Option<String> {
        self.reporter.as_ref().map(|reporter| {
            reporter
                .resource
                .clone()
                .unwrap_or_else(|| self.consumer.topic.clone())
        })
    }
}
