//! # Integration Tests
//!
//! Cross-crate integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot checks
//! - Source -> Pipeline -> Dispatcher flows against a mock sink
//! - Full stack against mock registry and REST endpoints (no live services)

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, EncodingKind, PipelineError};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn pipeline_error_renders_cause_then_value() {
        let err = PipelineError::new(ContractError::DeserializationFailed { found: "string" })
            .with_key("7")
            .with_value("\"bare\"");
        assert_eq!(
            err.to_string(),
            "could not deserialize value: expected a mapping, found string\n\"bare\""
        );
    }

    #[test]
    fn only_avro_is_decodable() {
        assert!(EncodingKind::Avro.is_supported());
        assert!(!EncodingKind::Protobuf.is_supported());
        assert!(!EncodingKind::Json.is_supported());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ContractError, DecodedMessage, EncodingDescriptor, EncodingKind, MessageSink, RawRecord,
        SecretMap,
    };
    use dispatcher::{Dispatcher, FatalError, StopReason, create_sink};
    use ingestion::{
        ChannelRecordSource, Pipeline, PipelineConfig, ReplayConfig, ReplayRecordSource,
        RuleFilter,
    };
    use mockito::Matcher;
    use registry::{MemorySecretStore, SchemaResolver};
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    const ORDER_SCHEMA: &str = r#"{"type":"record","name":"Order","fields":[{"name":"name","type":["null","string"]},{"name":"status","type":"string"}]}"#;

    /// Sink collecting every upserted message
    #[derive(Clone, Default)]
    struct CollectingSink {
        messages: Arc<Mutex<Vec<DecodedMessage>>>,
    }

    impl MessageSink for CollectingSink {
        fn name(&self) -> &str {
            "collecting"
        }

        async fn upsert(&mut self, message: &DecodedMessage) -> Result<(), ContractError> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn avro() -> EncodingDescriptor {
        EncodingDescriptor::new("orders", EncodingKind::Avro, ORDER_SCHEMA)
    }

    /// End-to-end test: ChannelRecordSource -> Pipeline -> Dispatcher
    #[tokio::test]
    async fn test_e2e_channel_pipeline() {
        let (tx, source) = ChannelRecordSource::new("orders", 8);
        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) =
            Pipeline::start(source, PipelineConfig::new("orders"), avro(), None, &cancel)
                .unwrap();

        let sink = CollectingSink::default();
        let delivered = Arc::clone(&sink.messages);
        let task =
            Dispatcher::new(sink, outputs.decoded, outputs.errors).spawn(cancel.clone());

        tx.send(RawRecord::new("42", json!({"name": {"string": "Alice"}})))
            .await
            .unwrap();
        for i in 0..20 {
            tx.send(RawRecord::new(i.to_string(), json!({"seq": {"int": i}})))
                .await
                .unwrap();
        }
        tx.close();

        let summary = task.await.unwrap().unwrap();
        pipeline.shutdown().await;

        assert_eq!(summary.reason, StopReason::ChannelsClosed);
        assert_eq!(summary.metrics.delivered, 21);

        let messages = delivered.lock().unwrap();
        assert_eq!(messages[0].key, "42");
        assert_eq!(messages[0].topic, "orders");
        assert_eq!(messages[0].payload_str(), Some(r#"{"name":"Alice"}"#));

        let keys: Vec<&str> = messages[1..].iter().map(|m| m.key.as_str()).collect();
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(keys, expected);
        // non-string branches are kept
        assert_eq!(messages[1].payload_str(), Some(r#"{"seq":{"int":0}}"#));
    }

    /// Records rejected by the configured filter never reach the sink
    #[tokio::test]
    async fn test_e2e_config_filter() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[consumer]
system = "crm"
topic = "orders"
application = "orders-bridge"
schema_info_path = "kv/schema-registry"
schema_creds_path = "kv/{system}/schema-registry"
sink_secret_path = "kv/crm/sink"

[secrets]
kind = "memory"

[sink]
sink_type = "log"

[[pipeline.filters]]
rule = "field_equals"
field = "status"
value = "OPEN"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let (tx, source) = ChannelRecordSource::new("orders", 8);
        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) = Pipeline::start(
            source,
            PipelineConfig::from_blueprint(&blueprint.consumer, &blueprint.pipeline),
            avro(),
            RuleFilter::from_rules(&blueprint.pipeline.filters),
            &cancel,
        )
        .unwrap();

        let sink = CollectingSink::default();
        let delivered = Arc::clone(&sink.messages);
        let task =
            Dispatcher::new(sink, outputs.decoded, outputs.errors).spawn(cancel.clone());

        for (key, status) in [("1", "OPEN"), ("2", "CLOSED"), ("3", "OPEN")] {
            tx.send(RawRecord::new(key, json!({"status": {"string": status}})))
                .await
                .unwrap();
        }
        tx.close();

        task.await.unwrap().unwrap();
        pipeline.shutdown().await;

        let keys: Vec<String> = delivered.lock().unwrap().iter().map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["1", "3"]);
        let metrics = pipeline.metrics().snapshot();
        assert_eq!(metrics.records_received, 3);
        assert_eq!(metrics.records_filtered, 1);
    }

    /// A record that cannot be decoded stops the bridge with a fatal error
    #[tokio::test]
    async fn test_e2e_decode_failure_is_fatal() {
        let (tx, source) = ChannelRecordSource::new("orders", 8);
        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) =
            Pipeline::start(source, PipelineConfig::new("orders"), avro(), None, &cancel)
                .unwrap();

        let sink = CollectingSink::default();
        let delivered = Arc::clone(&sink.messages);
        let task =
            Dispatcher::new(sink, outputs.decoded, outputs.errors).spawn(cancel.clone());

        tx.send(RawRecord::new("1", json!({"ok": true}))).await.unwrap();
        tx.send(RawRecord::new("2", json!("bare"))).await.unwrap();

        let result = task.await.unwrap();
        cancel.cancel();
        pipeline.shutdown().await;

        match result {
            Err(FatalError::Pipeline(err)) => {
                assert_eq!(err.key(), Some("2"));
                assert!(matches!(
                    err.cause(),
                    ContractError::DeserializationFailed { found: "string" }
                ));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(delivered.lock().unwrap().len(), 1);
        assert!(pipeline.is_finished());
    }

    /// Records after a failed one never reach the sink, even when the
    /// pipeline ran ahead of the dispatcher
    #[tokio::test]
    async fn test_e2e_nothing_delivered_after_failure() {
        let (tx, source) = ChannelRecordSource::new("orders", 8);
        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) =
            Pipeline::start(source, PipelineConfig::new("orders"), avro(), None, &cancel)
                .unwrap();

        tx.send(RawRecord::new("1-good", json!({"a": 1}))).await.unwrap();
        tx.send(RawRecord::new("2-bad", json!("bare"))).await.unwrap();
        tx.send(RawRecord::new("3-good", json!({"a": 3}))).await.unwrap();
        tx.send(RawRecord::new("4-good", json!({"a": 4}))).await.unwrap();
        // Give the pipeline time to run ahead before anything is drained
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let sink = CollectingSink::default();
        let delivered = Arc::clone(&sink.messages);
        let result = Dispatcher::new(sink, outputs.decoded, outputs.errors)
            .run(cancel.clone())
            .await;
        cancel.cancel();
        pipeline.shutdown().await;

        let fatal = result.unwrap_err();
        assert_eq!(fatal.key(), Some("2-bad"));
        let keys: Vec<String> = delivered.lock().unwrap().iter().map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["1-good"]);
    }

    fn secrets(registry_url: &str, token_url: &str) -> MemorySecretStore {
        let info: SecretMap = HashMap::from([(
            "schema-registry-url".to_string(),
            json!(registry_url),
        )]);
        let creds: SecretMap = HashMap::from([
            ("schema_registry_key".to_string(), json!("api-key")),
            ("schema_registry_secret".to_string(), json!("api-secret")),
        ]);
        let sink: SecretMap = HashMap::from([
            ("token-endpoint".to_string(), json!(token_url)),
            ("api-url".to_string(), json!("/services/data/v56.0")),
            ("client-id".to_string(), json!("id")),
            ("client-secret".to_string(), json!("secret")),
        ]);
        MemorySecretStore::new()
            .with_secret("kv/schema-registry", info)
            .with_secret("kv/crm/schema-registry", creds)
            .with_secret("kv/crm/sink", sink)
    }

    /// Full stack: secrets -> registry -> replay capture -> pipeline -> REST upsert
    #[tokio::test]
    async fn test_e2e_replay_to_rest_sink() {
        let mut server = mockito::Server::new_async().await;
        let registry = server
            .mock("GET", "/subjects/orders/versions/latest")
            .match_header(
                "authorization",
                Matcher::Exact("Basic YXBpLWtleTphcGktc2VjcmV0".into()),
            )
            .with_status(200)
            .with_body(
                json!({"subject": "orders", "id": 5, "version": 2, "schema": ORDER_SCHEMA})
                    .to_string(),
            )
            .create_async()
            .await;
        let instance = server.url();
        let token = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(json!({"access_token": "tok", "instance_url": instance}).to_string())
            .create_async()
            .await;
        let upsert = server
            .mock("POST", "/services/data/v56.0/sobjects/KafkaMessage__c/")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "Key__c": "42",
                "Topic__c": "orders",
                "Value__c": "eyJuYW1lIjoiQWxpY2UifQ=="
            })))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let blueprint = ConfigLoader::load_from_str(
            r#"
[consumer]
system = "crm"
topic = "orders"
application = "orders-bridge"
schema_info_path = "kv/schema-registry"
schema_creds_path = "kv/{system}/schema-registry"
sink_secret_path = "kv/crm/sink"

[secrets]
kind = "memory"

[sink]
name = "crm"
sink_type = "rest"
request_timeout_secs = 5
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let store = secrets(&server.url(), &format!("{}/oauth2/token", server.url()));
        let descriptor = SchemaResolver::for_consumer(store.clone(), &blueprint.consumer)
            .resolve_consumer(&blueprint.consumer)
            .await
            .unwrap();
        assert_eq!(descriptor.id, 5);

        let sink = create_sink(&blueprint.sink, &store, &blueprint.consumer.sink_secret_path)
            .await
            .unwrap();

        let mut capture = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(
            capture,
            r#"{{"key": "42", "value": {{"name": {{"string": "Alice"}}}}, "partition": 0, "offset": 1}}"#
        )
        .unwrap();
        writeln!(capture, r#"{{"error": "broker connection reset"}}"#).unwrap();
        let source = ReplayRecordSource::load(capture.path(), ReplayConfig::default()).unwrap();

        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) = Pipeline::start(
            source,
            PipelineConfig::from_blueprint(&blueprint.consumer, &blueprint.pipeline),
            descriptor,
            None,
            &cancel,
        )
        .unwrap();
        let summary = Dispatcher::new(sink, outputs.decoded, outputs.errors)
            .run(cancel.clone())
            .await
            .unwrap();
        pipeline.shutdown().await;

        assert_eq!(summary.reason, StopReason::ChannelsClosed);
        assert_eq!(summary.metrics.delivered, 1);
        assert_eq!(pipeline.metrics().snapshot().transport_errors, 1);
        registry.assert_async().await;
        token.assert_async().await;
        upsert.assert_async().await;
    }

    /// A rejected upsert ends the run with the sink's API error
    #[tokio::test]
    async fn test_e2e_rejected_upsert_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let instance = server.url();
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(json!({"access_token": "tok", "instance_url": instance}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/services/data/v56.0/sobjects/KafkaMessage__c/")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let store = secrets(&server.url(), &format!("{}/oauth2/token", server.url()));
        let sink_config = contracts::SinkConfig {
            name: "crm".to_string(),
            sink_type: contracts::SinkType::Rest,
            object: "KafkaMessage__c".to_string(),
            request_timeout_secs: 5,
        };
        let sink = create_sink(&sink_config, &store, "kv/crm/sink").await.unwrap();

        let (tx, source) = ChannelRecordSource::new("orders", 8);
        let cancel = CancellationToken::new();
        let (mut pipeline, outputs) =
            Pipeline::start(source, PipelineConfig::new("orders"), avro(), None, &cancel)
                .unwrap();
        let task =
            Dispatcher::new(sink, outputs.decoded, outputs.errors).spawn(cancel.clone());

        tx.send(RawRecord::new("9", json!({"name": {"string": "Bob"}})))
            .await
            .unwrap();

        let result = task.await.unwrap();
        cancel.cancel();
        pipeline.shutdown().await;

        match result {
            Err(FatalError::Sink { key, source }) => {
                assert_eq!(key, "9");
                assert!(matches!(source, ContractError::Api { status: 503, .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
