//! Configuration validation
//!
//! Rules:
//! - consumer identity fields and secret paths are non-empty
//! - secret store backend is addressable
//! - sink name is non-empty
//! - filter rules are well-formed
//! - a reporter requires a reporter secret path

use contracts::{ContractError, FilterRule, SecretsConfig, ServiceBlueprint};

/// Validate a ServiceBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    validate_consumer(blueprint)?;
    validate_secrets(blueprint)?;
    validate_sink(blueprint)?;
    validate_filters(blueprint)?;
    validate_reporter(blueprint)?;
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::config(field, "must not be empty"));
    }
    Ok(())
}

fn require_http_url(field: &str, value: &str) -> Result<(), ContractError> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ContractError::config(
            field,
            format!("'{value}' is not an http(s) URL"),
        ));
    }
    Ok(())
}

/// Validate consumer identity and secret paths
fn validate_consumer(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let consumer = &blueprint.consumer;
    require_non_empty("consumer.system", &consumer.system)?;
    require_non_empty("consumer.topic", &consumer.topic)?;
    require_non_empty("consumer.application", &consumer.application)?;
    require_non_empty("consumer.schema_info_path", &consumer.schema_info_path)?;
    require_non_empty("consumer.schema_creds_path", &consumer.schema_creds_path)?;
    require_non_empty("consumer.sink_secret_path", &consumer.sink_secret_path)?;
    require_non_empty(
        "consumer.trace_instrumentation_name",
        &consumer.trace_instrumentation_name,
    )?;
    Ok(())
}

/// Validate the secret store backend
fn validate_secrets(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    match &blueprint.secrets {
        SecretsConfig::File { path } => {
            if path.as_os_str().is_empty() {
                return Err(ContractError::config("secrets.path", "must not be empty"));
            }
        }
        SecretsConfig::Vault {
            address,
            mount,
            token_env,
        } => {
            require_http_url("secrets.address", address)?;
            require_non_empty("secrets.mount", mount)?;
            require_non_empty("secrets.token_env", token_env)?;
        }
        SecretsConfig::Memory { .. } => {}
    }
    Ok(())
}

/// Validate sink configuration
fn validate_sink(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    require_non_empty("sink.name", &blueprint.sink.name)?;
    require_non_empty("sink.object", &blueprint.sink.object)?;
    Ok(())
}

/// Validate filter rules
fn validate_filters(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    for (idx, rule) in blueprint.pipeline.filters.iter().enumerate() {
        let field = format!("pipeline.filters[{idx}]");
        match rule {
            FilterRule::KeyPrefix { prefix } => require_non_empty(&field, prefix)?,
            FilterRule::KeyIn { keys } => {
                if keys.is_empty() {
                    return Err(ContractError::config(field, "key list cannot be empty"));
                }
            }
            FilterRule::FieldEquals { field: path, .. } | FilterRule::FieldPresent { field: path } => {
                if path.split('.').any(|segment| segment.is_empty()) {
                    return Err(ContractError::config(
                        field,
                        format!("invalid field path '{path}'"),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Validate reporter configuration
fn validate_reporter(blueprint: &ServiceBlueprint) -> Result<(), ContractError> {
    let Some(reporter) = &blueprint.reporter else {
        return Ok(());
    };
    require_http_url("reporter.base_url", &reporter.base_url)?;
    if blueprint.consumer.reporter_secret_path.is_none() {
        return Err(ContractError::config(
            "consumer.reporter_secret_path",
            "required when a reporter is configured",
        ));
    }
    Ok(())
}
