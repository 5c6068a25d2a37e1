//! Integration tests for configuration loading and validation

use chatwire_core::config::{
    load_from_json, load_from_yaml, load_from_yaml_str, ConfigError, GatewayConfig, SafeLogging,
};
use chatwire_core::validation::ValidationErrorKind;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn validation_error(result: Result<GatewayConfig, ConfigError>) -> (String, ValidationErrorKind) {
    match result {
        Err(ConfigError::ValidationError(err)) => (err.field_path, err.kind),
        other => panic!("Expected ValidationError, got {:?}", other),
    }
}

#[test]
fn test_load_full_yaml_config() {
    env::set_var("CHATWIRE_IT_YAML_KEY", "sk-from-env-123456");

    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: ${CHATWIRE_IT_YAML_KEY}
  organization: org-123
connection:
  connect_timeout_ms: 2000
retry:
  max_retries: 5
  initial_delay_ms: 250
defaults:
  temperature: 0.7
  max_tokens: 512
limits:
  max_messages: 64
  max_tokens: 4096
models:
  - id: gpt-4
    owned_by: openai
    created: 1687882411
  - id: gpt-4o-mini
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "gateway.yaml", yaml);
    let config = load_from_yaml(path).unwrap();

    assert_eq!(config.upstream.api_key.expose_secret(), "sk-from-env-123456");
    assert_eq!(config.upstream.organization.as_deref(), Some("org-123"));
    assert_eq!(config.connection.connect_timeout_ms, 2000);
    assert_eq!(config.connection.request_timeout_ms, 60000);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.defaults.temperature, Some(0.7));
    assert_eq!(config.limits.max_messages, 64);
    assert_eq!(config.models[1].owned_by, "system");

    let list = config.model_list();
    assert_eq!(list.data.len(), 2);
    assert_eq!(list.data[0].created, Some(1687882411));

    env::remove_var("CHATWIRE_IT_YAML_KEY");
}

#[test]
fn test_load_json_config() {
    let json = r#"{
        "version": "0.1",
        "upstream": {"base_url": "http://localhost:8080/v1", "api_key": "local-key-000"},
        "models": [{"id": "llama-3-8b", "owned_by": "local"}]
    }"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "gateway.json", json);
    let config = load_from_json(path).unwrap();

    assert_eq!(config.upstream.base_url, "http://localhost:8080/v1");
    assert!(config.model_list().contains("llama-3-8b"));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = load_from_yaml(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

#[test]
fn test_missing_env_var() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: ${CHATWIRE_IT_NEVER_SET}
"#;
    match load_from_yaml_str(yaml) {
        Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "CHATWIRE_IT_NEVER_SET"),
        other => panic!("Expected EnvVarNotFound, got {:?}", other),
    }
}

#[test]
fn test_env_var_outside_upstream_is_literal() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: sk-literal-key
models:
  - id: ${NOT_INTERPOLATED}
"#;
    let config = load_from_yaml_str(yaml).unwrap();
    assert_eq!(config.models[0].id, "${NOT_INTERPOLATED}");
}

#[test]
fn test_lowercase_placeholder_rejected() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: ${openai_key}
"#;
    let (path, kind) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "upstream.api_key");
    assert!(matches!(kind, ValidationErrorKind::InvalidFormat { .. }));
}

#[test]
fn test_invalid_yaml_reports_location() {
    let yaml = "version: \"0.1\"\nupstream: [unclosed\n";
    match load_from_yaml_str(yaml) {
        Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
        other => panic!("Expected ParseError, got {:?}", other),
    }
}

#[test]
fn test_missing_version() {
    let yaml = r#"
upstream:
  base_url: https://api.openai.com/v1
  api_key: sk-test
"#;
    assert!(matches!(
        load_from_yaml_str(yaml),
        Err(ConfigError::ParseError { .. })
    ));
}

#[test]
fn test_invalid_base_url() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: not a url
  api_key: sk-test
"#;
    let (path, kind) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "upstream.base_url");
    assert!(matches!(kind, ValidationErrorKind::InvalidUrl { .. }));
}

#[test]
fn test_defaults_out_of_range() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: sk-test
defaults:
  temperature: 3.5
"#;
    let (path, _) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "defaults.temperature");
}

#[test]
fn test_retry_delays_inverted() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: sk-test
retry:
  initial_delay_ms: 5000
  max_delay_ms: 1000
"#;
    let (path, kind) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "retry.max_delay_ms");
    assert!(matches!(kind, ValidationErrorKind::Incompatible { .. }));
}

#[test]
fn test_zero_message_limit() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: sk-test
limits:
  max_messages: 0
"#;
    let (path, _) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "limits.max_messages");
}

#[test]
fn test_empty_api_key() {
    let yaml = r#"
version: "0.1"
upstream:
  base_url: https://api.openai.com/v1
  api_key: ""
"#;
    let (path, kind) = validation_error(load_from_yaml_str(yaml));
    assert_eq!(path, "upstream.api_key");
    assert_eq!(kind, ValidationErrorKind::RequiredFieldMissing);
}

#[test]
fn test_secret_never_printed() {
    let config = GatewayConfig::new("https://api.openai.com/v1", "sk-abcdefghijklmnop");

    let debug = format!("{:?}", config);
    assert!(!debug.contains("sk-abcdefghijklmnop"));
    assert!(debug.contains("[REDACTED]"));

    let summary = config.safe_for_logging();
    assert!(summary.contains("sk-...mnop"));
    assert!(!summary.contains("abcdefghijkl"));
}

#[test]
fn test_secret_serializes_as_plain_string() {
    let config = GatewayConfig::new("https://api.openai.com/v1", "sk-roundtrip-key");
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("api_key: sk-roundtrip-key"));

    let reparsed = load_from_yaml_str(&yaml).unwrap();
    assert_eq!(reparsed.upstream.api_key, config.upstream.api_key);
}
