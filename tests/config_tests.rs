use converge::config::{generate::generate_starter_config, load_config, ConfigError};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_generated_config_is_valid() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(&config_path, generate_starter_config()).unwrap();

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.api.url, "http://localhost:5601");
    assert_eq!(config.api.timeout, Duration::from_secs(30));
    assert!(config.api.username.is_none());
    assert_eq!(config.poll.max_attempts, 100);
    assert_eq!(config.poll.interval, Duration::from_millis(300));
}

#[test]
fn test_duration_parsing() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let yaml = r#"
api:
  url: https://kibana.internal:5601
  timeout: 1m
poll:
  max_attempts: 20
  interval: 2s
"#;
    fs::write(&config_path, yaml).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.api.timeout, Duration::from_secs(60));
    assert_eq!(config.poll.max_attempts, 20);
    assert_eq!(config.poll.interval, Duration::from_secs(2));
}

#[test]
fn test_env_var_expansion_in_credentials() {
    // Names are unique to this test and left set, so parallel tests never race on them
    std::env::set_var("CONVERGE_IT_USER", "elastic");
    std::env::set_var("CONVERGE_IT_PASS", "changeme");

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let yaml = r#"
api:
  url: http://localhost:5601
  username: $env{CONVERGE_IT_USER}
  password: $env{CONVERGE_IT_PASS}
"#;
    fs::write(&config_path, yaml).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.api.username.as_deref(), Some("elastic"));
    assert_eq!(config.api.password.as_deref(), Some("changeme"));
}

#[test]
fn test_missing_api_section_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(&config_path, "poll:\n  max_attempts: 3\n").unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("config.yml"), "error: {}", err);
}

#[test]
fn test_zero_attempts_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    fs::write(
        &config_path,
        "api:\n  url: http://localhost:5601\npoll:\n  max_attempts: 0\n",
    )
    .unwrap();

    match load_config(&config_path) {
        Err(ConfigError::ValidationList(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("max_attempts"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_reports_path() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("absent.yml");

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("absent.yml"));
}
