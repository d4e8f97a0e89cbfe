use super::types::*;
use crate::config::expand_env_vars;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate config text. Environment variables are expanded first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);

    check_unexpanded_vars(&yaml_string)?;

    let config: Config = serde_yaml::from_str(&yaml_string)?;

    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars = extract_variable_references(&strip_comment_lines(yaml_string));

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Drops whole-line `#` comments so commented-out settings don't count as
/// variable references.
fn strip_comment_lines(yaml_string: &str) -> String {
    yaml_string
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_variable_references(text: &str) -> Vec<String> {
    let re = match Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    re.captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_api(&config.api, &mut errors);
    validate_poll(&config.poll, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    if api.url.is_empty() {
        errors.push("api.url cannot be empty".to_string());
    } else if !api.url.starts_with("http://") && !api.url.starts_with("https://") {
        errors.push(format!(
            "api.url '{}' must start with http:// or https://",
            api.url
        ));
    }

    if api.timeout.is_zero() {
        errors.push("api.timeout must be greater than zero".to_string());
    }

    for (field, path) in [
        ("api.install_path", &api.install_path),
        ("api.status_path", &api.status_path),
    ] {
        if !path.starts_with('/') {
            errors.push(format!("{} '{}' must start with '/'", field, path));
        }
    }

    if api.password.is_some() && api.username.is_none() {
        errors.push("api.password is set but api.username is missing".to_string());
    }
}

fn validate_poll(poll: &PollConfig, errors: &mut Vec<String>) {
    if let Err(e) = poll.policy() {
        errors.push(format!("poll: {}", e));
    }
}
