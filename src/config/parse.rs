use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
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
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let config = parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })?;

    Ok(config)
}

/// Parse and validate configuration from a YAML string
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;
    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<&str> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort_unstable();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=/path/to/directory\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables (e.g., export OUT_DIR=/tmp)\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn expand_paths(config: &mut Config) {
    if let Some(path) = &config.output.insert_path {
        config.output.insert_path = Some(expand_tilde(path));
    }
    config.output.copy_path = expand_tilde(&config.output.copy_path);
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let positive = [
        ("pipeline.batch_size", config.pipeline.batch_size),
        ("pipeline.workers", config.pipeline.workers),
        (
            "pipeline.interval_queue_capacity",
            config.pipeline.interval_queue_capacity,
        ),
        (
            "pipeline.reading_queue_capacity",
            config.pipeline.reading_queue_capacity,
        ),
        ("io.read_buffer_size", config.io.read_buffer_size),
        ("io.write_buffer_size", config.io.write_buffer_size),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(format!("{} must be greater than 0", name));
        }
    }

    validate_output(&config.output, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

/// Optionally schema-qualified SQL identifier
fn table_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("table name pattern is valid")
    })
}

fn validate_output(output: &OutputConfig, errors: &mut Vec<String>) {
    if !table_name_pattern().is_match(&output.table) {
        errors.push(format!(
            "output.table '{}' is not a valid SQL identifier",
            output.table
        ));
    }

    if output.copy_path.file_name().is_none() {
        errors.push(format!(
            "output.copy_path '{}' must name a file",
            output.copy_path.display()
        ));
    }
    if let Some(path) = &output.insert_path {
        if path.file_name().is_none() {
            errors.push(format!(
                "output.insert_path '{}' must name a file",
                path.display()
            ));
        }
        if *path == output.copy_path {
            errors.push("output.insert_path and output.copy_path must differ".to_string());
        }
    }
}
