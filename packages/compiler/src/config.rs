use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use foundry_core::constants;
use thiserror::Error;

pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid update timeout: {0}")]
    InvalidTimeout(#[from] ParseIntError),
    #[error("Update timeout must be at least 1 second")]
    TimeoutTooShort,
    #[error("Invalid boolean for {var}: {value}")]
    InvalidFlag { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfig {
    /// Wall-clock bound on a whole update call
    pub update_timeout: Duration,
    pub codegen_enabled: bool,
    /// Default permitted connections when the input names none
    pub permitted_connections: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            update_timeout: Duration::from_secs(DEFAULT_UPDATE_TIMEOUT_SECS),
            codegen_enabled: true,
            permitted_connections: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_secs = match lookup(constants::FOUNDRY_UPDATE_TIMEOUT_SECS) {
            Some(value) => value.trim().parse::<u64>()?,
            None => DEFAULT_UPDATE_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::TimeoutTooShort);
        }

        let codegen_enabled = match lookup(constants::FOUNDRY_CODEGEN_ENABLED) {
            Some(value) => parse_flag(constants::FOUNDRY_CODEGEN_ENABLED, &value)?,
            None => true,
        };

        let permitted_connections = lookup(constants::FOUNDRY_PERMITTED_CONNECTIONS)
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(CompilerConfig {
            update_timeout: Duration::from_secs(timeout_secs),
            codegen_enabled,
            permitted_connections,
        })
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.update_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let config = CompilerConfig::from_lookup(lookup_from(&[
            ("FOUNDRY_UPDATE_TIMEOUT_SECS", "30"),
            ("FOUNDRY_CODEGEN_ENABLED", "off"),
            ("FOUNDRY_PERMITTED_CONNECTIONS", "X, slack,,"),
        ]))
        .unwrap();

        assert_eq!(config.update_timeout, Duration::from_secs(30));
        assert!(!config.codegen_enabled);
        assert_eq!(config.permitted_connections, vec!["x", "slack"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            CompilerConfig::from_lookup(lookup_from(&[("FOUNDRY_UPDATE_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            CompilerConfig::from_lookup(lookup_from(&[("FOUNDRY_UPDATE_TIMEOUT_SECS", "0")])),
            Err(ConfigError::TimeoutTooShort)
        ));
        assert!(matches!(
            CompilerConfig::from_lookup(lookup_from(&[("FOUNDRY_CODEGEN_ENABLED", "maybe")])),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }
}
