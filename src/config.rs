//! Configuration for the trigger.
//!
//! Supports YAML file and environment variable overrides.

use std::path::Path;

use serde::Deserialize;

use crate::bus::{DeliveryPlan, Endpoint, EndpointGroup};

/// Trigger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Endpoint groups to deliver to. Members of one group are failover
    /// alternatives for the same logical broker.
    pub brokers: Vec<BrokerConfig>,
    /// Fully qualified hostname reported as the event sender.
    pub sender: Option<String>,
}

/// One logical broker.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub endpoints: Vec<Endpoint>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            brokers: vec![BrokerConfig {
                endpoints: vec![Endpoint::new("localhost", 61613)],
            }],
            sender: None,
        }
    }
}

impl TriggerConfig {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("WMDBTRIGGER_CONFIG").unwrap_or_else(|_| "wmdbtrigger.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(brokers) = std::env::var("WMDBTRIGGER_BROKERS") {
            self.brokers = parse_broker_list(&brokers)?;
        }

        if let Ok(sender) = std::env::var("WMDBTRIGGER_SENDER") {
            self.sender = Some(sender);
        }

        Ok(())
    }

    /// The delivery plan described by this configuration.
    pub fn plan(&self) -> DeliveryPlan {
        DeliveryPlan::new(
            self.brokers
                .iter()
                .map(|broker| EndpointGroup::new(broker.endpoints.clone()))
                .collect(),
        )
    }
}

/// Parse `host:port[,host:port];host:port...` - commas separate failover
/// members within a group, semicolons separate groups.
fn parse_broker_list(raw: &str) -> Result<Vec<BrokerConfig>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(|group| {
            let endpoints = group
                .split(',')
                .map(str::trim)
                .filter(|member| !member.is_empty())
                .map(parse_endpoint)
                .collect::<Result<Vec<_>, _>>()?;
            if endpoints.is_empty() {
                return Err(ConfigError::Endpoint(group.to_string()));
            }
            Ok(BrokerConfig { endpoints })
        })
        .collect()
}

fn parse_endpoint(raw: &str) -> Result<Endpoint, ConfigError> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::Endpoint(raw.to_string()))?;
    if host.is_empty() {
        return Err(ConfigError::Endpoint(raw.to_string()));
    }
    let port = port
        .parse()
        .map_err(|_| ConfigError::Endpoint(raw.to_string()))?;
    Ok(Endpoint::new(host, port))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid endpoint '{0}', expected host:port")]
    Endpoint(String),
}
