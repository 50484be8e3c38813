//! Configuration system for the pool telemetry simulator
//!
//! Configuration comes from environment variables, optionally layered on top
//! of a TOML file. Every value is validated before the publisher starts; an
//! invalid value is a fatal startup error.

use crate::sensor::BaselineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_MQTT_HOST: &str = "MQTT_HOST";
pub const ENV_MQTT_PORT: &str = "MQTT_PORT";
pub const ENV_MQTT_TOPIC: &str = "MQTT_TOPIC";
pub const ENV_MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const ENV_INTERVAL_SECONDS: &str = "SIM_INTERVAL_SECONDS";
pub const ENV_PH_BASE: &str = "PH_BASE";
pub const ENV_TEMP_BASE_C: &str = "TEMP_BASE_C";
pub const ENV_TDS_BASE_PPM: &str = "TDS_BASE_PPM";

/// Main simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// Broker connection section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker host name or address
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Topic every reading is published to
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Keep-alive interval in seconds (default: 60)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            topic: default_topic(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_host() -> String {
    "mosquitto".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "pool/metrics".to_string()
}

fn default_client_id() -> String {
    "pool-simulator".to_string()
}

fn default_keep_alive() -> u64 {
    60
}

/// Reading synthesis section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSection {
    /// Seconds between publish cycles (default: 10)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_ph_base")]
    pub ph_base: f64,
    #[serde(default = "default_temp_base")]
    pub temp_base_c: f64,
    #[serde(default = "default_tds_base")]
    pub tds_base_ppm: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            ph_base: default_ph_base(),
            temp_base_c: default_temp_base(),
            tds_base_ppm: default_tds_base(),
        }
    }
}

fn default_interval() -> u64 {
    10
}

fn default_ph_base() -> f64 {
    7.4
}

fn default_temp_base() -> f64 {
    25.0
}

fn default_tds_base() -> f64 {
    500.0
}

impl SimulationSection {
    /// Baselines handed to the reading generator
    pub fn baseline(&self) -> BaselineConfig {
        BaselineConfig {
            ph_base: self.ph_base,
            temp_base_c: self.temp_base_c,
            tds_base_ppm: self.tds_base_ppm,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConfigError {
    fn invalid_value(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl SimulatorConfig {
    /// Build configuration from defaults plus process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_overrides(env_lookup)
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: SimulatorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer process environment variables over this configuration
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(env_lookup)
    }

    /// Apply overrides from an environment-style lookup, then validate.
    ///
    /// Keys the lookup does not know keep their current value.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(host) = get(ENV_MQTT_HOST) {
            self.mqtt.host = host;
        }
        if let Some(raw) = get(ENV_MQTT_PORT) {
            self.mqtt.port = parse_number(ENV_MQTT_PORT, &raw)?;
        }
        if let Some(topic) = get(ENV_MQTT_TOPIC) {
            self.mqtt.topic = topic;
        }
        if let Some(client_id) = get(ENV_MQTT_CLIENT_ID) {
            self.mqtt.client_id = client_id;
        }
        if let Some(raw) = get(ENV_INTERVAL_SECONDS) {
            self.simulation.interval_secs = parse_number(ENV_INTERVAL_SECONDS, &raw)?;
        }
        if let Some(raw) = get(ENV_PH_BASE) {
            self.simulation.ph_base = parse_finite(ENV_PH_BASE, &raw)?;
        }
        if let Some(raw) = get(ENV_TEMP_BASE_C) {
            self.simulation.temp_base_c = parse_finite(ENV_TEMP_BASE_C, &raw)?;
        }
        if let Some(raw) = get(ENV_TDS_BASE_PPM) {
            self.simulation.tds_base_ppm = parse_finite(ENV_TDS_BASE_PPM, &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check every field; the first violation is returned
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "broker host must not be empty".to_string(),
            ));
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::invalid_value(
                ENV_MQTT_PORT,
                "0",
                "port must be between 1 and 65535",
            ));
        }
        validate_topic(&self.mqtt.topic)?;
        if self.mqtt.client_id.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "client id must not be empty".to_string(),
            ));
        }
        if self.mqtt.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "keep_alive_secs must be greater than 0".to_string(),
            ));
        }
        if self.simulation.interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                ENV_INTERVAL_SECONDS,
                "0",
                "interval must be at least 1 second",
            ));
        }

        for (key, value) in [
            (ENV_PH_BASE, self.simulation.ph_base),
            (ENV_TEMP_BASE_C, self.simulation.temp_base_c),
            (ENV_TDS_BASE_PPM, self.simulation.tds_base_ppm),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid_value(
                    key,
                    &value.to_string(),
                    "must be a finite number",
                ));
            }
        }

        Ok(())
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::invalid_value(key, raw, e.to_string()))
}

fn parse_finite(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = parse_number(key, raw)?;
    if !value.is_finite() {
        return Err(ConfigError::invalid_value(
            key,
            raw,
            "must be a finite number",
        ));
    }
    Ok(value)
}

/// Publish topics must be non-empty and free of subscription wildcards
fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::invalid_value(
            ENV_MQTT_TOPIC,
            topic,
            "topic must not be empty",
        ));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::invalid_value(
            ENV_MQTT_TOPIC,
            topic,
            "publish topics cannot contain wildcards",
        ));
    }
    Ok(())
}
