//! Pure connection configuration for the MQTT broker client
//!
//! This module contains pure functions for building client options, the
//! client's own automatic retry policy, and the transport error type.

use crate::config::MqttSection;
use rumqttc::MqttOptions;
use std::time::Duration;
use thiserror::Error;

/// Capacity of the request channel between `AsyncClient` and `EventLoop`
pub const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Upper bound on the TCP reachability check made by an explicit reconnect
pub const REACHABILITY_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Automatic retry policy of the background network task.
///
/// This runs independently of the publisher loop's explicit reconnects.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoReconnectPolicy {
    /// Delay after the first failed attempt
    pub min_delay: Duration,
    /// Delay ceiling once doubling saturates
    pub max_delay: Duration,
}

impl Default for AutoReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
        }
    }
}

impl AutoReconnectPolicy {
    /// Delay before retry number `failures` (1-based), doubling from `min_delay`
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        let delay = self.min_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Broker {host}:{port} unreachable: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("Client not started - call connect() first")]
    NotStarted,
    #[error("Background processing already running")]
    AlreadyRunning,
}

/// Pure function to configure MQTT options from config
pub fn configure_mqtt_options(config: &MqttSection) -> MqttOptions {
    let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    // No session survives a restart
    mqtt_options.set_clean_session(true);
    mqtt_options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_reconnect_policy_default() {
        let policy = AutoReconnectPolicy::default();
        assert_eq!(policy.min_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(120));
    }

    #[test]
    fn test_auto_reconnect_delay_doubles_and_caps() {
        let policy = AutoReconnectPolicy::default();

        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(7), Duration::from_secs(64));
        assert_eq!(policy.delay_for(8), Duration::from_secs(120));
        assert_eq!(policy.delay_for(1000), Duration::from_secs(120));
    }

    #[test]
    fn test_auto_reconnect_delay_zero_attempts() {
        let policy = AutoReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    }

    #[test]
    fn test_configure_mqtt_options() {
        let config = MqttSection::default();
        let options = configure_mqtt_options(&config);

        assert_eq!(
            options.broker_address(),
            ("mosquitto".to_string(), 1883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(options.client_id(), "pool-simulator");
        assert!(options.clean_session());
    }

    #[test]
    fn test_mqtt_error_display() {
        let errors = vec![
            MqttError::ConnectionFailed("test".to_string().into()),
            MqttError::PublishFailed("test".to_string().into()),
            MqttError::Unreachable {
                host: "mosquitto".to_string(),
                port: 1883,
                reason: "refused".to_string(),
            },
            MqttError::NotStarted,
            MqttError::AlreadyRunning,
        ];

        for error in errors {
            let error_string = error.to_string();
            assert!(!error_string.is_empty());
        }
    }
}
