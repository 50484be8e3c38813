//! Error types for the pool telemetry simulator
//!
//! Errors from the publish and reconnect path are logged and absorbed by the
//! publisher loop. Only the variants below ever leave it.

use std::time::Duration;
use thiserror::Error;

/// Main error type for simulator operations
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Initial broker connection not established within {waited:?}")]
    InitialConnectionTimeout { waited: Duration },

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SimulatorError {
    /// Wrap a broker collaborator error
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(error))
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from the startup connection deadline
    pub fn is_startup_timeout(&self) -> bool {
        matches!(self, Self::InitialConnectionTimeout { .. })
    }
}

/// Result type for simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_internal_error_constructor() {
        let error = SimulatorError::internal("unexpected state");
        assert!(matches!(error, SimulatorError::Internal { .. }));
        assert_eq!(error.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_transport_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = SimulatorError::transport(io);
        assert!(error.to_string().contains("refused"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_startup_timeout_display() {
        let error = SimulatorError::InitialConnectionTimeout {
            waited: Duration::from_secs(10),
        };
        assert!(error.is_startup_timeout());
        assert!(error.to_string().contains("10s"));
    }

    #[test]
    fn test_config_error_conversion() {
        let error: SimulatorError = ConfigError::InvalidConfig("bad".to_string()).into();
        assert!(matches!(error, SimulatorError::Config(_)));
        assert!(!error.is_startup_timeout());
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration: bad"
        );
    }
}
