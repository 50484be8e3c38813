//! Observability for the simulator: structured logging only
//!
//! The service has no metrics or health endpoints; its status lines are the
//! whole operator-facing surface.

pub mod logging;

// Re-export for convenience
pub use logging::{init_default_logging, init_logging, LogFormat, LogSettings};

// Span macros for structured logging
pub use logging::{lifecycle_span, mqtt_span};
