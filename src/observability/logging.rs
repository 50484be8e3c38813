//! Log subscriber setup and span macros
//!
//! Every connection transition and publish result is a log line, so the
//! subscriber installed here is the simulator's only operator surface.
//!
//! Settings come from the environment:
//!
//! - `LOG_LEVEL`: ERROR, WARN, INFO (default), DEBUG or TRACE
//! - `LOG_FORMAT`: `json` (default), `pretty` or `compact`
//! - `LOG_SPANS`: `true` to log span open and close events
//! - `RUST_LOG`: full filter directive, replaces `LOG_LEVEL` and the
//!   dependency quieting
//!
//! ```bash
//! # Watch publish acks while developing
//! LOG_FORMAT=pretty LOG_LEVEL=DEBUG ./poolsim run
//! ```

use std::env;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dependencies that are only interesting at warn and above
const QUIET_DEPENDENCIES: [&str; 2] = ["rumqttc", "tokio"];

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log collectors
    Json,
    /// Multi-line with colors
    Pretty,
    /// One line with colors, no target
    Compact,
}

impl LogFormat {
    /// Case-insensitive; anything unknown is JSON
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Parse a textual level, falling back to INFO
pub fn parse_level(s: &str) -> Level {
    s.trim().parse().unwrap_or(Level::INFO)
}

/// Level filter with dependency noise reduced
pub fn build_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::new(level.to_string());
    for target in QUIET_DEPENDENCIES {
        if let Ok(directive) = format!("{target}=warn").parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
    pub include_spans: bool,
    /// Raw `RUST_LOG` directive, used instead of `level` when present
    pub directive: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings from an environment-style lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: lookup("LOG_LEVEL").map_or(Level::INFO, |v| parse_level(&v)),
            format: lookup("LOG_FORMAT").map_or(LogFormat::Json, |v| LogFormat::parse(&v)),
            include_spans: lookup("LOG_SPANS")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            directive: lookup("RUST_LOG").filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn filter(&self) -> EnvFilter {
        match &self.directive {
            Some(directive) => EnvFilter::new(directive),
            None => build_filter(self.level),
        }
    }
}

fn span_events(include_spans: bool) -> FmtSpan {
    if include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

/// Install the global subscriber. Panics if one is already installed.
pub fn init_logging(settings: &LogSettings) {
    let subscriber = tracing_subscriber::registry().with(settings.filter());
    let spans = span_events(settings.include_spans);

    match settings.format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_span_events(spans))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().pretty().with_ansi(true).with_span_events(spans))
                .init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(false)
                .with_span_events(spans);
            subscriber.with(layer).init();
        }
    }
}

/// Initialize logging from environment variables
pub fn init_default_logging() {
    init_logging(&LogSettings::from_env());
}

/// Span for the broker network task
#[macro_export]
macro_rules! mqtt_span {
    ($($field:tt)*) => {
        tracing::info_span!("mqtt_operation", $($field)*)
    };
}

/// Span for the publisher lifecycle
#[macro_export]
macro_rules! lifecycle_span {
    ($($field:tt)*) => {
        tracing::info_span!("lifecycle_event", $($field)*)
    };
}

pub use {lifecycle_span, mqtt_span};
