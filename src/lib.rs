//! Pool sensor telemetry simulator
//!
//! Synthesizes pH, temperature and dissolved-solids readings for a pool and
//! publishes them as JSON to an MQTT topic at a fixed cadence.
//!
//! # Overview
//!
//! - [`sensor`] - pure reading generator and the wire payload
//! - [`publisher`] - connection state, reconnect policy and the publish loop
//! - [`transport`] - broker contract and its `rumqttc` implementation
//! - [`config`] - environment and TOML configuration
//!
//! # Quick Start
//!
//! ```rust
//! use poolsim::sensor::{BaselineConfig, GeneratorState, ReadingGenerator};
//!
//! let baseline = BaselineConfig::default();
//! let generator = ReadingGenerator::new(baseline);
//! let mut state = GeneratorState::new(&baseline);
//!
//! let angle = state.advance();
//! let (reading, raw_ph) = generator.generate(state.previous_ph, angle);
//! state.previous_ph = raw_ph;
//!
//! let json = String::from_utf8(reading.to_json_bytes().unwrap()).unwrap();
//! assert!(json.contains("\"trend_value\""));
//! ```
//!
//! Driving the loop against the in-memory broker:
//!
//! ```rust
//! use poolsim::config::SimulatorConfig;
//! use poolsim::publisher::PublisherLoop;
//! use poolsim::testing::MockBroker;
//!
//! # tokio_test::block_on(async {
//! let broker = MockBroker::new();
//! let mut publisher = PublisherLoop::new(broker.clone(), &SimulatorConfig::default());
//! publisher.start().await.unwrap();
//! publisher.tick().await.unwrap();
//! assert_eq!(broker.get_published_messages().await.len(), 1);
//! # });
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod publisher;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use config::{ConfigError, SimulatorConfig};
pub use error::{SimulatorError, SimulatorResult};
pub use publisher::{ConnectionStatus, PublisherLoop, TickOutcome};
pub use sensor::{ReadingGenerator, SensorReading, Trend};
pub use transport::mqtt::MqttBroker;
pub use transport::{Broker, ConnectionListener};
