//! MQTT broker client for publishing sensor readings
//!
//! Pure functions are kept apart from I/O so most of the behaviour can be
//! tested without a broker.
//!
//! # Architecture
//!
//! - [`connection`] - Pure client configuration, retry policy and errors
//! - [`message_handler`] - Pure routing of network events
//! - [`client`] - Impure I/O: the `rumqttc` client and its network task
//!
//! # Usage
//!
//! ```rust,no_run
//! use poolsim::config::MqttSection;
//! use poolsim::transport::mqtt::MqttBroker;
//! use poolsim::transport::{Broker, DeliveryGuarantee};
//! use poolsim::publisher::ConnectionStatus;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut broker = MqttBroker::new(MqttSection::default());
//! broker.connect(Arc::new(ConnectionStatus::new())).await?;
//! broker.start_background_processing().await?;
//! broker
//!     .publish("pool/metrics", b"{}".to_vec(), DeliveryGuarantee::AtLeastOnce, false)
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

pub use client::MqttBroker;
pub use connection::{configure_mqtt_options, AutoReconnectPolicy, MqttError};
pub use message_handler::{EventRoute, MessageHandler};
