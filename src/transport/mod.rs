//! Transport layer for publishing readings
//!
//! This module provides the broker collaborator abstraction consumed by the
//! publisher loop, and its MQTT implementation.

pub mod mqtt;

/// Delivery guarantee requested for a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryGuarantee {
    AtMostOnce,
    AtLeastOnce,
}

/// Immediate result of handing a message to the broker client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    /// Accepted for delivery
    Success,
    /// The broker link is down; the message was not queued
    NotConnected,
    /// The client's outgoing queue is full
    QueueFull,
}

impl PublishStatus {
    /// Numeric status code reported in log lines (0 = success)
    pub fn code(self) -> i32 {
        match self {
            PublishStatus::Success => 0,
            PublishStatus::NotConnected => 4,
            PublishStatus::QueueFull => 15,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, PublishStatus::Success)
    }
}

/// Connection status callbacks invoked from the broker's background task
pub trait ConnectionListener: Send + Sync {
    /// ConnAck received; `code` 0 means accepted
    fn on_connected(&self, code: u8);

    /// Link lost or closed; `code` 0 means the client asked for it
    fn on_disconnected(&self, code: u8);

    /// Broker acknowledged a QoS 1 publish
    fn on_publish_ack(&self, message_id: u16);
}

/// Broker collaborator contract
///
/// Implementations report connection state asynchronously through the
/// [`ConnectionListener`] handed to [`connect`](Broker::connect). None of the
/// calls wait for the broker to answer.
#[async_trait::async_trait]
pub trait Broker: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue the initial connect request
    async fn connect(
        &mut self,
        listener: std::sync::Arc<dyn ConnectionListener>,
    ) -> Result<(), Self::Error>;

    /// Start the network-processing task that drives keep-alives, acks and callbacks
    async fn start_background_processing(&mut self) -> Result<(), Self::Error>;

    /// Stop the network-processing task
    async fn stop_background_processing(&mut self);

    /// Request an explicit reconnection
    async fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Publish a payload to a topic
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<PublishStatus, Self::Error>;

    /// Disconnect from the broker
    async fn disconnect(&mut self) -> Result<(), Self::Error>;
}

/// Type alias for MQTT transport
pub type MqttTransport = mqtt::MqttBroker;
