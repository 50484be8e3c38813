//! Mock implementations for testing
//!
//! Provides a scriptable in-memory [`Broker`] so the publisher loop can be
//! driven without a running MQTT broker.

use crate::error::SimulatorError;
use crate::transport::{Broker, ConnectionListener, DeliveryGuarantee, PublishStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A message handed to [`MockBroker::publish`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub guarantee: DeliveryGuarantee,
    pub retain: bool,
}

/// Broker operations in the order they were called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerCall {
    Connect,
    StartBackgroundProcessing,
    StopBackgroundProcessing,
    Reconnect,
    Publish,
    Disconnect,
}

/// What [`MockBroker::reconnect`] does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectBehavior {
    /// Return an error
    Fail,
    /// Succeed and report the connect callback before returning
    Succeed,
    /// Succeed without any callback. The acknowledgement arrives later, if at
    /// all, through [`MockBroker::simulate_connect`], as with `MqttBroker`
    AcceptWithoutAck,
}

/// What [`MockBroker::publish`] does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishBehavior {
    Accept,
    Reject(PublishStatus),
    Error,
}

#[derive(Debug, Clone, Copy)]
struct Script {
    /// Connect code reported when background processing starts; `None` stays silent
    ack_on_start: Option<u8>,
    reconnect: ReconnectBehavior,
    publish: PublishBehavior,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            ack_on_start: Some(0),
            reconnect: ReconnectBehavior::Succeed,
            publish: PublishBehavior::Accept,
        }
    }
}

/// Mock broker for testing. Clones share state.
#[derive(Clone, Default)]
pub struct MockBroker {
    listener: Arc<Mutex<Option<Arc<dyn ConnectionListener>>>>,
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    calls: Arc<Mutex<Vec<BrokerCall>>>,
    script: Arc<Mutex<Script>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that never answers the initial connect
    pub fn unreachable() -> Self {
        let script = Script {
            ack_on_start: None,
            reconnect: ReconnectBehavior::Fail,
            ..Script::default()
        };
        Self {
            script: Arc::new(Mutex::new(script)),
            ..Self::default()
        }
    }

    pub async fn set_ack_on_start(&self, code: Option<u8>) {
        self.script.lock().await.ack_on_start = code;
    }

    pub async fn set_reconnect_behavior(&self, behavior: ReconnectBehavior) {
        self.script.lock().await.reconnect = behavior;
    }

    pub async fn set_publish_behavior(&self, behavior: PublishBehavior) {
        self.script.lock().await.publish = behavior;
    }

    /// Fire the disconnect callback as the network task would
    pub async fn simulate_disconnect(&self, code: u8) {
        if let Some(listener) = self.listener.lock().await.as_ref() {
            listener.on_disconnected(code);
        }
    }

    /// Fire the connect callback as the network task would
    pub async fn simulate_connect(&self, code: u8) {
        if let Some(listener) = self.listener.lock().await.as_ref() {
            listener.on_connected(code);
        }
    }

    pub async fn get_published_messages(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    pub async fn get_calls(&self) -> Vec<BrokerCall> {
        self.calls.lock().await.clone()
    }

    pub async fn count_calls(&self, call: BrokerCall) -> usize {
        self.calls.lock().await.iter().filter(|c| **c == call).count()
    }

    pub async fn clear_history(&self) {
        self.published.lock().await.clear();
        self.calls.lock().await.clear();
    }

    async fn record(&self, call: BrokerCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl Broker for MockBroker {
    type Error = SimulatorError;

    async fn connect(&mut self, listener: Arc<dyn ConnectionListener>) -> Result<(), Self::Error> {
        self.record(BrokerCall::Connect).await;
        *self.listener.lock().await = Some(listener);
        Ok(())
    }

    async fn start_background_processing(&mut self) -> Result<(), Self::Error> {
        self.record(BrokerCall::StartBackgroundProcessing).await;
        let ack = self.script.lock().await.ack_on_start;
        if let Some(code) = ack {
            self.simulate_connect(code).await;
        }
        Ok(())
    }

    async fn stop_background_processing(&mut self) {
        self.record(BrokerCall::StopBackgroundProcessing).await;
    }

    async fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.record(BrokerCall::Reconnect).await;
        let behavior = self.script.lock().await.reconnect;
        match behavior {
            ReconnectBehavior::Fail => Err(SimulatorError::internal("mock broker unreachable")),
            ReconnectBehavior::Succeed => {
                self.simulate_connect(0).await;
                Ok(())
            }
            ReconnectBehavior::AcceptWithoutAck => Ok(()),
        }
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<PublishStatus, Self::Error> {
        self.record(BrokerCall::Publish).await;
        self.published.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload,
            guarantee,
            retain,
        });

        let behavior = self.script.lock().await.publish;
        match behavior {
            PublishBehavior::Accept => Ok(PublishStatus::Success),
            PublishBehavior::Reject(status) => Ok(status),
            PublishBehavior::Error => Err(SimulatorError::internal("mock publish failure")),
        }
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.record(BrokerCall::Disconnect).await;
        self.simulate_disconnect(0).await;
        Ok(())
    }
}
