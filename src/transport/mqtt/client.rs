//! Impure I/O operations for the MQTT broker client
//!
//! This module owns the `rumqttc` client and drives its event loop in a
//! spawned task. Connection status flows back to the publisher through the
//! [`ConnectionListener`] callbacks; nothing here blocks the publish cycle.

use super::connection::{
    configure_mqtt_options, AutoReconnectPolicy, MqttError, REACHABILITY_CHECK_TIMEOUT,
    REQUEST_CHANNEL_CAPACITY,
};
use super::message_handler::{EventRoute, MessageHandler, DISCONNECT_UNEXPECTED};
use crate::config::MqttSection;
use crate::transport::{Broker, ConnectionListener, DeliveryGuarantee, PublishStatus};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ClientError, ConnectionError, Event, EventLoop, Outgoing};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// How long shutdown waits for the network task or the DISCONNECT flush
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT 3.1.1 broker client backed by `rumqttc`
pub struct MqttBroker {
    config: MqttSection,
    auto_reconnect: AutoReconnectPolicy,
    client: Option<AsyncClient>,
    // EventLoop is Send but not Sync; the mutex makes the broker shareable
    event_loop: Mutex<Option<EventLoop>>,
    listener: Option<Arc<dyn ConnectionListener>>,
    link_up: Arc<AtomicBool>,
    reconnect_now: Arc<Notify>,
    shutdown_tx: Option<watch::Sender<bool>>,
    event_loop_handle: Option<JoinHandle<EventLoop>>,
}

impl MqttBroker {
    pub fn new(config: MqttSection) -> Self {
        Self {
            config,
            auto_reconnect: AutoReconnectPolicy::default(),
            client: None,
            event_loop: Mutex::new(None),
            listener: None,
            link_up: Arc::new(AtomicBool::new(false)),
            reconnect_now: Arc::new(Notify::new()),
            shutdown_tx: None,
            event_loop_handle: None,
        }
    }

    /// Override the background task's automatic retry policy
    pub fn with_auto_reconnect(mut self, policy: AutoReconnectPolicy) -> Self {
        self.auto_reconnect = policy;
        self
    }

    /// Whether the background task currently holds an acknowledged connection
    pub fn is_link_up(&self) -> bool {
        self.link_up.load(Ordering::SeqCst)
    }

    /// Whether the network task is running
    pub fn is_processing(&self) -> bool {
        self.event_loop_handle.is_some()
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Check that the broker accepts TCP connections at all
    async fn check_reachability(&self) -> Result<(), MqttError> {
        let address = (self.config.host.as_str(), self.config.port);
        let unreachable = |reason: String| MqttError::Unreachable {
            host: self.config.host.clone(),
            port: self.config.port,
            reason,
        };

        match tokio::time::timeout(REACHABILITY_CHECK_TIMEOUT, TcpStream::connect(address)).await
        {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(unreachable(e.to_string())),
            Err(_) => Err(unreachable(format!(
                "no answer within {REACHABILITY_CHECK_TIMEOUT:?}"
            ))),
        }
    }

    /// Background network task. Returns the event loop so a final DISCONNECT
    /// can still be flushed after the task stops.
    async fn run_event_loop(
        mut event_loop: EventLoop,
        listener: Arc<dyn ConnectionListener>,
        link_up: Arc<AtomicBool>,
        reconnect_now: Arc<Notify>,
        policy: AutoReconnectPolicy,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> EventLoop {
        let mut failures = 0u32;

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping MQTT network task");
                        break;
                    }
                }

                event_result = event_loop.poll() => {
                    match event_result {
                        Ok(event) => {
                            if Self::process_event_route(
                                MessageHandler::route_event(&event),
                                listener.as_ref(),
                                &link_up,
                            ) {
                                failures = 0;
                            }
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            Self::handle_event_loop_error(e, listener.as_ref(), &link_up);

                            let delay = policy.delay_for(failures);
                            debug!(
                                "Automatic reconnect attempt {} in {:?}",
                                failures, delay
                            );
                            if !Self::interruptible_sleep(&mut shutdown_rx, &reconnect_now, delay).await {
                                info!("Shutdown signal received during reconnect delay, stopping");
                                break;
                            }
                        }
                    }
                }
            }
        }

        event_loop
    }

    /// Dispatch a routed event to the listener.
    /// Returns true when the event confirmed a live connection.
    fn process_event_route(
        route: EventRoute,
        listener: &dyn ConnectionListener,
        link_up: &AtomicBool,
    ) -> bool {
        match route {
            EventRoute::ConnectionAcknowledged { code } => {
                link_up.store(code == 0, Ordering::SeqCst);
                listener.on_connected(code);
                code == 0
            }
            EventRoute::PublishAcknowledged { message_id } => {
                listener.on_publish_ack(message_id);
                false
            }
            EventRoute::Disconnected { code } => {
                link_up.store(false, Ordering::SeqCst);
                listener.on_disconnected(code);
                false
            }
            EventRoute::InfrastructureEvent(event) => {
                tracing::trace!(target: "mqtt_transport", "MQTT event: {}", event);
                false
            }
            EventRoute::OutgoingEvent => false,
        }
    }

    fn handle_event_loop_error(
        error: ConnectionError,
        listener: &dyn ConnectionListener,
        link_up: &AtomicBool,
    ) {
        if let ConnectionError::ConnectionRefused(code) = error {
            link_up.store(false, Ordering::SeqCst);
            listener.on_connected(MessageHandler::connack_code(code));
            return;
        }

        if link_up.swap(false, Ordering::SeqCst) {
            listener.on_disconnected(DISCONNECT_UNEXPECTED);
            error!("MQTT event loop error: {}", error);
        } else {
            warn!("MQTT connection attempt failed: {}", error);
        }
    }

    /// Sleep for `delay` unless shutdown or an explicit reconnect cuts it short.
    /// Returns false if shutdown was requested.
    async fn interruptible_sleep(
        shutdown_rx: &mut watch::Receiver<bool>,
        reconnect_now: &Notify,
        delay: Duration,
    ) -> bool {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                changed.is_ok() && !*shutdown_rx.borrow()
            }
            _ = reconnect_now.notified() => {
                debug!("Explicit reconnect requested, retrying immediately");
                true
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Cut the network task's retry delay short.
    ///
    /// Only a task already sleeping is woken. No permit is stored, so a
    /// request that lands mid-poll leaves the next automatic delay intact.
    fn request_retry(&self) {
        self.reconnect_now.notify_waiters();
    }

    /// Poll the stopped event loop until the DISCONNECT packet leaves
    async fn flush_disconnect(event_loop: &mut EventLoop) {
        let flush = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!("Event loop closed while flushing disconnect: {}", e);
                        break;
                    }
                }
            }
        };

        if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, flush)
            .await
            .is_err()
        {
            warn!("DISCONNECT not flushed within {:?}", GRACEFUL_SHUTDOWN_TIMEOUT);
        }
    }
}

#[async_trait]
impl Broker for MqttBroker {
    type Error = MqttError;

    async fn connect(&mut self, listener: Arc<dyn ConnectionListener>) -> Result<(), MqttError> {
        if self.event_loop_handle.is_some() {
            return Err(MqttError::AlreadyRunning);
        }

        info!("Connecting to MQTT broker at {}", self.endpoint());
        let mqtt_options = configure_mqtt_options(&self.config);
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        self.client = Some(client);
        *self.event_loop.get_mut() = Some(event_loop);
        self.listener = Some(listener);
        self.link_up.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn start_background_processing(&mut self) -> Result<(), MqttError> {
        if self.event_loop_handle.is_some() {
            return Err(MqttError::AlreadyRunning);
        }
        let listener = self.listener.clone().ok_or(MqttError::NotStarted)?;
        let event_loop = self
            .event_loop
            .get_mut()
            .take()
            .ok_or(MqttError::NotStarted)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let span = crate::mqtt_span!(endpoint = %self.endpoint());
        let handle = tokio::spawn(
            Self::run_event_loop(
                event_loop,
                listener,
                self.link_up.clone(),
                self.reconnect_now.clone(),
                self.auto_reconnect.clone(),
                shutdown_rx,
            )
            .instrument(span),
        );
        self.event_loop_handle = Some(handle);
        debug!("MQTT network task started");
        Ok(())
    }

    async fn stop_background_processing(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        let Some(handle) = self.event_loop_handle.take() else {
            return;
        };

        match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(event_loop)) => {
                *self.event_loop.get_mut() = Some(event_loop);
                info!("MQTT network task stopped");
            }
            Ok(Err(e)) => {
                warn!("MQTT network task ended with error: {}", e);
            }
            Err(_) => {
                // Dropping the handle detaches the task; the closed shutdown
                // channel makes it exit on its next wake-up
                warn!("MQTT network task didn't stop gracefully");
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), MqttError> {
        if self.client.is_none() {
            return Err(MqttError::NotStarted);
        }

        self.check_reachability().await?;
        info!("Broker {} reachable, retrying connection now", self.endpoint());
        self.request_retry();
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        guarantee: DeliveryGuarantee,
        retain: bool,
    ) -> Result<PublishStatus, MqttError> {
        let client = self.client.as_ref().ok_or(MqttError::NotStarted)?;

        if !self.is_link_up() {
            return Ok(PublishStatus::NotConnected);
        }

        let qos = MessageHandler::determine_qos(guarantee);
        match client.try_publish(topic, qos, retain, payload) {
            Ok(()) => Ok(PublishStatus::Success),
            Err(ClientError::TryRequest(_)) => Ok(PublishStatus::QueueFull),
            Err(e) => Err(MqttError::PublishFailed(Box::new(e))),
        }
    }

    async fn disconnect(&mut self) -> Result<(), MqttError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        let was_up = self.link_up.swap(false, Ordering::SeqCst);
        if was_up {
            match client.try_disconnect() {
                Ok(()) => {
                    if let Some(event_loop) = self.event_loop.get_mut().as_mut() {
                        Self::flush_disconnect(event_loop).await;
                    }
                }
                Err(e) => warn!("Could not queue DISCONNECT, dropping the session: {}", e),
            }
        }

        if let Some(listener) = &self.listener {
            listener.on_disconnected(super::message_handler::DISCONNECT_REQUESTED);
        }
        *self.event_loop.get_mut() = None;
        info!("MQTT client disconnected from {}", self.endpoint());
        Ok(())
    }
}
