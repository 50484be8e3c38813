//! Shared connection state between the broker's network task and the loop
//!
//! Both fields live behind one `watch` channel, so every transition is a
//! single atomic update and waiters are woken without polling.

use crate::transport::ConnectionListener;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle phase of the broker link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; no callback moves the link out of this phase
    ShuttingDown,
}

/// Snapshot of the link as seen by the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    pub phase: ConnectionPhase,
    pub reconnect_attempts: u32,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            reconnect_attempts: 0,
        }
    }
}

/// Connection state owned by the publisher loop and updated by broker callbacks
#[derive(Debug)]
pub struct ConnectionStatus {
    state: watch::Sender<LinkState>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LinkState::default());
        Self { state }
    }

    pub fn snapshot(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.borrow().phase
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == ConnectionPhase::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.state.borrow().reconnect_attempts
    }

    /// Subscribe to every state change
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Connect request issued, at startup or for an explicit reconnect
    pub fn mark_connecting(&self) {
        self.state.send_if_modified(|state| {
            if state.phase == ConnectionPhase::Disconnected {
                state.phase = ConnectionPhase::Connecting;
                true
            } else {
                false
            }
        });
    }

    /// Count one more explicit reconnect attempt and return its number
    pub fn begin_reconnect(&self) -> u32 {
        let mut attempt = 0;
        self.state.send_modify(|state| {
            state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
            attempt = state.reconnect_attempts;
        });
        attempt
    }

    /// Give up on a pending connect that never got an answer
    pub fn abandon_connecting(&self) {
        self.state.send_if_modified(|state| {
            if state.phase == ConnectionPhase::Connecting {
                state.phase = ConnectionPhase::Disconnected;
                true
            } else {
                false
            }
        });
    }

    pub fn mark_shutting_down(&self) {
        self.state.send_modify(|state| state.phase = ConnectionPhase::ShuttingDown);
    }

    /// Wait until a successful connect callback arrives, bounded by `timeout`.
    ///
    /// Returns true if the link is up.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        let mut receiver = self.state.subscribe();
        let connected = receiver.wait_for(|state| state.phase == ConnectionPhase::Connected);

        let reached = matches!(tokio::time::timeout(timeout, connected).await, Ok(Ok(_)));
        reached
    }

    /// Wait for a pending connect to be answered, bounded by `timeout`.
    ///
    /// Unlike [`wait_until_connected`](Self::wait_until_connected) this returns
    /// early on a refusal. Returns true only if the link came up.
    pub async fn wait_for_connect_outcome(&self, timeout: Duration) -> bool {
        let mut receiver = self.state.subscribe();
        let answered = receiver.wait_for(|state| state.phase != ConnectionPhase::Connecting);

        let connected = match tokio::time::timeout(timeout, answered).await {
            Ok(Ok(state)) => state.phase == ConnectionPhase::Connected,
            _ => false,
        };
        connected
    }
}

impl ConnectionListener for ConnectionStatus {
    fn on_connected(&self, code: u8) {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.phase == ConnectionPhase::ShuttingDown {
                return false;
            }
            if code == 0 {
                state.phase = ConnectionPhase::Connected;
                state.reconnect_attempts = 0;
                accepted = true;
            } else {
                state.phase = ConnectionPhase::Disconnected;
            }
            true
        });

        if accepted {
            info!("Connected to MQTT broker");
        } else if code != 0 {
            error!("MQTT connection refused. Code: {}", code);
        }
    }

    fn on_disconnected(&self, code: u8) {
        self.state.send_if_modified(|state| {
            if state.phase == ConnectionPhase::ShuttingDown
                || state.phase == ConnectionPhase::Disconnected
            {
                return false;
            }
            state.phase = ConnectionPhase::Disconnected;
            true
        });

        if code != 0 {
            warn!("Unexpected disconnection from MQTT broker (code {})", code);
        } else {
            info!("Disconnected from MQTT broker");
        }
    }

    fn on_publish_ack(&self, message_id: u16) {
        debug!("Message published. ID: {}", message_id);
    }
}
