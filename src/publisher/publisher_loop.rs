//! Fixed-interval publish cycle with bounded explicit reconnects
//!
//! The loop owns the generator state and the connection state. The broker's
//! network task only reaches it through [`ConnectionStatus`] callbacks.

use super::policy::{ReconnectDecision, ReconnectPolicy};
use super::status::ConnectionStatus;
use crate::config::SimulatorConfig;
use crate::error::{SimulatorError, SimulatorResult};
use crate::sensor::{GeneratorState, ReadingGenerator, SensorReading};
use crate::transport::{Broker, ConnectionListener, DeliveryGuarantee, PublishStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};

/// How long startup waits for the first successful connect callback
pub const INITIAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long an explicit reconnect waits for the connect callback
pub const RECONNECT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs of the loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopTimings {
    /// Sleep between ticks
    pub interval: Duration,
    /// Startup ceiling for the first connection
    pub connect_timeout: Duration,
    /// Wait for the connect callback after an explicit reconnect
    pub reconnect_timeout: Duration,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            connect_timeout: INITIAL_CONNECT_TIMEOUT,
            reconnect_timeout: RECONNECT_ACK_TIMEOUT,
        }
    }
}

/// Result of handing one reading to the broker
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// Accepted; `count` is the running number of accepted readings
    Delivered { count: u64 },
    /// Broker client answered with a non-success status
    Rejected(PublishStatus),
    /// Broker client returned an error
    Failed(String),
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Published {
        reading: SensorReading,
        outcome: PublishOutcome,
    },
    /// Attempt ceiling exceeded; nothing published this tick
    ReconnectExhausted { attempts: u32 },
    /// Explicit reconnect failed; wait `backoff` instead of the interval
    ReconnectFailed { attempt: u32, backoff: Duration },
}

impl TickOutcome {
    /// Delay before the next tick. A failed reconnect's backoff replaces the interval.
    pub fn next_delay(&self, interval: Duration) -> Duration {
        match self {
            TickOutcome::ReconnectFailed { backoff, .. } => *backoff,
            _ => interval,
        }
    }
}

/// Publisher loop driving a [`Broker`]
pub struct PublisherLoop<B: Broker> {
    broker: B,
    status: Arc<ConnectionStatus>,
    generator: ReadingGenerator,
    state: GeneratorState,
    topic: String,
    timings: LoopTimings,
    reconnect_policy: ReconnectPolicy,
    published: u64,
}

impl<B: Broker> PublisherLoop<B> {
    pub fn new(broker: B, config: &SimulatorConfig) -> Self {
        let baseline = config.simulation.baseline();
        Self {
            broker,
            status: Arc::new(ConnectionStatus::new()),
            generator: ReadingGenerator::new(baseline),
            state: GeneratorState::new(&baseline),
            topic: config.mqtt.topic.clone(),
            timings: LoopTimings {
                interval: config.simulation.interval(),
                ..LoopTimings::default()
            },
            reconnect_policy: ReconnectPolicy::default(),
            published: 0,
        }
    }

    pub fn with_timings(mut self, timings: LoopTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = policy;
        self
    }

    pub fn status(&self) -> &Arc<ConnectionStatus> {
        &self.status
    }

    pub fn generator_state(&self) -> GeneratorState {
        self.state
    }

    /// Readings the broker accepted so far
    pub fn published_count(&self) -> u64 {
        self.published
    }

    pub fn timings(&self) -> &LoopTimings {
        &self.timings
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Connect and wait for the first successful connect callback.
    ///
    /// Fails with [`SimulatorError::InitialConnectionTimeout`] if the broker
    /// does not accept the connection within the startup ceiling.
    pub async fn start(&mut self) -> SimulatorResult<()> {
        info!("Starting pool metrics simulator");
        self.status.mark_connecting();

        let listener: Arc<dyn ConnectionListener> = self.status.clone();
        self.broker
            .connect(listener)
            .await
            .map_err(SimulatorError::transport)?;
        self.broker
            .start_background_processing()
            .await
            .map_err(SimulatorError::transport)?;

        let waited = self.timings.connect_timeout;
        if !self.status.wait_until_connected(waited).await {
            error!("Could not establish initial connection within {:?}", waited);
            return Err(SimulatorError::InitialConnectionTimeout { waited });
        }

        info!("Sending readings to topic '{}'", self.topic);
        Ok(())
    }

    /// Run one cycle: reconnect if needed, then generate and publish a reading.
    ///
    /// Publish failures are logged and reported in the outcome. Only a payload
    /// that cannot be serialized is returned as an error.
    pub async fn tick(&mut self) -> SimulatorResult<TickOutcome> {
        if !self.status.is_connected() {
            warn!("Connection lost, trying to reconnect");
            if let Some(skipped) = self.attempt_reconnect().await {
                return Ok(skipped);
            }
        }

        let angle = self.state.advance();
        let (reading, raw_ph) = self.generator.generate(self.state.previous_ph, angle);
        // Trend continuity follows generated values, delivered or not
        self.state.previous_ph = raw_ph;

        let payload = reading.to_json_bytes()?;
        let outcome = self.publish_payload(&reading, payload).await;

        Ok(TickOutcome::Published { reading, outcome })
    }

    /// Returns `Some` when this tick must skip publishing
    async fn attempt_reconnect(&mut self) -> Option<TickOutcome> {
        let attempt = self.status.begin_reconnect();
        info!("Reconnect attempt #{}", attempt);

        match self.reconnect_policy.decide(attempt) {
            ReconnectDecision::Exhausted { attempts } => {
                error!(
                    "Maximum reconnect attempts reached ({})",
                    self.reconnect_policy.max_attempts
                );
                Some(TickOutcome::ReconnectExhausted { attempts })
            }
            ReconnectDecision::Attempt { attempt } => {
                self.status.mark_connecting();
                let failure = match self.broker.reconnect().await {
                    Err(e) => Some(e.to_string()),
                    Ok(()) => {
                        let waited = self.timings.reconnect_timeout;
                        if self.status.wait_for_connect_outcome(waited).await {
                            None
                        } else {
                            Some(format!("connection not accepted within {:?}", waited))
                        }
                    }
                };

                let Some(reason) = failure else {
                    return None;
                };
                self.status.abandon_connecting();
                let backoff = self.reconnect_policy.backoff_delay(attempt);
                error!("Reconnect failed: {}", reason);
                info!("Waiting {:?} before the next attempt", backoff);
                Some(TickOutcome::ReconnectFailed { attempt, backoff })
            }
        }
    }

    async fn publish_payload(
        &mut self,
        reading: &SensorReading,
        payload: Vec<u8>,
    ) -> PublishOutcome {
        let result = self
            .broker
            .publish(&self.topic, payload, DeliveryGuarantee::AtLeastOnce, false)
            .await;

        match result {
            Ok(PublishStatus::Success) => {
                self.published += 1;
                info!(
                    "Reading #{} sent - pH: {}, Temp: {}°C",
                    self.published, reading.ph, reading.temperature_c
                );
                PublishOutcome::Delivered {
                    count: self.published,
                }
            }
            Ok(status) => {
                error!("Failed to publish reading. Code: {}", status.code());
                PublishOutcome::Rejected(status)
            }
            Err(e) => {
                error!("Error while publishing reading: {}", e);
                PublishOutcome::Failed(e.to_string())
            }
        }
    }

    /// Tick until shutdown is requested. A dropped sender counts as a request.
    pub async fn run(&mut self, shutdown: &mut watch::Receiver<bool>) -> SimulatorResult<()> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.tick().await?;
            let delay = outcome.next_delay(self.timings.interval);
            if !sleep_or_shutdown(shutdown, delay).await {
                break;
            }
        }

        info!("Stopping simulator");
        Ok(())
    }

    /// Stop the network task and disconnect. Errors are logged, never returned.
    pub async fn shutdown(&mut self) {
        self.status.mark_shutting_down();
        self.broker.stop_background_processing().await;
        if let Err(e) = self.broker.disconnect().await {
            warn!("Error while disconnecting from broker: {}", e);
        }
        info!("Simulator finished");
    }

    /// Full lifecycle: start, run until shutdown, then clean up.
    ///
    /// Cleanup runs on every path, including startup failure.
    pub async fn execute(&mut self, mut shutdown: watch::Receiver<bool>) -> SimulatorResult<()> {
        let span = crate::lifecycle_span!(topic = %self.topic);

        async {
            let started = tokio::select! {
                result = self.start() => Some(result),
                _ = wait_for_shutdown(&mut shutdown) => {
                    info!("Shutdown requested during startup");
                    None
                }
            };

            let result = match started {
                Some(Ok(())) => self.run(&mut shutdown).await,
                Some(Err(e)) => Err(e),
                None => Ok(()),
            };

            if let Err(e) = &result {
                error!("Simulator stopped with error: {}", e);
            }
            self.shutdown().await;
            result
        }
        .instrument(span)
        .await
    }
}

/// Sleep for `delay`. Returns false if shutdown was requested first.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return false;
                }
            }
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // Err means the sender is gone, which also ends the wait
    let _ = shutdown.wait_for(|requested| *requested).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_uses_backoff_after_failed_reconnect() {
        let interval = Duration::from_secs(10);
        let failed = TickOutcome::ReconnectFailed {
            attempt: 2,
            backoff: Duration::from_secs(10),
        };
        assert_eq!(failed.next_delay(Duration::from_secs(1)), Duration::from_secs(10));

        let exhausted = TickOutcome::ReconnectExhausted { attempts: 6 };
        assert_eq!(exhausted.next_delay(interval), interval);
    }

    #[test]
    fn test_default_timings() {
        let timings = LoopTimings::default();
        assert_eq!(timings.interval, Duration::from_secs(10));
        assert_eq!(timings.connect_timeout, Duration::from_secs(10));
        assert_eq!(timings.reconnect_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sleep_completes_without_shutdown() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(sleep_or_shutdown(&mut rx, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let started = std::time::Instant::now();
        assert!(!sleep_or_shutdown(&mut rx, Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sleep_ends_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(!sleep_or_shutdown(&mut rx, Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_returns_on_signal() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(&mut rx))
            .await
            .unwrap();
    }
}
