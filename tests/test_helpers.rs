//! Test helpers and utilities for integration tests

use poolsim::config::SimulatorConfig;
use poolsim::publisher::{LoopTimings, PublisherLoop};
use poolsim::sensor::ReadingPayload;
use poolsim::testing::MockBroker;
use std::time::Duration;

/// Default configuration with a one-second publish interval
#[allow(dead_code)]
pub fn test_config() -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    config.simulation.interval_secs = 1;
    config
}

/// Timings short enough for tests to run in milliseconds
#[allow(dead_code)]
pub fn fast_timings() -> LoopTimings {
    LoopTimings {
        interval: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(200),
        reconnect_timeout: Duration::from_millis(200),
    }
}

/// Publisher wired to a mock broker; the returned broker shares its state
#[allow(dead_code)]
pub fn mock_publisher(broker: &MockBroker) -> PublisherLoop<MockBroker> {
    PublisherLoop::new(broker.clone(), &test_config()).with_timings(fast_timings())
}

/// Decode a published body back into the wire payload
#[allow(dead_code)]
pub fn decode_payload(payload: &[u8]) -> ReadingPayload {
    serde_json::from_slice(payload).expect("published payload should be valid JSON")
}
