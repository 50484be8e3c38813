//! Integration Tests for Startup When the Broker is Down
//!
//! Points the real MQTT client at a closed local port:
//! - the publisher must report the startup timeout instead of hanging
//! - no reading may be published
//! - an explicit reconnect must fail fast so the loop can back off

use poolsim::config::{MqttSection, SimulatorConfig};
use poolsim::publisher::{LoopTimings, PublisherLoop};
use poolsim::transport::mqtt::{MqttBroker, MqttError};
use poolsim::transport::{Broker, DeliveryGuarantee, PublishStatus};
use poolsim::ConnectionStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

fn closed_port_section() -> MqttSection {
    MqttSection {
        host: "127.0.0.1".to_string(),
        // Port 1 is reserved and nothing listens on it in test environments
        port: 1,
        ..MqttSection::default()
    }
}

#[tokio::test]
async fn test_startup_times_out_when_broker_unavailable() {
    let mut config = SimulatorConfig::default();
    config.mqtt = closed_port_section();

    let broker = MqttBroker::new(config.mqtt.clone());
    let mut publisher = PublisherLoop::new(broker, &config).with_timings(LoopTimings {
        interval: Duration::from_millis(50),
        connect_timeout: Duration::from_millis(500),
        ..LoopTimings::default()
    });
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let start = Instant::now();
    let result = publisher.execute(shutdown_rx).await;

    let error = result.expect_err("startup should fail without a broker");
    assert!(error.is_startup_timeout(), "unexpected error: {error}");
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(publisher.published_count(), 0);
    assert!(!publisher.broker().is_processing());
}

#[tokio::test]
async fn test_explicit_reconnect_fails_fast() {
    let mut broker = MqttBroker::new(closed_port_section());
    broker
        .connect(Arc::new(ConnectionStatus::new()))
        .await
        .unwrap();
    broker.start_background_processing().await.unwrap();

    let result = broker.reconnect().await;
    assert!(matches!(result, Err(MqttError::Unreachable { .. })));

    let status = broker
        .publish(
            "pool/metrics",
            b"{}".to_vec(),
            DeliveryGuarantee::AtLeastOnce,
            false,
        )
        .await
        .unwrap();
    assert_eq!(status, PublishStatus::NotConnected);

    broker.stop_background_processing().await;
    broker.disconnect().await.unwrap();
}
