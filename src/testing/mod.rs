//! Testing utilities and mock implementations
//!
//! Lets the publisher loop be exercised without a running MQTT broker.

pub mod mocks;

pub use mocks::*;
