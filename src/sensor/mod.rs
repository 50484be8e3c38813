//! Synthetic pool sensor readings
//!
//! This module contains the pure reading generator and the value types it
//! produces. Nothing here performs I/O; the publisher owns the carried-forward
//! state and hands it in on every tick.

pub mod generator;
pub mod reading;

pub use generator::{BaselineConfig, GeneratorState, ReadingGenerator, PHASE_STEP};
pub use reading::{ReadingPayload, SensorReading, Trend, TREND_DEAD_BAND};
