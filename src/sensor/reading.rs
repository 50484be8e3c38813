//! Sensor reading value types and the JSON wire payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// pH deltas inside this band (inclusive) are reported as stable
pub const TREND_DEAD_BAND: f64 = 0.01;

/// Timestamp layout published on the wire: second precision, literal `Z`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Direction of the pH value relative to the previous tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "subiendo")]
    Rising,
    #[serde(rename = "bajando")]
    Falling,
    #[serde(rename = "estable")]
    Stable,
}

impl Trend {
    /// Classify an unrounded pH delta against the dead-band
    pub fn classify(delta: f64) -> Self {
        if delta > TREND_DEAD_BAND {
            Trend::Rising
        } else if delta < -TREND_DEAD_BAND {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Signed mirror of the trend: +1, -1 or 0
    pub fn value(self) -> i8 {
        match self {
            Trend::Rising => 1,
            Trend::Falling => -1,
            Trend::Stable => 0,
        }
    }

    /// Label used in the wire payload
    pub fn label(self) -> &'static str {
        match self {
            Trend::Rising => "subiendo",
            Trend::Falling => "bajando",
            Trend::Stable => "estable",
        }
    }
}

/// One synthesized reading. Built fresh every tick and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// pH, rounded to 2 decimals
    pub ph: f64,
    /// Water temperature in °C, rounded to 2 decimals
    pub temperature_c: f64,
    /// Total dissolved solids in ppm
    pub tds_ppm: i64,
    pub trend: Trend,
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// Timestamp rendered as `YYYY-MM-DDTHH:MM:SSZ`
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Wire representation of this reading
    pub fn to_payload(&self) -> ReadingPayload {
        ReadingPayload {
            ph: self.ph,
            temperature_c: self.temperature_c,
            tds_ppm: self.tds_ppm,
            trend: self.trend,
            trend_value: self.trend.value(),
            timestamp: self.timestamp_string(),
        }
    }

    /// Serialize to the UTF-8 JSON body published to the broker
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_payload())
    }
}

/// JSON body published on the metrics topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub ph: f64,
    pub temperature_c: f64,
    pub tds_ppm: i64,
    pub trend: Trend,
    pub trend_value: i8,
    pub timestamp: String,
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
