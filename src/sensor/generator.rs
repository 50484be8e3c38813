//! Reading synthesis: a slow sine wave per metric plus bounded uniform jitter
//!
//! The generator holds only the baselines. The previous pH and the phase
//! angle are passed in by the caller on every call, so repeated calls with the
//! same inputs differ only by jitter.

use super::reading::{round2, SensorReading, Trend};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Radians the phase angle advances per publish tick
pub const PHASE_STEP: f64 = 0.2;

pub const PH_AMPLITUDE: f64 = 0.15;
pub const PH_JITTER: f64 = 0.05;

pub const TEMP_AMPLITUDE: f64 = 1.5;
pub const TEMP_JITTER: f64 = 0.3;
const TEMP_PERIOD_DIVISOR: f64 = 3.0;

pub const TDS_AMPLITUDE: f64 = 30.0;
pub const TDS_JITTER: f64 = 10.0;
const TDS_PERIOD_DIVISOR: f64 = 4.0;

/// Baseline values the synthetic waves oscillate around
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub ph_base: f64,
    pub temp_base_c: f64,
    pub tds_base_ppm: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            ph_base: 7.4,
            temp_base_c: 25.0,
            tds_base_ppm: 500.0,
        }
    }
}

/// State carried across ticks by the publisher.
///
/// `phase_angle` grows without bound; it only feeds `sin`, which is well
/// defined for any finite float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorState {
    pub previous_ph: f64,
    pub phase_angle: f64,
}

impl GeneratorState {
    /// Fresh state: previous pH at the baseline, phase at zero
    pub fn new(baseline: &BaselineConfig) -> Self {
        Self {
            previous_ph: baseline.ph_base,
            phase_angle: 0.0,
        }
    }

    /// Advance the phase by one step and return the new angle
    pub fn advance(&mut self) -> f64 {
        self.phase_angle += PHASE_STEP;
        self.phase_angle
    }
}

/// Pure reading generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingGenerator {
    baseline: BaselineConfig,
}

impl ReadingGenerator {
    pub fn new(baseline: BaselineConfig) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &BaselineConfig {
        &self.baseline
    }

    /// Produce a reading and the unrounded pH to carry forward.
    pub fn generate(&self, previous_ph: f64, phase_angle: f64) -> (SensorReading, f64) {
        self.generate_with(&mut rand::thread_rng(), previous_ph, phase_angle, Utc::now())
    }

    /// Same as [`generate`](Self::generate) with an explicit jitter source and clock
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        previous_ph: f64,
        phase_angle: f64,
        now: DateTime<Utc>,
    ) -> (SensorReading, f64) {
        let base = &self.baseline;

        let ph = base.ph_base
            + PH_AMPLITUDE * phase_angle.sin()
            + rng.gen_range(-PH_JITTER..=PH_JITTER);
        let temperature = base.temp_base_c
            + TEMP_AMPLITUDE * (phase_angle / TEMP_PERIOD_DIVISOR).sin()
            + rng.gen_range(-TEMP_JITTER..=TEMP_JITTER);
        let tds = base.tds_base_ppm
            + TDS_AMPLITUDE * (phase_angle / TDS_PERIOD_DIVISOR).sin()
            + rng.gen_range(-TDS_JITTER..=TDS_JITTER);

        // Trend uses the raw delta; rounding first would hide small moves
        let trend = Trend::classify(ph - previous_ph);

        let reading = SensorReading {
            ph: round2(ph),
            temperature_c: round2(temperature),
            tds_ppm: tds.round() as i64,
            trend,
            timestamp: now,
        };

        (reading, ph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPSILON: f64 = 1e-9;

    proptest! {
        #[test]
        fn generated_values_stay_within_bounds(
            seed in any::<u64>(),
            angle in -1.0e6f64..1.0e6,
            previous in 0.0f64..14.0,
        ) {
            let generator = ReadingGenerator::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let (reading, raw_ph) = generator.generate_with(&mut rng, previous, angle, Utc::now());

            let ph_span = PH_AMPLITUDE + PH_JITTER;
            prop_assert!((reading.ph - 7.4).abs() <= ph_span + EPSILON, "ph out of range: {}", reading.ph);
            prop_assert!((raw_ph - 7.4).abs() <= ph_span + EPSILON, "raw ph out of range: {}", raw_ph);

            let temp_span = TEMP_AMPLITUDE + TEMP_JITTER;
            prop_assert!((reading.temperature_c - 25.0).abs() <= temp_span + EPSILON);

            let tds_span = TDS_AMPLITUDE + TDS_JITTER;
            prop_assert!(((reading.tds_ppm as f64) - 500.0).abs() <= tds_span + 0.5);
        }

        #[test]
        fn trend_follows_unrounded_delta(seed in any::<u64>(), angle in 0.0f64..100.0, previous in 7.0f64..7.8) {
            let generator = ReadingGenerator::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let (reading, raw_ph) = generator.generate_with(&mut rng, previous, angle, Utc::now());
            prop_assert_eq!(reading.trend, Trend::classify(raw_ph - previous));
        }
    }

    #[test]
    fn test_reading_is_rounded_from_carried_value() {
        let generator = ReadingGenerator::default();
        let (reading, raw_ph) = generator.generate(7.4, 0.2);
        assert_eq!(reading.ph, round2(raw_ph));
        assert_eq!(reading.temperature_c, round2(reading.temperature_c));
    }

    #[test]
    fn test_custom_baseline_shifts_values() {
        let generator = ReadingGenerator::new(BaselineConfig {
            ph_base: 6.8,
            temp_base_c: 30.0,
            tds_base_ppm: 1200.0,
        });
        let (reading, _) = generator.generate(6.8, 1.0);

        assert!((reading.ph - 6.8).abs() <= 0.2 + EPSILON);
        assert!((reading.temperature_c - 30.0).abs() <= 1.8 + EPSILON);
        assert!((reading.tds_ppm - 1200).abs() <= 41);
    }

    #[test]
    fn test_large_phase_angle_is_finite() {
        let generator = ReadingGenerator::default();
        let (reading, raw_ph) = generator.generate(7.4, 1.0e12);
        assert!(raw_ph.is_finite());
        assert!(reading.temperature_c.is_finite());
    }

    #[test]
    fn test_generator_state_advances_by_fixed_step() {
        let mut state = GeneratorState::new(&BaselineConfig::default());
        assert_eq!(state.previous_ph, 7.4);
        assert_eq!(state.phase_angle, 0.0);

        let first = state.advance();
        let second = state.advance();
        let third = state.advance();

        assert!((first - 0.2).abs() < EPSILON);
        assert!((second - 0.4).abs() < EPSILON);
        assert!((third - 0.6).abs() < EPSILON);
    }

    #[test]
    fn test_generate_uses_supplied_clock() {
        let generator = ReadingGenerator::default();
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(7);
        let (reading, _) = generator.generate_with(&mut rng, 7.4, 0.4, now);
        assert_eq!(reading.timestamp, now);
    }
}
