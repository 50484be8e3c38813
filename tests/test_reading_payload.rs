//! Wire payload checks for generated readings

use poolsim::sensor::{BaselineConfig, GeneratorState, ReadingGenerator, Trend};
use regex::Regex;
use serde_json::Value;

fn timestamp_pattern() -> Regex {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$").unwrap()
}

#[test]
fn test_payload_has_exactly_the_wire_fields() {
    let generator = ReadingGenerator::new(BaselineConfig::default());
    let (reading, _) = generator.generate(7.4, 0.2);

    let value: Value = serde_json::from_slice(&reading.to_json_bytes().unwrap()).unwrap();
    let object = value.as_object().unwrap();

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["ph", "tds_ppm", "temperature_c", "timestamp", "trend", "trend_value"]
    );
    assert!(object["tds_ppm"].is_i64());
    assert!(object["ph"].is_f64());
}

#[test]
fn test_timestamp_always_matches_utc_second_format() {
    let pattern = timestamp_pattern();
    let generator = ReadingGenerator::default();
    let mut state = GeneratorState::new(generator.baseline());

    for _ in 0..50 {
        let angle = state.advance();
        let (reading, raw_ph) = generator.generate(state.previous_ph, angle);
        state.previous_ph = raw_ph;

        let payload = reading.to_payload();
        assert!(
            pattern.is_match(&payload.timestamp),
            "bad timestamp {}",
            payload.timestamp
        );
    }
}

#[test]
fn test_trend_label_and_value_agree() {
    let generator = ReadingGenerator::default();
    let mut state = GeneratorState::new(generator.baseline());

    for _ in 0..100 {
        let angle = state.advance();
        let (reading, raw_ph) = generator.generate(state.previous_ph, angle);
        state.previous_ph = raw_ph;

        let value: Value = serde_json::from_slice(&reading.to_json_bytes().unwrap()).unwrap();
        let expected = match value["trend"].as_str().unwrap() {
            "subiendo" => 1,
            "bajando" => -1,
            "estable" => 0,
            other => panic!("unexpected trend label {other}"),
        };
        assert_eq!(value["trend_value"].as_i64().unwrap(), expected);
    }
}

#[test]
fn test_trend_dead_band_examples() {
    assert_eq!(Trend::classify(0.02), Trend::Rising);
    assert_eq!(Trend::classify(-0.02), Trend::Falling);
    assert_eq!(Trend::classify(0.0), Trend::Stable);
    assert_eq!(Trend::classify(0.009), Trend::Stable);
}

#[test]
fn test_custom_baseline_shifts_readings() {
    let baseline = BaselineConfig {
        ph_base: 6.8,
        temp_base_c: 30.0,
        tds_base_ppm: 1200.0,
    };
    let generator = ReadingGenerator::new(baseline);
    let (reading, _) = generator.generate(6.8, 1.0);

    assert!((reading.ph - 6.8).abs() <= 0.2 + 1e-9);
    assert!((reading.temperature_c - 30.0).abs() <= 1.8 + 1e-9);
    assert!((reading.tds_ppm - 1200).abs() <= 40);
}
