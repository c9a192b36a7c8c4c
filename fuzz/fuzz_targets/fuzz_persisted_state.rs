//! Fuzz target: `PersistedState::load`
//!
//! Writes arbitrary bytes under every persisted key and loads them back.
//! A corrupted store must never panic, never activate two effect modes and
//! never yield an out-of-range configuration.
//!
//! cargo fuzz run fuzz_persisted_state

#![no_main]

use bionicflower::adapters::nvs::NvsAdapter;
use bionicflower::app::ports::StoragePort;
use bionicflower::config::Configuration;
use bionicflower::persistence::{NAMESPACE, PersistedState, keys};
use bionicflower::shared::{LightState, SharedLightState};
use libfuzzer_sys::fuzz_target;

const KEYS: [&str; 15] = [
    keys::MOTOR_POSITION,
    keys::SPEED,
    keys::LOWER_THRESHOLD,
    keys::UPPER_THRESHOLD,
    keys::DISTANCE_THRESHOLD,
    keys::AUTONOMOUS,
    keys::COLOR,
    keys::LIGHT_ON,
    keys::BRIGHTNESS,
    keys::RAINBOW,
    keys::RAINBOW_MULTI,
    keys::CIRCADIAN,
    keys::WEATHER,
    keys::SENSOR,
    keys::ADAPTIVE,
];

fuzz_target!(|data: &[u8]| {
    let mut nvs = NvsAdapter::new();
    // Spread the input across the keys, a few bytes each.
    for (key, chunk) in KEYS.iter().zip(data.chunks(4)) {
        let _ = nvs.write(NAMESPACE, key, chunk);
    }

    let current = PersistedState::capture(&Configuration::default(), &LightState::default());
    let loaded = PersistedState::load(&nvs, current);

    let c = loaded.config;
    for v in [
        c.motor_position,
        c.speed,
        c.lower_brightness_threshold,
        c.upper_brightness_threshold,
        c.distance_threshold,
    ] {
        assert!((0.0..=1.0).contains(&v), "unsanitised value {v}");
    }
    assert!(c.lower_brightness_threshold <= c.upper_brightness_threshold);

    let shared = SharedLightState::new();
    loaded.apply_to(&shared);
    assert_eq!(shared.mode_flags().active_count(), 1);
});
