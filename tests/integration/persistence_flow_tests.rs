//! Debounced persistence through the tick loop: mutations → quiet period →
//! one NVS flush → reload on the next boot.

use bionicflower::adapters::nvs::NvsAdapter;
use bionicflower::app::commands::AppCommand;
use bionicflower::config::Color;
use bionicflower::shared::EffectMode;
use bionicflower::{FlowerService, SharedLightState};

use crate::mock_hw::{MockFlower, RecordingSink};

const TICK_MS: u64 = 100;
/// Keys written by one full save.
const KEYS_PER_SAVE: u32 = 15;

fn boot<'a>(shared: &'a SharedLightState, nvs: &NvsAdapter) -> (FlowerService<'a>, MockFlower, RecordingSink) {
    let mut svc = FlowerService::with_defaults(shared);
    svc.load_persisted_state(nvs);
    let mut hw = MockFlower::new();
    let mut sink = RecordingSink::new();
    svc.start(&mut hw, &mut sink).unwrap();
    sink.clear();
    (svc, hw, sink)
}

fn tick(svc: &mut FlowerService<'_>, hw: &mut MockFlower, nvs: &mut NvsAdapter, sink: &mut RecordingSink, counter: u32) {
    hw.advance(TICK_MS);
    svc.tick(hw, nvs, sink, true, counter);
}

#[test]
fn first_boot_keeps_defaults_and_writes_nothing() {
    let shared = SharedLightState::new();
    let mut nvs = NvsAdapter::new();
    let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

    assert_eq!(shared.brightness(), 255);
    assert_eq!(shared.effect_mode(), EffectMode::RainbowMulti);
    assert!(shared.is_light_on());
    assert_eq!(svc.configuration().color, Color::new(0, 145, 220));

    for counter in 1..=60 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(sink.saves(), 0);
    assert_eq!(nvs.write_count(), 0);
    assert!(!svc.is_save_pending());
}

#[test]
fn burst_of_mutations_is_saved_once_after_the_quiet_period() {
    let shared = SharedLightState::new();
    let mut nvs = NvsAdapter::new();
    let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

    shared.set_effect_mode(EffectMode::Rainbow);
    for i in 1..=10u8 {
        shared.set_brightness(100 + i);
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, u32::from(i));
    }
    assert!(svc.is_save_pending());

    // Last mutation at tick 10; the quiet period ends at tick 40.
    for counter in 11..=39 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(sink.saves(), 0);
    assert_eq!(nvs.write_count(), 0);

    tick(&mut svc, &mut hw, &mut nvs, &mut sink, 40);
    assert_eq!(sink.saves(), 1);
    assert_eq!(nvs.write_count(), KEYS_PER_SAVE);
    assert!(!svc.is_save_pending());

    for counter in 41..=80 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(sink.saves(), 1);
}

#[test]
fn saved_state_survives_a_reboot() {
    let mut nvs = NvsAdapter::new();
    {
        let shared = SharedLightState::new();
        let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

        svc.handle_command(AppCommand::SetColor(Color::new(12, 34, 56)), &mut hw, &mut sink);
        shared.set_brightness(42);
        shared.set_adaptive_brightness_enabled(false);
        for counter in 1..=35 {
            tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
        }
        assert_eq!(sink.saves(), 1);
    }

    let shared = SharedLightState::new();
    let (svc, _hw, _sink) = boot(&shared, &nvs);
    assert_eq!(svc.configuration().color, Color::new(12, 34, 56));
    assert_eq!(shared.effect_mode(), EffectMode::None);
    assert_eq!(shared.brightness(), 42);
    assert!(!shared.snapshot().adaptive_brightness_enabled);
    assert!(!svc.is_save_pending());
}

#[test]
fn failed_save_stays_pending_and_retries() {
    let shared = SharedLightState::new();
    let mut nvs = NvsAdapter::with_capacity(3);
    let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

    shared.set_brightness(7);
    tick(&mut svc, &mut hw, &mut nvs, &mut sink, 1);
    for counter in 2..=31 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    // Three keys fit, the fourth fails.
    assert_eq!(sink.saves(), 0);
    assert_eq!(nvs.write_count(), 3);
    assert!(svc.is_save_pending());

    // Nothing is retried before another quiet period has passed.
    for counter in 32..=60 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(nvs.write_count(), 3);

    tick(&mut svc, &mut hw, &mut nvs, &mut sink, 61);
    assert_eq!(nvs.write_count(), 6);
    assert_eq!(sink.saves(), 0);
    assert!(svc.is_save_pending());
}

#[test]
fn explicit_save_clears_the_debounce() {
    let shared = SharedLightState::new();
    let mut nvs = NvsAdapter::new();
    let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

    shared.set_light_on(false);
    tick(&mut svc, &mut hw, &mut nvs, &mut sink, 1);
    assert!(svc.is_save_pending());

    svc.save_persisted_state(&mut nvs).unwrap();
    assert_eq!(nvs.write_count(), KEYS_PER_SAVE);
    assert!(!svc.is_save_pending());

    for counter in 2..=50 {
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(sink.saves(), 0);
    assert_eq!(nvs.write_count(), KEYS_PER_SAVE);
}

#[test]
fn weather_and_preview_updates_are_not_saved() {
    let shared = SharedLightState::new();
    let mut nvs = NvsAdapter::new();
    let (mut svc, mut hw, mut sink) = boot(&shared, &nvs);

    let mut counter = 0;
    for (weather, hour) in [("rainy", 6), ("cloudy", 14), ("snowy", -1)] {
        shared.set_weather_state(weather);
        shared.set_circadian_preview_hour(hour);
        for _ in 0..40 {
            counter += 1;
            tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
        }
        assert!(!svc.is_save_pending());
    }
    assert_eq!(sink.saves(), 0);
    assert_eq!(nvs.write_count(), 0);

    // A persisted field still arms the debounce.
    shared.set_brightness(90);
    for _ in 0..31 {
        counter += 1;
        tick(&mut svc, &mut hw, &mut nvs, &mut sink, counter);
    }
    assert_eq!(sink.saves(), 1);
    assert_eq!(nvs.write_count(), KEYS_PER_SAVE);
}
