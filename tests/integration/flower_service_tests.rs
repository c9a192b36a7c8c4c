//! Integration tests for the FlowerService tick pipeline:
//! sensors → motor → effects → LED ring, driven through the mock flower.

use std::ops::RangeInclusive;

use bionicflower::adapters::nvs::NvsAdapter;
use bionicflower::app::commands::{AppCommand, CoverCommand, LightCommand};
use bionicflower::app::events::{AppEvent, CoverState, SensorKind};
use bionicflower::app::ports::Direction;
use bionicflower::config::{Color, Configuration, Tunables};
use bionicflower::error::CalibrationError;
use bionicflower::shared::EffectMode;
use bionicflower::{FlowerService, SharedLightState};
use smart_leds::RGB8;

use crate::mock_hw::{MockFlower, MotorCall, RecordingSink};

const TICK_MS: u64 = 100;

fn started(shared: &SharedLightState) -> (FlowerService<'_>, MockFlower, NvsAdapter, RecordingSink) {
    let mut svc = FlowerService::with_defaults(shared);
    let mut hw = MockFlower::new();
    let mut sink = RecordingSink::new();
    svc.start(&mut hw, &mut sink).unwrap();
    sink.clear();
    (svc, hw, NvsAdapter::new(), sink)
}

fn run(
    svc: &mut FlowerService<'_>,
    hw: &mut MockFlower,
    nvs: &mut NvsAdapter,
    sink: &mut RecordingSink,
    ticks: RangeInclusive<u32>,
) {
    for counter in ticks {
        hw.advance(TICK_MS);
        svc.tick(hw, nvs, sink, true, counter);
    }
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_runs_self_test_then_calibrates() {
    let shared = SharedLightState::new();
    let mut svc = FlowerService::with_defaults(&shared);
    let mut hw = MockFlower::new();
    let mut sink = RecordingSink::new();

    svc.start(&mut hw, &mut sink).unwrap();

    let firsts: Vec<RGB8> = hw.frames.iter().map(|f| f[0]).collect();
    assert_eq!(
        firsts,
        vec![
            RGB8::new(0, 255, 0),
            RGB8::new(255, 0, 0),
            RGB8::new(0, 0, 255),
            RGB8::new(0, 145, 220),
        ]
    );
    assert!(hw.frames.iter().all(|f| f.len() == 12));
    assert!(svc.motor().is_calibrated());
    // 3 × 500 ms self-test + 2020 ms travel wait.
    assert_eq!(hw.delayed_ms, 3_520);
    assert_eq!(sink.events.last(), Some(&AppEvent::Started));
}

#[test]
fn start_reports_missing_sensors() {
    let shared = SharedLightState::new();
    let mut svc = FlowerService::with_defaults(&shared);
    let mut hw = MockFlower::without_sensors();
    let mut sink = RecordingSink::new();

    svc.start(&mut hw, &mut sink).unwrap();
    assert!(sink.events.contains(&AppEvent::SensorPresence {
        sensor: SensorKind::Light,
        present: false,
    }));
    assert!(!svc.sensor_data().has_touch_sensor);
}

#[test]
fn start_fails_when_calibration_times_out() {
    let shared = SharedLightState::new();
    let tunables = Tunables {
        calibration_timeout_ms: Some(3_000),
        ..Default::default()
    };
    let mut svc = FlowerService::new(&shared, Configuration::default(), tunables);
    let mut hw = MockFlower::never_calibrating();
    let mut sink = RecordingSink::new();

    let err = svc.start(&mut hw, &mut sink).unwrap_err();
    assert!(matches!(err, CalibrationError::Timeout { waited_ms } if waited_ms >= 3_000));
    assert!(!svc.motor().is_calibrated());
    assert!(!sink.events.contains(&AppEvent::Started));
}

// ── Sensor fusion ─────────────────────────────────────────────

#[test]
fn warmup_of_twenty_samples_sets_thresholds() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    hw.set_ambient(0.05);
    svc.reset_sensor_warmup();
    assert!(!svc.is_sensor_warmed_up());

    // Ticks 1..=22 contain 19 sensor ticks (6, 12, 18 drive the motor).
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=22);
    assert_eq!(svc.configuration().upper_brightness_threshold, 0.15);
    assert!(!svc.is_sensor_warmed_up());

    run(&mut svc, &mut hw, &mut nvs, &mut sink, 23..=23);
    assert!(svc.is_sensor_warmed_up());
    let cfg = svc.configuration();
    let delta = Tunables::default().threshold_delta;
    assert!((cfg.lower_brightness_threshold - (0.05 - delta).max(0.0)).abs() < 1e-4);
    assert!((cfg.upper_brightness_threshold - (0.05 + delta).min(1.0)).abs() < 1e-4);

    let updates = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::ThresholdsUpdated { .. }))
        .count();
    assert_eq!(updates, 1);
}

#[test]
fn light_sensor_hot_plug_is_reported() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);

    let inits = hw.light_inits;
    hw.light_connected = false;
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=1);
    assert!(!svc.sensor_data().has_light_sensor);
    // The unplug itself triggers a re-init attempt.
    assert_eq!(hw.light_inits, inits + 1);

    hw.light_connected = true;
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 2..=2);
    assert!(svc.sensor_data().has_light_sensor);

    let presence: Vec<bool> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SensorPresence {
                sensor: SensorKind::Light,
                present,
            } => Some(*present),
            _ => None,
        })
        .collect();
    assert_eq!(presence, vec![false, true]);
}

// ── Effects ───────────────────────────────────────────────────

#[test]
fn sensor_mode_darkness_blacks_out_the_ring() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    shared.set_adaptive_brightness_enabled(false);
    shared.set_effect_mode(EffectMode::SensorAutonomous);

    hw.set_ambient(0.02);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=2);
    assert!(hw.last_frame_is_black());

    hw.set_ambient(0.5);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 3..=4);
    assert!(hw.last_frame().iter().all(|c| *c == RGB8::new(0, 145, 220)));
}

#[test]
fn light_off_is_black() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    shared.set_light_on(false);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=3);
    assert!(hw.last_frame_is_black());
}

#[test]
fn adaptive_brightness_dims_in_a_dark_room() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    shared.set_effect_mode(EffectMode::None);
    hw.set_ambient(0.005);

    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=2);
    assert_eq!(svc.adaptive_factor(), Tunables::default().adaptive_min_factor);
    let dimmed = hw.last_frame()[0];
    assert!(dimmed.b < 220 / 10);

    shared.set_adaptive_brightness_enabled(false);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 3..=3);
    assert_eq!(svc.adaptive_factor(), 255);
    assert_eq!(hw.last_frame()[0], RGB8::new(0, 145, 220));
}

#[test]
fn rainy_weather_closes_the_petals_once() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);

    svc.handle_command(AppCommand::Cover(CoverCommand::Open), &mut hw, &mut sink);
    assert_eq!(hw.moves, vec![(Direction::Open, 2000)]);
    sink.clear();

    shared.set_weather_state("rainy");
    shared.set_effect_mode(EffectMode::Weather);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=20);

    assert_eq!(hw.moves, vec![(Direction::Open, 2000), (Direction::Close, 2000)]);
    assert_eq!(svc.configuration().motor_position, 0.0);
    assert_eq!(hw.petal_fraction(), 0.0);
    assert_eq!(sink.cover_reports(), vec![0]);
}

#[test]
fn weather_ignores_targets_within_tolerance() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);

    shared.set_weather_state("cloudy");
    shared.set_effect_mode(EffectMode::Weather);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=12);
    assert_eq!(hw.moves, vec![(Direction::Open, 1000)]);

    // Same target again: no new travel.
    shared.set_weather_state("fog");
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 13..=24);
    assert_eq!(hw.moves.len(), 1);
}

#[test]
fn circadian_preview_drives_the_petals() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);

    shared.set_circadian_preview_hour(12);
    shared.set_effect_mode(EffectMode::Circadian);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=3);
    assert_eq!(hw.moves, vec![(Direction::Open, 2000)]);

    shared.set_circadian_preview_hour(23);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 4..=6);
    assert_eq!(hw.moves.last(), Some(&(Direction::Close, 2000)));
}

// ── Autonomous motor policy ───────────────────────────────────

#[test]
fn sensor_mode_closes_in_the_dark_and_reopens_after_five_cycles() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    svc.handle_command(AppCommand::Cover(CoverCommand::Open), &mut hw, &mut sink);
    shared.set_effect_mode(EffectMode::SensorAutonomous);

    hw.set_ambient(0.02);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=6);
    assert_eq!(hw.moves.last(), Some(&(Direction::Close, 2000)));
    assert_eq!(svc.motor().reopen_cycles(), 5);

    // Bright: five motor ticks are suppressed (12, 18, 24, 30, 36).
    hw.set_ambient(0.5);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 7..=36);
    assert_eq!(svc.motor().reopen_cycles(), 0);
    assert_eq!(hw.moves.len(), 2);

    run(&mut svc, &mut hw, &mut nvs, &mut sink, 37..=42);
    assert_eq!(hw.moves.last(), Some(&(Direction::Open, 2000)));
    assert_eq!(svc.configuration().motor_position, 1.0);
}

#[test]
fn between_thresholds_the_motor_holds() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    shared.set_effect_mode(EffectMode::SensorAutonomous);

    hw.set_ambient(0.1);
    let stops = hw.stop_count();
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=6);
    assert!(hw.moves.is_empty());
    assert_eq!(hw.stop_count(), stops + 1);
}

#[test]
fn legacy_autonomy_yields_to_weather() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    svc.handle_command(AppCommand::SetAutonomous(true), &mut hw, &mut sink);
    shared.set_weather_state("sunny");
    shared.set_effect_mode(EffectMode::Weather);

    // Dark room: the autonomous policy would close, weather wants open.
    hw.set_ambient(0.0);
    run(&mut svc, &mut hw, &mut nvs, &mut sink, 1..=12);
    assert_eq!(hw.moves, vec![(Direction::Open, 2000)]);
    assert_eq!(svc.configuration().motor_position, 1.0);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn cover_commands_move_and_report() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, mut sink) = started(&shared);

    svc.handle_command(AppCommand::Cover(CoverCommand::Position(50)), &mut hw, &mut sink);
    assert_eq!(hw.moves, vec![(Direction::Open, 1000)]);
    assert_eq!(svc.cover_report().state, CoverState::Stopped);

    svc.handle_command(AppCommand::Cover(CoverCommand::Open), &mut hw, &mut sink);
    assert_eq!(hw.moves.last(), Some(&(Direction::Open, 1000)));
    assert_eq!(svc.cover_report().state, CoverState::Open);

    svc.handle_command(AppCommand::Cover(CoverCommand::Close), &mut hw, &mut sink);
    assert_eq!(hw.moves.last(), Some(&(Direction::Close, 2000)));
    assert_eq!(sink.cover_reports(), vec![50, 100, 0]);
}

#[test]
fn cover_stop_halts_at_the_current_position() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, mut sink) = started(&shared);
    svc.handle_command(AppCommand::Cover(CoverCommand::Position(30)), &mut hw, &mut sink);

    let stops = hw.stop_count();
    svc.handle_command(AppCommand::Cover(CoverCommand::Stop), &mut hw, &mut sink);
    assert!(hw.stop_count() > stops);
    assert!((svc.configuration().motor_position - 0.3).abs() < 1e-3);
    assert_eq!(hw.moves.len(), 1);
}

#[test]
fn cover_commands_are_ignored_in_automatic_mode() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, mut sink) = started(&shared);
    svc.handle_command(AppCommand::SetAutonomous(true), &mut hw, &mut sink);
    svc.handle_command(AppCommand::Cover(CoverCommand::Open), &mut hw, &mut sink);
    assert!(hw.moves.is_empty());
}

#[test]
fn slow_speed_uses_the_slow_step_period() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, _sink) = started(&shared);
    let next = Configuration {
        motor_position: 1.0,
        speed: 0.2,
        ..*svc.configuration()
    };
    svc.set_configuration(next, &mut hw);
    assert_eq!(hw.moves, vec![(Direction::Open, 2000)]);
    let slow = Tunables::default().motor_slow_step_period_secs;
    assert!(hw.motor_calls.contains(&MotorCall::Rotate(slow)));
}

#[test]
fn light_command_applies_every_field() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, mut sink) = started(&shared);

    let cmd = LightCommand::from_json(r#"{"state":"OFF","brightness":40,"effect":"Weather"}"#).unwrap();
    svc.handle_command(AppCommand::Light(cmd), &mut hw, &mut sink);
    let s = shared.snapshot();
    assert!(!s.light_on);
    assert_eq!(s.brightness, 40);
    assert_eq!(s.mode, EffectMode::Weather);

    let cmd = LightCommand::from_json(r#"{"color":{"r":255,"g":0,"b":10}}"#).unwrap();
    svc.handle_command(AppCommand::Light(cmd), &mut hw, &mut sink);
    assert_eq!(shared.effect_mode(), EffectMode::None);
    assert_eq!(svc.configuration().color, Color::new(255, 0, 10));

    assert_eq!(sink.light_reports(), 2);
    let json = svc.light_report().to_json().unwrap();
    assert!(json.contains(r#""effect":"None""#));
    assert!(json.contains(r#""state":"OFF""#));
}

#[test]
fn effect_modes_stay_exclusive_across_commands() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, _nvs, mut sink) = started(&shared);

    for effect in ["Weather", "Rainbow", "Sensor", "Circadian", "Bogus"] {
        let cmd = LightCommand::from_json(&format!(r#"{{"effect":"{effect}"}}"#)).unwrap();
        svc.handle_command(AppCommand::Light(cmd), &mut hw, &mut sink);
        assert_eq!(shared.mode_flags().active_count(), 1, "after {effect}");
    }
    assert_eq!(shared.effect_mode(), EffectMode::None);
}

#[test]
fn publications_need_an_external_connection() {
    let shared = SharedLightState::new();
    let (mut svc, mut hw, mut nvs, mut sink) = started(&shared);
    shared.set_weather_state("rainy");
    svc.handle_command(AppCommand::Cover(CoverCommand::Open), &mut hw, &mut sink);
    shared.set_effect_mode(EffectMode::Weather);
    sink.clear();

    for counter in 1..=6 {
        hw.advance(TICK_MS);
        svc.tick(&mut hw, &mut nvs, &mut sink, false, counter);
    }
    assert_eq!(hw.moves.last(), Some(&(Direction::Close, 2000)));
    assert!(sink.cover_reports().is_empty());
}
