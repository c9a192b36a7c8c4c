//! Touch gestures end to end: mirrored pads → recognizer → shared state →
//! light state publications.

use bionicflower::adapters::nvs::NvsAdapter;
use bionicflower::shared::EffectMode;
use bionicflower::{FlowerService, SharedLightState};

use crate::mock_hw::{MockFlower, RecordingSink};

const TICK_MS: u64 = 100;

struct Rig<'a> {
    svc: FlowerService<'a>,
    hw: MockFlower,
    nvs: NvsAdapter,
    sink: RecordingSink,
    counter: u32,
    connected: bool,
}

impl<'a> Rig<'a> {
    fn new(shared: &'a SharedLightState) -> Self {
        let mut svc = FlowerService::with_defaults(shared);
        let mut hw = MockFlower::new();
        let mut sink = RecordingSink::new();
        svc.start(&mut hw, &mut sink).unwrap();
        sink.clear();
        Self {
            svc,
            hw,
            nvs: NvsAdapter::new(),
            sink,
            counter: 0,
            connected: true,
        }
    }

    /// Hold the given pads for `ms`, one tick every 100 ms.
    fn hold(&mut self, left: bool, right: bool, ms: u64) {
        self.hw.touch(left, right);
        for _ in 0..ms / TICK_MS {
            self.counter += 1;
            self.hw.advance(TICK_MS);
            self.svc
                .tick(&mut self.hw, &mut self.nvs, &mut self.sink, self.connected, self.counter);
        }
    }

    fn release(&mut self) {
        self.hold(false, false, 2 * TICK_MS);
    }

    fn tap_right(&mut self) {
        self.hold(false, true, 2 * TICK_MS);
        self.release();
    }

    fn tap_left(&mut self) {
        self.hold(true, false, 2 * TICK_MS);
        self.release();
    }
}

#[test]
fn long_press_right_raises_brightness_exactly_once() {
    let shared = SharedLightState::new();
    shared.set_brightness(100);
    let mut rig = Rig::new(&shared);

    // Held from tick 1 (t0) through t0 + 1100 ms.
    rig.hold(false, true, 1_200);
    assert_eq!(shared.brightness(), 125);
    assert_eq!(rig.sink.light_reports(), 1);

    // No tap on release after a long press.
    rig.release();
    assert_eq!(shared.brightness(), 125);
    assert_eq!(shared.effect_mode(), EffectMode::RainbowMulti);
}

#[test]
fn long_press_fires_at_the_threshold_not_before() {
    let shared = SharedLightState::new();
    shared.set_brightness(100);
    let mut rig = Rig::new(&shared);

    // Ticks at t0 .. t0 + 400 ms.
    rig.hold(false, true, 500);
    assert_eq!(shared.brightness(), 100);

    // t0 + 500 ms.
    rig.hold(false, true, 100);
    assert_eq!(shared.brightness(), 125);
}

#[test]
fn long_press_left_dims_but_never_to_zero() {
    let shared = SharedLightState::new();
    shared.set_brightness(10);
    let mut rig = Rig::new(&shared);

    rig.hold(true, false, 800);
    rig.release();
    assert_eq!(shared.brightness(), 1);

    rig.hold(true, false, 800);
    rig.release();
    assert_eq!(shared.brightness(), 1);
    // The second press changed nothing, so nothing was published.
    assert_eq!(rig.sink.light_reports(), 1);
}

#[test]
fn taps_walk_the_mode_ring() {
    let shared = SharedLightState::new();
    shared.set_effect_mode(EffectMode::Weather);
    let mut rig = Rig::new(&shared);

    rig.tap_right();
    assert_eq!(shared.effect_mode(), EffectMode::SensorAutonomous);
    rig.tap_right();
    assert_eq!(shared.effect_mode(), EffectMode::None);
    rig.tap_left();
    assert_eq!(shared.effect_mode(), EffectMode::SensorAutonomous);
    assert_eq!(shared.mode_flags().active_count(), 1);

    // One publication per change.
    assert_eq!(rig.sink.light_reports(), 3);
}

#[test]
fn dual_touch_toggles_the_light_without_taps() {
    let shared = SharedLightState::new();
    let mut rig = Rig::new(&shared);

    rig.hold(true, true, 800);
    rig.release();
    assert!(!shared.is_light_on());
    assert_eq!(shared.effect_mode(), EffectMode::RainbowMulti);
    assert_eq!(shared.brightness(), 255);
    assert!(rig.hw.last_frame_is_black());

    rig.hold(true, true, 200);
    rig.release();
    assert!(shared.is_light_on());
    assert_eq!(rig.sink.light_reports(), 2);
}

#[test]
fn gestures_still_apply_offline() {
    let shared = SharedLightState::new();
    let mut rig = Rig::new(&shared);
    rig.connected = false;

    rig.tap_right();
    assert_eq!(shared.effect_mode(), EffectMode::Circadian);
    assert_eq!(rig.sink.light_reports(), 0);
}

#[test]
fn losing_the_touch_sensor_cancels_a_press() {
    let shared = SharedLightState::new();
    shared.set_brightness(100);
    let mut rig = Rig::new(&shared);

    rig.hold(false, true, 300);
    rig.hw.touch_connected = false;
    rig.hold(false, true, 800);
    assert_eq!(shared.brightness(), 100);

    rig.hw.touch_connected = true;
    rig.release();
    assert_eq!(shared.effect_mode(), EffectMode::RainbowMulti);
}
