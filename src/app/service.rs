//! Application service — the hexagonal core.
//!
//! [`FlowerService`] is the top-level context: it owns the configuration,
//! sensor fusion, motor state machine, gesture recognizer, effect engine and
//! save debounce, and holds a non-owning reference to the
//! [`SharedLightState`] it shares with the transport.  All I/O flows through
//! port traits injected at call sites, so the whole service runs against
//! mock adapters on the host.
//!
//! ```text
//!  LightSensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  TouchSensorPort ──▶ │      FlowerService       │ ──▶ LedStripPort
//!        ClockPort ──▶ │ fusion · motor · effects │ ──▶ MotorPort
//! SharedLightState ◀──▶└──────────────────────────┘ ◀─▶ StoragePort
//! ```

use log::{debug, info, warn};

use crate::config::{Color, Configuration, MOTOR_POSITION_CLOSED, MOTOR_POSITION_OPEN, Tunables};
use crate::control::adaptive_brightness::AdaptiveBrightness;
use crate::control::motor::{MotorController, MotorSpeed, MoveOutcome};
use crate::effects::{EffectEngine, RenderInput};
use crate::error::{CalibrationError, StorageError};
use crate::gestures::{self, GestureRecognizer};
use crate::persistence::{self, PersistedState, SaveDebounce};
use crate::sensors::{SensorData, SensorFusion};
use crate::shared::{EffectMode, SharedLightState};

use super::commands::{AppCommand, CoverCommand};
use super::events::{AppEvent, CoverStateReport, LightStateReport, SensorKind};
use super::ports::{EventSink, FlowerHardware, MotorPort, StoragePort};

/// Start-up colour sequence, each shown for [`SELF_TEST_STEP_MS`].
const SELF_TEST_COLORS: [Color; 3] = [
    Color::new(0, 255, 0),
    Color::new(255, 0, 0),
    Color::new(0, 0, 255),
];
const SELF_TEST_STEP_MS: u32 = 500;

// ───────────────────────────────────────────────────────────────
// FlowerService
// ───────────────────────────────────────────────────────────────

pub struct FlowerService<'a> {
    shared: &'a SharedLightState,
    config: Configuration,
    tunables: Tunables,
    sensors: SensorFusion,
    motor: MotorController,
    gestures: GestureRecognizer,
    effects: EffectEngine,
    adaptive: AdaptiveBrightness,
    save: SaveDebounce,
    /// Set by core-side mutations; turned into a save request on the next tick.
    config_dirty: bool,
    /// Last `SharedLightState` persisted revision folded into the save debounce.
    seen_revision: u32,
}

impl<'a> FlowerService<'a> {
    /// Construct the service.  Does **not** touch hardware: call
    /// [`load_persisted_state`](Self::load_persisted_state) and
    /// [`start`](Self::start) next.
    pub fn new(shared: &'a SharedLightState, config: Configuration, tunables: Tunables) -> Self {
        Self {
            shared,
            config: config.sanitized(),
            sensors: SensorFusion::new(&tunables),
            motor: MotorController::new(),
            gestures: GestureRecognizer::new(),
            effects: EffectEngine::new(tunables.led_count),
            adaptive: AdaptiveBrightness::new(),
            save: SaveDebounce::new(),
            config_dirty: false,
            seen_revision: shared.persisted_revision(),
            tunables,
        }
    }

    pub fn with_defaults(shared: &'a SharedLightState) -> Self {
        Self::new(shared, Configuration::default(), Tunables::default())
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Probe the sensors, run the LED self-test and home the petals.
    ///
    /// Blocks until the driver reports calibrated.  Only fails when a
    /// `calibration_timeout_ms` is configured and runs out.
    pub fn start(
        &mut self,
        hw: &mut impl FlowerHardware,
        sink: &mut impl EventSink,
    ) -> Result<(), CalibrationError> {
        info!("flower core starting ({} LEDs)", self.tunables.led_count);

        self.sensors.init(hw);
        let data = *self.sensors.data();
        sink.emit(&AppEvent::SensorPresence {
            sensor: SensorKind::Light,
            present: data.has_light_sensor,
        });
        sink.emit(&AppEvent::SensorPresence {
            sensor: SensorKind::Touch,
            present: data.has_touch_sensor,
        });

        for color in SELF_TEST_COLORS {
            hw.show(self.effects.solid(color));
            hw.delay_ms(SELF_TEST_STEP_MS);
        }
        hw.show(self.effects.solid(self.config.color));

        if let Err(e) = self.motor.calibrate(hw, &self.tunables) {
            warn!("start aborted: {e}");
            return Err(e);
        }
        self.config.motor_position = MotorController::position_from_driver(hw, &self.tunables);

        sink.emit(&AppEvent::Started);
        info!("flower core started");
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.
    ///
    /// Order: motor (every `motor_tick_divisor`-th tick) or sensors → touch
    /// gestures → adaptive brightness and effect rendering → effect motor
    /// target → LED output → debounced save.  Light and cover publications
    /// are dropped while `has_external_connection` is false.
    pub fn tick(
        &mut self,
        hw: &mut impl FlowerHardware,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
        has_external_connection: bool,
        tick_counter: u32,
    ) {
        let now_ms = hw.now_ms();

        // 1. Motor and sensors alternate.
        if tick_counter % self.tunables.motor_tick_divisor.max(1) == 0 {
            self.update_motor(hw, sink, has_external_connection);
        } else {
            self.update_sensors(hw, sink);
        }

        // 2. Touch gestures mutate the shared state.
        self.update_gestures(now_ms, sink, has_external_connection);

        // 3. Render from a fresh snapshot so gesture changes apply this tick.
        let light = self.shared.snapshot();
        let data = *self.sensors.data();
        self.adaptive.update(
            now_ms,
            light.adaptive_brightness_enabled,
            data.has_light_sensor,
            data.brightness,
            &self.tunables,
        );

        let input = RenderInput {
            tick: tick_counter,
            light_on: light.light_on,
            mode: light.mode,
            brightness: self.adaptive.apply(light.brightness),
            color: self.config.color,
            weather_state: light.weather_state.as_str(),
            preview_hour: light.preview_hour(),
            clock: hw.local_time(),
            has_light_sensor: data.has_light_sensor,
            ambient: data.brightness,
            lower_brightness_threshold: self.config.lower_brightness_threshold,
        };
        let output = self.effects.render(&input);
        let motor_target = output.motor_target;

        // 4. LED output.
        hw.show(output.frame);

        // 5. Weather / circadian petal target.
        if let Some(target) = motor_target {
            self.follow_effect_target(hw, target, sink, has_external_connection);
        }

        // 6. Debounced persistence.
        self.flush_pending_save(now_ms, storage, sink);
    }

    fn update_sensors(&mut self, hw: &mut impl FlowerHardware, sink: &mut impl EventSink) {
        let outcome = self.sensors.update(hw, &self.tunables, &mut self.config);

        if let Some(present) = outcome.light_presence_changed {
            sink.emit(&AppEvent::SensorPresence {
                sensor: SensorKind::Light,
                present,
            });
        }
        if let Some(present) = outcome.touch_presence_changed {
            if !present {
                self.gestures.reset();
            }
            sink.emit(&AppEvent::SensorPresence {
                sensor: SensorKind::Touch,
                present,
            });
        }
        if outcome.thresholds_updated {
            self.mark_config_dirty();
            sink.emit(&AppEvent::ThresholdsUpdated {
                lower: self.config.lower_brightness_threshold,
                upper: self.config.upper_brightness_threshold,
            });
        }
    }

    fn update_motor(&mut self, hw: &mut impl MotorPort, sink: &mut impl EventSink, connected: bool) {
        if !self.motor.is_calibrated() {
            return;
        }

        self.config.motor_position = MotorController::position_from_driver(hw, &self.tunables);

        if !self.autonomous_policy_active(self.shared.effect_mode()) {
            return;
        }

        let before = self.motor.intended_position();
        let decision = self.motor.run_autonomous(
            hw,
            self.sensors.data(),
            self.sensors.is_warmed_up(),
            &self.config,
            &self.tunables,
        );
        debug!("autonomous: {decision:?}");

        let target = self.motor.intended_position();
        if decision.moved() && target != before {
            self.config.motor_position = target;
            if connected {
                sink.emit(&AppEvent::CoverState(CoverStateReport::from_position(target)));
            }
        }
    }

    /// Sensor mode always drives the petals from the sensors; the legacy
    /// autonomy flag does so unless weather or circadian owns the target.
    fn autonomous_policy_active(&self, mode: EffectMode) -> bool {
        match mode {
            EffectMode::SensorAutonomous => true,
            EffectMode::Weather | EffectMode::Circadian => false,
            _ => self.config.is_autonomous,
        }
    }

    fn update_gestures(&mut self, now_ms: u64, sink: &mut impl EventSink, connected: bool) {
        let data = *self.sensors.data();
        if !data.has_touch_sensor {
            self.gestures.reset();
            return;
        }

        let recognised = self
            .gestures
            .update(data.touch_left, data.touch_right, now_ms, &self.tunables);
        for gesture in recognised {
            debug!("gesture: {gesture:?}");
            if gestures::apply(gesture, self.shared, &self.tunables) && connected {
                sink.emit(&AppEvent::LightState(self.light_report()));
            }
        }
    }

    fn follow_effect_target(
        &mut self,
        hw: &mut impl MotorPort,
        target: f32,
        sink: &mut impl EventSink,
        connected: bool,
    ) {
        if (self.config.motor_position - target).abs() <= self.tunables.effect_move_epsilon {
            return;
        }

        self.config.motor_position = target;
        let outcome = self.motor.move_to(hw, target, MotorSpeed::Fast, &self.tunables);
        if matches!(outcome, MoveOutcome::Started { .. }) {
            info!("effect moves petals to {target:.2}");
            self.mark_config_dirty();
            if connected {
                sink.emit(&AppEvent::CoverState(CoverStateReport::from_position(target)));
            }
        }
    }

    fn flush_pending_save(&mut self, now_ms: u64, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        let revision = self.shared.persisted_revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.config_dirty = true;
        }
        if self.config_dirty {
            self.config_dirty = false;
            self.save.request(now_ms);
        }

        if !self.save.is_due(now_ms, &self.tunables) {
            return;
        }
        let state = PersistedState::capture(&self.config, &self.shared.snapshot());
        if persistence::flush_if_due(&mut self.save, now_ms, &self.tunables, storage, &state) {
            sink.emit(&AppEvent::StateSaved);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (broker, web UI, serial console).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        motor: &mut impl MotorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::Cover(cover) => {
                let position = match cover {
                    CoverCommand::Open => MOTOR_POSITION_OPEN,
                    CoverCommand::Close => MOTOR_POSITION_CLOSED,
                    CoverCommand::Stop => {
                        self.motor.stop(motor);
                        MotorController::position_from_driver(motor, &self.tunables)
                    }
                    CoverCommand::Position(percent) => f32::from(percent.min(100)) / 100.0,
                };
                info!("cover command {cover:?} -> {position:.2}");
                let next = Configuration {
                    motor_position: position,
                    speed: 1.0,
                    ..self.config
                };
                self.set_configuration(next, motor);
                sink.emit(&AppEvent::CoverState(CoverStateReport::from_position(
                    self.config.motor_position,
                )));
            }
            AppCommand::SetAutonomous(automatic) => {
                let next = Configuration {
                    is_autonomous: automatic,
                    ..self.config
                };
                self.set_configuration(next, motor);
                sink.emit(&AppEvent::AutonomyMode { automatic });
            }
            AppCommand::SetColor(color) => {
                self.shared.set_effect_mode(EffectMode::None);
                let next = Configuration { color, ..self.config };
                self.set_configuration(next, motor);
                sink.emit(&AppEvent::LightState(self.light_report()));
            }
            AppCommand::Light(light) => {
                let mut next = self.config;
                if let Some(mode) = light.effect_mode() {
                    self.shared.set_effect_mode(mode);
                }
                if let Some(brightness) = light.brightness {
                    self.shared.set_brightness(brightness);
                }
                if let Some(color) = light.color_over(next.color) {
                    self.shared.set_effect_mode(EffectMode::None);
                    next.color = color;
                }
                if let Some(on) = light.light_on() {
                    self.shared.set_light_on(on);
                }
                self.set_configuration(next, motor);
                sink.emit(&AppEvent::LightState(self.light_report()));
            }
            AppCommand::ResetSensorWarmup => self.reset_sensor_warmup(),
        }
    }

    // ── Configuration ─────────────────────────────────────────

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// Switching autonomy off stops the motor.  A change of autonomy or
    /// colour is a control change and suppresses any position move in the
    /// same call; otherwise a new position or speed in manual mode moves the
    /// petals.  Out-of-range values are clamped.
    pub fn set_configuration(&mut self, config: Configuration, motor: &mut impl MotorPort) {
        let next = config.sanitized();
        let previous = self.config;
        if next == previous {
            return;
        }

        let mut control_changed = false;
        if next.is_autonomous != previous.is_autonomous {
            control_changed = true;
            info!("autonomy {}", if next.is_autonomous { "on" } else { "off" });
            if !next.is_autonomous {
                self.motor.stop(motor);
            }
        }
        if next.color != previous.color {
            control_changed = true;
        }

        self.config = next;

        let motion_changed =
            next.motor_position != previous.motor_position || next.speed != previous.speed;
        if motion_changed && !next.is_autonomous && !control_changed {
            let speed = MotorSpeed::from_unit(next.speed);
            self.motor.move_to(motor, next.motor_position, speed, &self.tunables);
        }

        self.mark_config_dirty();
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    // ── Sensors ───────────────────────────────────────────────

    pub fn sensor_data(&self) -> &SensorData {
        self.sensors.data()
    }

    pub fn is_sensor_warmed_up(&self) -> bool {
        self.sensors.is_warmed_up()
    }

    /// Restart the ambient warm-up.
    pub fn reset_sensor_warmup(&mut self) {
        self.sensors.reset_warmup();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn motor(&self) -> &MotorController {
        &self.motor
    }

    /// Current adaptive brightness factor (out of 255).
    pub fn adaptive_factor(&self) -> u8 {
        self.adaptive.factor()
    }

    pub fn light_report(&self) -> LightStateReport {
        LightStateReport::new(&self.shared.snapshot(), &self.config)
    }

    pub fn cover_report(&self) -> CoverStateReport {
        CoverStateReport::from_position(self.config.motor_position)
    }

    /// Whether a debounced save is waiting for its quiet period.
    pub fn is_save_pending(&self) -> bool {
        self.config_dirty || self.save.is_pending()
    }

    // ── Persistence ───────────────────────────────────────────

    /// Overlay the stored state onto the configuration and the shared light
    /// state.  An empty store leaves everything at its defaults.
    pub fn load_persisted_state(&mut self, storage: &impl StoragePort) {
        let current = PersistedState::capture(&self.config, &self.shared.snapshot());
        let loaded = PersistedState::load(storage, current);
        self.config = loaded.config;
        loaded.apply_to(self.shared);
        self.seen_revision = self.shared.persisted_revision();
        info!(
            "persisted state loaded: effect={} light={} brightness={}",
            EffectMode::from_flags(&loaded.modes).name(),
            loaded.light_on,
            loaded.brightness
        );
    }

    /// Write the state now.  The tick loop normally does this through the
    /// debounce; call directly only before a planned power-down.
    pub fn save_persisted_state(&mut self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let state = PersistedState::capture(&self.config, &self.shared.snapshot());
        state.save(storage)?;
        self.config_dirty = false;
        self.seen_revision = self.shared.persisted_revision();
        self.save.clear();
        Ok(())
    }

    fn mark_config_dirty(&mut self) {
        self.config_dirty = true;
    }
}
