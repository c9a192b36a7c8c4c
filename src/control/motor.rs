//! Motor control state machine
//!
//! Owns calibration, the intended petal position and the reopen-cycle
//! counter.  Every motion goes through [`MotorController::move_to`], which
//! stops a running rotation before issuing a different target so the
//! driver never holds more than one outstanding command.

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::app::ports::{Direction, MotorCurrent, MotorPort, SteppingMode};
use crate::config::{Configuration, MOTOR_POSITION_CLOSED, MOTOR_POSITION_OPEN, Tunables};
use crate::error::CalibrationError;
use crate::sensors::SensorData;

/// Step-rate preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSpeed {
    Slow,
    Fast,
}

impl MotorSpeed {
    /// Map a configured speed (0–1) onto a preset.
    ///
    /// The step timer cannot resolve periods between the two presets.
    pub fn from_unit(speed: f32) -> Self {
        if speed < 0.5 { Self::Slow } else { Self::Fast }
    }

    pub fn step_period_secs(self, tunables: &Tunables) -> f32 {
        match self {
            Self::Slow => tunables.motor_slow_step_period_secs,
            Self::Fast => tunables.motor_fast_step_period_secs,
        }
    }
}

/// What [`MotorController::move_to`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The motor is not calibrated yet; nothing was sent.
    NotCalibrated,
    /// Target unchanged; only the rotation speed was re-issued.
    SpeedUpdated,
    /// Target changed but the driver is already within one step of it.
    AlreadyThere,
    /// A new rotation was started.
    Started { direction: Direction, steps: u32 },
}

/// Why the autonomous policy moved the petals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReason {
    TouchRight,
    TouchLeft,
    TooClose,
    TooDark,
    TooBright,
}

impl MoveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TouchRight => "touch right",
            Self::TouchLeft => "touch left",
            Self::TooClose => "too close",
            Self::TooDark => "too dark",
            Self::TooBright => "too bright",
        }
    }
}

/// Result of one autonomous motor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomousDecision {
    Open(MoveReason),
    Close(MoveReason),
    /// Bright enough to open, but the reopen counter is still running.
    Suppressed { remaining: u32 },
    /// Nothing to do; any rotation was stopped.
    Hold,
}

impl AutonomousDecision {
    /// Whether the decision commanded a move.
    pub fn moved(self) -> bool {
        matches!(self, Self::Open(_) | Self::Close(_))
    }
}

#[derive(Debug, Clone)]
pub struct MotorController {
    calibrated: bool,
    intended_position: f32,
    reopen_cycles: u32,
}

impl Default for MotorController {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorController {
    pub fn new() -> Self {
        Self {
            calibrated: false,
            intended_position: MOTOR_POSITION_CLOSED,
            reopen_cycles: 0,
        }
    }

    /// Set once calibration completes; never cleared.
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn intended_position(&self) -> f32 {
        self.intended_position
    }

    pub fn reopen_cycles(&self) -> u32 {
        self.reopen_cycles
    }

    /// Home the petals against the closed end stop.
    ///
    /// Blocks: waits for the full travel time, then polls the driver every
    /// `calibration_poll_ms` until it reports calibrated.  With no
    /// `calibration_timeout_ms` this waits forever.
    pub fn calibrate(
        &mut self,
        hw: &mut (impl MotorPort + DelayNs),
        tunables: &Tunables,
    ) -> Result<(), CalibrationError> {
        info!("calibrating motor");

        // Force a real move towards closed regardless of the power-on target.
        self.intended_position = MOTOR_POSITION_OPEN;
        self.issue_move(hw, MOTOR_POSITION_CLOSED, MotorSpeed::Fast, tunables);

        let travel_ms = 1000.0
            * tunables.motor_full_step_count as f32
            * tunables.motor_fast_step_period_secs;
        let initial_wait_ms = travel_ms as u32 + 20;
        hw.delay_ms(initial_wait_ms);
        let mut waited_ms = initial_wait_ms;

        while !hw.is_calibrated() {
            if tunables
                .calibration_timeout_ms
                .is_some_and(|limit| waited_ms >= limit)
            {
                return Err(CalibrationError::Timeout { waited_ms });
            }
            debug!("motor still not calibrated after {waited_ms} ms");
            hw.delay_ms(tunables.calibration_poll_ms);
            waited_ms = waited_ms.saturating_add(tunables.calibration_poll_ms);
        }

        self.calibrated = true;
        info!("motor calibration done after {waited_ms} ms");
        Ok(())
    }

    /// Drive the petals to `position` (0 = closed, 1 = open).
    pub fn move_to(
        &mut self,
        motor: &mut impl MotorPort,
        position: f32,
        speed: MotorSpeed,
        tunables: &Tunables,
    ) -> MoveOutcome {
        if !self.calibrated {
            debug!("move({position:.3}) ignored: motor not calibrated");
            return MoveOutcome::NotCalibrated;
        }
        self.issue_move(motor, position, speed, tunables)
    }

    fn issue_move(
        &mut self,
        motor: &mut impl MotorPort,
        position: f32,
        speed: MotorSpeed,
        tunables: &Tunables,
    ) -> MoveOutcome {
        let period = speed.step_period_secs(tunables);

        if (self.intended_position - position).abs() < tunables.move_epsilon {
            motor.rotate(period);
            return MoveOutcome::SpeedUpdated;
        }

        self.intended_position = position;

        if motor.is_moving() {
            motor.stop();
        }

        let current_full_steps = motor.position() as f32 / tunables.motor_microsteps as f32;
        let delta = (position * tunables.motor_full_step_count as f32 - current_full_steps) as i32;
        if delta.unsigned_abs() < 1 {
            return MoveOutcome::AlreadyThere;
        }

        let direction = if delta > 0 {
            Direction::Open
        } else {
            Direction::Close
        };
        let steps = delta.unsigned_abs();

        info!(
            "move to {position:.3} ({speed:?}): {steps} steps {direction:?} from {current_full_steps:.0}"
        );

        motor.set_current(MotorCurrent::Low);
        motor.set_direction(direction);
        motor.set_steps(steps);
        motor.set_stepping_mode(SteppingMode::Micro);
        motor.wake();
        motor.rotate(period);

        MoveOutcome::Started { direction, steps }
    }

    pub fn stop(&mut self, motor: &mut impl MotorPort) {
        motor.stop();
    }

    /// Current petal position read back from the driver's step counter.
    pub fn position_from_driver(motor: &impl MotorPort, tunables: &Tunables) -> f32 {
        (motor.position() as f32 / tunables.microsteps_full_travel()).clamp(0.0, 1.0)
    }

    /// One tick of the sensor-driven open/close policy.
    ///
    /// Order: touch override (when enabled) → proximity close (when
    /// enabled) → too dark → too bright (subject to reopen suppression) →
    /// stop.  Light decisions need a present sensor and a finished warm-up.
    pub fn run_autonomous(
        &mut self,
        motor: &mut impl MotorPort,
        sensors: &SensorData,
        warmed_up: bool,
        config: &Configuration,
        tunables: &Tunables,
    ) -> AutonomousDecision {
        if !self.calibrated {
            return AutonomousDecision::Hold;
        }

        if tunables.touch_drives_motor && sensors.has_touch_sensor {
            if sensors.touch_right {
                return self.force(motor, MOTOR_POSITION_OPEN, MoveReason::TouchRight, tunables.reopen_cycles_touch, tunables);
            }
            if sensors.touch_left {
                return self.force(motor, MOTOR_POSITION_CLOSED, MoveReason::TouchLeft, tunables.reopen_cycles_touch, tunables);
            }
        }

        if sensors.has_light_sensor && warmed_up {
            if tunables.proximity_close_enabled && config.distance_threshold > sensors.distance {
                return self.force(motor, MOTOR_POSITION_CLOSED, MoveReason::TooClose, tunables.reopen_cycles_distance, tunables);
            }

            if config.lower_brightness_threshold > sensors.brightness {
                return self.force(motor, MOTOR_POSITION_CLOSED, MoveReason::TooDark, tunables.reopen_cycles_light, tunables);
            }

            if config.upper_brightness_threshold < sensors.brightness {
                if self.reopen_cycles == 0 {
                    return self.force(motor, MOTOR_POSITION_OPEN, MoveReason::TooBright, 0, tunables);
                }
                self.reopen_cycles -= 1;
                info!("could open (too bright), {} cycles left", self.reopen_cycles);
                motor.stop();
                return AutonomousDecision::Suppressed {
                    remaining: self.reopen_cycles,
                };
            }
        }

        motor.stop();
        AutonomousDecision::Hold
    }

    fn force(
        &mut self,
        motor: &mut impl MotorPort,
        position: f32,
        reason: MoveReason,
        reopen_cycles: u32,
        tunables: &Tunables,
    ) -> AutonomousDecision {
        let opening = position > MOTOR_POSITION_CLOSED;
        info!("{} due to: {}", if opening { "open" } else { "close" }, reason.as_str());
        self.move_to(motor, position, MotorSpeed::Fast, tunables);
        self.reopen_cycles = reopen_cycles;
        if opening {
            AutonomousDecision::Open(reason)
        } else {
            AutonomousDecision::Close(reason)
        }
    }
}
