//! Flower configuration and tuning parameters
//!
//! [`Configuration`] is the user-facing state owned by the core: where the
//! petals should be, how fast they move, the ambient-light thresholds that
//! drive the autonomous mode, and the static LED colour.  It is mutated by
//! gesture handlers, the command surface, and the sensor warm-up.
//!
//! [`Tunables`] collects every constant of the control loop as data so that
//! tests (and other hardware revisions) can adjust them without touching
//! the algorithms.

use serde::{Deserialize, Serialize};

/// Fully closed petal position.
pub const MOTOR_POSITION_CLOSED: f32 = 0.0;
/// Fully open petal position.
pub const MOTOR_POSITION_OPEN: f32 = 1.0;

const DEFAULT_LOWER_BRIGHTNESS_THRESHOLD: f32 = 0.05;
const DEFAULT_UPPER_BRIGHTNESS_THRESHOLD: f32 = 0.15;
const DEFAULT_DISTANCE_THRESHOLD: f32 = 0.3;
const DEFAULT_COLOR: Color = Color::new(0, 145, 220);

/// 24-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Scale every channel by `brightness / 255`.
    pub const fn scaled(self, brightness: u8) -> Self {
        Self {
            red: ((self.red as u16 * brightness as u16) / 255) as u8,
            green: ((self.green as u16 * brightness as u16) / 255) as u8,
            blue: ((self.blue as u16 * brightness as u16) / 255) as u8,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Intended petal position (0 = closed, 1 = open)
    pub motor_position: f32,
    /// Motor speed (0-1); below 0.5 selects the slow step period
    pub speed: f32,
    /// Ambient brightness below which the autonomous mode closes
    pub lower_brightness_threshold: f32,
    /// Ambient brightness above which the autonomous mode re-opens
    pub upper_brightness_threshold: f32,
    /// Proximity above which the autonomous mode closes (when enabled)
    pub distance_threshold: f32,
    /// Legacy "Automatic" cover mode
    pub is_autonomous: bool,
    /// Static LED colour
    pub color: Color,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            motor_position: MOTOR_POSITION_CLOSED,
            speed: 1.0,
            lower_brightness_threshold: DEFAULT_LOWER_BRIGHTNESS_THRESHOLD,
            upper_brightness_threshold: DEFAULT_UPPER_BRIGHTNESS_THRESHOLD,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            is_autonomous: false,
            color: DEFAULT_COLOR,
        }
    }
}

impl Configuration {
    /// Return a copy with every field forced into its legal range.
    ///
    /// Setters never reject input: NaN falls back to the default value,
    /// everything else is clamped to `[0, 1]`, and a lower threshold above
    /// the upper one is pulled down to it.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let lower = unit(self.lower_brightness_threshold, defaults.lower_brightness_threshold);
        let upper = unit(self.upper_brightness_threshold, defaults.upper_brightness_threshold);
        Self {
            motor_position: unit(self.motor_position, defaults.motor_position),
            speed: unit(self.speed, defaults.speed),
            lower_brightness_threshold: lower.min(upper),
            upper_brightness_threshold: upper,
            distance_threshold: unit(self.distance_threshold, defaults.distance_threshold),
            is_autonomous: self.is_autonomous,
            color: self.color,
        }
    }
}

fn unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Control-loop constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    // --- LEDs ---
    /// Number of LEDs on the ring
    pub led_count: usize,

    // --- Motor ---
    /// Full steps between the closed and open end stops
    pub motor_full_step_count: u32,
    /// Driver micro-steps per full step (the driver counter unit)
    pub motor_microsteps: u32,
    /// Step period (seconds) at fast speed
    pub motor_fast_step_period_secs: f32,
    /// Step period (seconds) at slow speed
    pub motor_slow_step_period_secs: f32,
    /// The motor state machine runs every Nth tick
    pub motor_tick_divisor: u32,
    /// Targets closer than this to the intended one only re-issue speed
    pub move_epsilon: f32,
    /// Effect-driven targets closer than this to the configured position are ignored
    pub effect_move_epsilon: f32,
    /// Cycles to suppress re-opening after a light-triggered close
    pub reopen_cycles_light: u32,
    /// Cycles to suppress re-opening after a touch-triggered move
    pub reopen_cycles_touch: u32,
    /// Cycles to suppress re-opening after a proximity-triggered close
    pub reopen_cycles_distance: u32,
    /// Close when something is nearer than `distance_threshold`
    pub proximity_close_enabled: bool,
    /// Let held fingers open/close the petals in autonomous mode
    pub touch_drives_motor: bool,
    /// Calibration poll interval (milliseconds)
    pub calibration_poll_ms: u32,
    /// Give up calibrating after this long; `None` waits forever
    pub calibration_timeout_ms: Option<u32>,

    // --- Light sensor ---
    /// Accepted samples that seed the ambient estimate
    pub warmup_sample_count: u32,
    /// Weight of the previous ambient estimate in the moving average
    pub ambient_ema_weight: f32,
    /// Threshold distance from the ambient estimate
    pub threshold_delta: f32,
    /// Largest valid raw brightness / proximity count
    pub sensor_raw_max: f32,

    // --- Touch ---
    /// Hold time before a press counts as long (milliseconds)
    pub long_press_ms: u32,
    /// Brightness change per long press
    pub brightness_step: u8,

    // --- Adaptive brightness ---
    /// Minimum time between factor updates (milliseconds)
    pub adaptive_window_ms: u32,
    /// Ambient level at or below which the floor factor applies
    pub adaptive_ambient_low: f32,
    /// Ambient level at or above which no attenuation applies
    pub adaptive_ambient_high: f32,
    /// Smallest factor (out of 255)
    pub adaptive_min_factor: u8,

    // --- Persistence ---
    /// Quiet period before a pending save is written (milliseconds)
    pub save_quiet_ms: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            // LEDs
            led_count: 12,

            // Motor
            motor_full_step_count: 2000,
            motor_microsteps: 32,
            motor_fast_step_period_secs: 0.001,
            motor_slow_step_period_secs: 0.002,
            motor_tick_divisor: 6,
            move_epsilon: 0.005,
            effect_move_epsilon: 0.01,
            reopen_cycles_light: 5,
            reopen_cycles_touch: 5,
            reopen_cycles_distance: 5,
            proximity_close_enabled: false,
            touch_drives_motor: false,
            calibration_poll_ms: 100,
            calibration_timeout_ms: None,

            // Light sensor
            warmup_sample_count: 20,
            ambient_ema_weight: 0.9,
            threshold_delta: 0.05,
            sensor_raw_max: 4095.0,

            // Touch
            long_press_ms: 500,
            brightness_step: 25,

            // Adaptive brightness
            adaptive_window_ms: 15_000,
            adaptive_ambient_low: 0.01,
            adaptive_ambient_high: 0.09,
            adaptive_min_factor: 13,

            // Persistence
            save_quiet_ms: 3_000,
        }
    }
}

impl Tunables {
    /// Driver counter value at the fully open position.
    pub fn microsteps_full_travel(&self) -> f32 {
        (self.motor_full_step_count * self.motor_microsteps) as f32
    }
}
