//! Effect mode engine
//!
//! Computes one LED frame per tick from the active [`EffectMode`] and, for
//! the weather and circadian modes, a petal target.  Priority while the
//! light is on:
//!
//! 1. Sensor mode in darkness (brightness ≤ lower threshold) → black
//! 2. Sensor mode → static colour
//! 3. Weather
//! 4. Circadian
//! 5. Rainbow Multi
//! 6. Rainbow
//! 7. static colour
//!
//! With the light off the frame is black whatever the mode.

pub mod circadian;
pub mod math8;
pub mod rainbow;
pub mod weather;

use smart_leds::RGB8;

use crate::app::ports::WallTime;
use crate::config::Color;
use crate::shared::EffectMode;
use circadian::CircadianPhase;
use math8::Random8;
use weather::{WeatherAnimator, WeatherCondition};

/// Everything a frame depends on, gathered by the service each tick.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub tick: u32,
    pub light_on: bool,
    pub mode: EffectMode,
    /// User brightness already scaled by the adaptive factor.
    pub brightness: u8,
    pub color: Color,
    pub weather_state: &'a str,
    /// Preview hour override, or `None` to follow `clock`.
    pub preview_hour: Option<u8>,
    /// Wall clock, `None` while unsynchronised.
    pub clock: Option<WallTime>,
    pub has_light_sensor: bool,
    pub ambient: f32,
    pub lower_brightness_threshold: f32,
}

/// One tick's result.
#[derive(Debug)]
pub struct RenderOutput<'a> {
    pub frame: &'a [RGB8],
    /// Petal position requested by the active mode.
    pub motor_target: Option<f32>,
}

pub struct EffectEngine {
    frame: Vec<RGB8>,
    hue: u16,
    rng: Random8,
}

impl EffectEngine {
    pub fn new(led_count: usize) -> Self {
        Self {
            frame: vec![RGB8::default(); led_count],
            hue: 0,
            rng: Random8::default(),
        }
    }

    /// Current hue accumulator.
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Fill every LED with one colour (start-up self-test, colour commands).
    pub fn solid(&mut self, color: Color) -> &[RGB8] {
        self.frame.fill(to_rgb(color));
        &self.frame
    }

    pub fn render(&mut self, input: &RenderInput<'_>) -> RenderOutput<'_> {
        let motor_target = Self::motor_target(input);
        let b = input.brightness;

        if !input.light_on || Self::sensor_darkness(input) {
            self.frame.fill(RGB8::default());
        } else {
            match input.mode {
                EffectMode::Weather => {
                    WeatherAnimator {
                        tick: input.tick,
                        brightness: b,
                        hue: &mut self.hue,
                        rng: &mut self.rng,
                    }
                    .render(WeatherCondition::parse(input.weather_state), &mut self.frame);
                }
                EffectMode::Circadian => {
                    let time = Self::circadian_time(input);
                    CircadianPhase::from_hour(time.hour).render(&mut self.frame, input.tick, b);
                }
                EffectMode::RainbowMulti => {
                    self.hue = self.hue.wrapping_add(rainbow::HUE_STEP);
                    let value = rainbow::pulse_brightness(b, input.tick);
                    rainbow::spread(&mut self.frame, (self.hue >> 8) as u8, value);
                }
                EffectMode::Rainbow => {
                    self.hue = self.hue.wrapping_add(rainbow::HUE_STEP);
                    let value = rainbow::pulse_brightness(b, input.tick);
                    rainbow::uniform(&mut self.frame, (self.hue >> 8) as u8, value);
                }
                EffectMode::SensorAutonomous | EffectMode::None => {
                    self.frame.fill(to_rgb(input.color.scaled(b)));
                }
            }
        }

        RenderOutput {
            frame: &self.frame,
            motor_target,
        }
    }

    fn sensor_darkness(input: &RenderInput<'_>) -> bool {
        input.mode == EffectMode::SensorAutonomous
            && input.has_light_sensor
            && input.ambient <= input.lower_brightness_threshold
    }

    fn circadian_time(input: &RenderInput<'_>) -> WallTime {
        match input.preview_hour {
            Some(hour) => WallTime { hour, minute: 0 },
            None => input.clock.unwrap_or(circadian::FALLBACK_TIME),
        }
    }

    /// Petal target owned by the active mode, independent of the light.
    fn motor_target(input: &RenderInput<'_>) -> Option<f32> {
        match input.mode {
            EffectMode::Weather => Some(WeatherCondition::parse(input.weather_state).target_position()),
            EffectMode::Circadian => Some(circadian::target_position(Self::circadian_time(input))),
            _ => None,
        }
    }
}

pub fn to_rgb(color: Color) -> RGB8 {
    RGB8::new(color.red, color.green, color.blue)
}
