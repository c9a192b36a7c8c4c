//! Weather effect: one animation per weather condition plus a petal target.
//!
//! Conditions use the names of the home-automation weather entity
//! (`sunny`, `rainy`, `lightning-rainy`, ...).  Unknown names render warm
//! white with the petals open.

use smart_leds::RGB8;

use super::math8::{Random8, dim8, dim8_2, sin8};
use crate::config::{MOTOR_POSITION_CLOSED, MOTOR_POSITION_OPEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Sunny,
    ClearNight,
    Cloudy,
    PartlyCloudy,
    Fog,
    Rainy,
    Pouring,
    Lightning,
    LightningRainy,
    Windy,
    Snowy,
    SnowyRainy,
    Hail,
    Exceptional,
    Unknown,
}

impl WeatherCondition {
    pub fn parse(state: &str) -> Self {
        match state {
            "sunny" => Self::Sunny,
            "clear-night" => Self::ClearNight,
            "cloudy" => Self::Cloudy,
            "partlycloudy" => Self::PartlyCloudy,
            "fog" => Self::Fog,
            "rainy" => Self::Rainy,
            "pouring" => Self::Pouring,
            "lightning" => Self::Lightning,
            "lightning-rainy" => Self::LightningRainy,
            "windy" | "windy-variant" => Self::Windy,
            "snowy" => Self::Snowy,
            "snowy-rainy" => Self::SnowyRainy,
            "hail" => Self::Hail,
            "exceptional" => Self::Exceptional,
            _ => Self::Unknown,
        }
    }

    /// Petal position for this condition: shut for precipitation and
    /// storms, half open for overcast, fog and wind, open otherwise.
    pub fn target_position(self) -> f32 {
        match self {
            Self::Rainy
            | Self::Pouring
            | Self::Lightning
            | Self::LightningRainy
            | Self::Hail
            | Self::Snowy
            | Self::SnowyRainy => MOTOR_POSITION_CLOSED,
            Self::PartlyCloudy => 0.75,
            Self::Cloudy | Self::Fog | Self::Windy => 0.5,
            Self::Sunny | Self::ClearNight | Self::Exceptional | Self::Unknown => MOTOR_POSITION_OPEN,
        }
    }
}

/// Animation state carried between frames.
pub struct WeatherAnimator<'a> {
    pub tick: u32,
    pub brightness: u8,
    pub hue: &'a mut u16,
    pub rng: &'a mut Random8,
}

impl WeatherAnimator<'_> {
    pub fn render(&mut self, condition: WeatherCondition, frame: &mut [RGB8]) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        let tick = self.tick;
        let b = self.brightness;

        match condition {
            WeatherCondition::Sunny => {
                let breath = sin8(tick as u8) / 4 + 180;
                frame.fill(RGB8::new(dim8_2(255, b, breath), dim8_2(220, b, breath), dim8_2(100, b, breath)));
            }
            WeatherCondition::ClearNight => {
                for (i, led) in frame.iter_mut().enumerate() {
                    let mut twinkle = if (tick as usize + i * 50) % 100 < 10 { 255 } else { 0 };
                    if self.rng.chance(3) {
                        twinkle = 255;
                    }
                    *led = RGB8::new(dim8(twinkle, b), dim8(twinkle, b), dim8(40 + twinkle / 3, b));
                }
            }
            WeatherCondition::Cloudy => {
                let wave = (tick as usize / 3) % (n * 2);
                for (i, led) in frame.iter_mut().enumerate() {
                    let dist = wave.abs_diff(i + n);
                    let level = 255usize.saturating_sub(dist * 30).max(60) as u8;
                    let gray = dim8(level, b);
                    *led = RGB8::new(gray, gray, (u16::from(gray) * 110 / 100).min(255) as u8);
                }
            }
            WeatherCondition::PartlyCloudy => {
                for (i, led) in frame.iter_mut().enumerate() {
                    *led = if i % 2 == 0 {
                        RGB8::new(dim8(255, b), dim8(200, b), dim8(80, b))
                    } else {
                        let gray = dim8(150, b);
                        RGB8::new(gray, gray, gray)
                    };
                }
            }
            WeatherCondition::Fog => {
                let breath = sin8((tick / 4) as u8) / 3 + 150;
                let v = dim8(breath, b);
                frame.fill(RGB8::new(v, v, (u16::from(v) * 95 / 100) as u8));
            }
            WeatherCondition::Rainy => {
                raindrops(frame, &[(tick / 4) as usize % n], 50, (30, 80, 200), b);
            }
            WeatherCondition::Pouring => {
                let p = (tick / 2) as usize;
                raindrops(frame, &[p % n, (p + 2) % n], 80, (20, 60, 255), b);
            }
            WeatherCondition::Lightning => {
                if self.rng.chance(5) {
                    let v = dim8(255, b);
                    frame.fill(RGB8::new(v, v, v));
                } else {
                    let gray = dim8(40, b);
                    frame.fill(RGB8::new(gray, gray, (u16::from(gray) * 120 / 100) as u8));
                }
            }
            WeatherCondition::LightningRainy => {
                if self.rng.chance(3) {
                    let v = dim8(255, b);
                    frame.fill(RGB8::new(v, v, v));
                } else {
                    raindrops(frame, &[(tick / 3) as usize % n], 60, (25, 70, 220), b);
                }
            }
            WeatherCondition::Windy => {
                let pos = usize::from(sin8(tick.wrapping_mul(2) as u8)) * (n - 1) / 255;
                for (i, led) in frame.iter_mut().enumerate() {
                    let dist = pos.abs_diff(i);
                    let intensity = 255usize.saturating_sub(dist * 60).max(50) as u8;
                    *led = RGB8::new(dim8_2(50, b, intensity), dim8_2(200, b, intensity), dim8_2(180, b, intensity));
                }
            }
            WeatherCondition::Snowy => {
                for led in frame.iter_mut() {
                    let sparkle = if self.rng.chance(10) { 255 } else { 180 };
                    let v = dim8(sparkle, b);
                    *led = RGB8::new(v, v, v);
                }
            }
            WeatherCondition::SnowyRainy => {
                let drop = (tick / 3) as usize % n;
                for (i, led) in frame.iter_mut().enumerate() {
                    let intensity = if i == drop { 255 } else { 80 };
                    let is_snow = ((tick / 10) as usize + i) % 2 == 0;
                    *led = if is_snow {
                        let v = dim8(intensity, b);
                        RGB8::new(v, v, v)
                    } else {
                        RGB8::new(dim8_2(30, b, intensity), dim8_2(80, b, intensity), dim8_2(200, b, intensity))
                    };
                }
            }
            WeatherCondition::Hail => {
                for led in frame.iter_mut() {
                    let flicker = if self.rng.chance(30) {
                        255
                    } else if self.rng.chance(50) {
                        150
                    } else {
                        50
                    };
                    let v = dim8(flicker, b);
                    *led = RGB8::new(v, v, v);
                }
            }
            WeatherCondition::Exceptional => {
                *self.hue = self.hue.wrapping_add(super::rainbow::HUE_STEP);
                super::rainbow::spread(frame, (*self.hue >> 8) as u8, b);
            }
            WeatherCondition::Unknown => {
                let v = dim8(200, b);
                frame.fill(RGB8::new(v, (u16::from(v) * 95 / 100) as u8, (u16::from(v) * 85 / 100) as u8));
            }
        }
    }
}

/// Bright drops at `drops`, dim base elsewhere.
fn raindrops(frame: &mut [RGB8], drops: &[usize], base: u8, (r, g, bl): (u8, u8, u8), brightness: u8) {
    for (i, led) in frame.iter_mut().enumerate() {
        let intensity = if drops.contains(&i) { 255 } else { base };
        *led = RGB8::new(
            dim8_2(r, brightness, intensity),
            dim8_2(g, brightness, intensity),
            dim8_2(bl, brightness, intensity),
        );
    }
}
