//! Circadian effect: time-of-day lighting presets and petal schedule.
//!
//! The petals are shut from 22:00 to 07:00, open from 10:00 to 19:00, and
//! move in 10-minute increments through the morning opening and evening
//! closing windows.

use smart_leds::RGB8;

use super::math8::{dim8, dim8_2, sin8};
use crate::app::ports::WallTime;
use crate::config::{MOTOR_POSITION_CLOSED, MOTOR_POSITION_OPEN};

/// Hour used when no preview is set and the wall clock is not synchronised.
pub const FALLBACK_TIME: WallTime = WallTime { hour: 12, minute: 0 };

const OPENING_START_MIN: u32 = 7 * 60;
const OPENING_END_MIN: u32 = 10 * 60;
const CLOSING_START_MIN: u32 = 19 * 60;
const CLOSING_END_MIN: u32 = 22 * 60;
const TRANSITION_STEP_MIN: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircadianPhase {
    Night,
    Sunrise,
    Morning,
    Midday,
    Afternoon,
    Sunset,
}

impl CircadianPhase {
    pub fn from_hour(hour: u8) -> Self {
        match hour {
            5..=7 => Self::Sunrise,
            8..=10 => Self::Morning,
            11..=14 => Self::Midday,
            15..=17 => Self::Afternoon,
            18..=21 => Self::Sunset,
            _ => Self::Night,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Night => "night",
            Self::Sunrise => "sunrise",
            Self::Morning => "morning",
            Self::Midday => "midday",
            Self::Afternoon => "afternoon",
            Self::Sunset => "sunset",
        }
    }

    /// Paint the preset for this phase.
    pub fn render(self, frame: &mut [RGB8], tick: u32, brightness: u8) {
        let b = brightness;
        match self {
            // Dim warm red, sleep friendly.
            Self::Night => frame.fill(RGB8::new(dim8(90, b), dim8(30, b), dim8(8, b))),
            Self::Sunrise => {
                let breath = sin8((tick / 2) as u8) / 4 + 190;
                frame.fill(RGB8::new(dim8_2(255, b, breath), dim8_2(150, b, breath), dim8_2(60, b, breath)));
            }
            Self::Morning => frame.fill(RGB8::new(dim8(255, b), dim8(240, b), dim8(200, b))),
            Self::Midday => frame.fill(RGB8::new(dim8(240, b), dim8(250, b), dim8(255, b))),
            Self::Afternoon => frame.fill(RGB8::new(dim8(255, b), dim8(220, b), dim8(160, b))),
            Self::Sunset => {
                // Amber to red gradient drifting around the ring.
                let n = frame.len().max(1);
                let shift = (tick / 8) as usize;
                for (i, led) in frame.iter_mut().enumerate() {
                    let phase = ((i + shift) % n * 255 / n) as u8;
                    let g = 150u8.saturating_sub(dim8(sin8(phase), 120));
                    *led = RGB8::new(dim8(255, b), dim8(g, b), dim8(30, b));
                }
            }
        }
    }
}

/// Petal position for a time of day.
///
/// `minute` only refines the transition windows; pass 0 for whole-hour
/// previews.
pub fn target_position(time: WallTime) -> f32 {
    let minutes = u32::from(time.hour.min(23)) * 60 + u32::from(time.minute.min(59));

    let ramp = |start: u32| {
        let stepped = (minutes - start) / TRANSITION_STEP_MIN * TRANSITION_STEP_MIN;
        stepped as f32 / (OPENING_END_MIN - OPENING_START_MIN) as f32
    };

    if minutes < OPENING_START_MIN || minutes >= CLOSING_END_MIN {
        MOTOR_POSITION_CLOSED
    } else if minutes < OPENING_END_MIN {
        ramp(OPENING_START_MIN)
    } else if minutes < CLOSING_START_MIN {
        MOTOR_POSITION_OPEN
    } else {
        MOTOR_POSITION_OPEN - ramp(CLOSING_START_MIN)
    }
}
