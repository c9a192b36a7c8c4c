//! Adaptive LED brightness
//!
//! Dims the LEDs in a dark room.  The factor (out of 255) is recomputed at
//! most once per `adaptive_window_ms` and multiplies the user brightness of
//! every effect.  It never drops below `adaptive_min_factor`.

use log::debug;

use crate::config::Tunables;

const FULL: u8 = u8::MAX;

#[derive(Debug, Clone)]
pub struct AdaptiveBrightness {
    last_update_ms: Option<u64>,
    factor: u8,
}

impl Default for AdaptiveBrightness {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveBrightness {
    pub fn new() -> Self {
        Self {
            last_update_ms: None,
            factor: FULL,
        }
    }

    /// Current scaling factor (`adaptive_min_factor..=255`).
    pub fn factor(&self) -> u8 {
        self.factor
    }

    /// Scale a user brightness by the current factor.  A lit ring never
    /// rounds down to black.
    pub fn apply(&self, brightness: u8) -> u8 {
        if brightness == 0 {
            return 0;
        }
        (((u16::from(brightness) * u16::from(self.factor)) / 255) as u8).max(1)
    }

    /// Refresh the factor.
    ///
    /// Disabled or without a light sensor the factor is 255 straight away;
    /// otherwise it follows `ambient` once per window.
    pub fn update(
        &mut self,
        now_ms: u64,
        enabled: bool,
        has_light_sensor: bool,
        ambient: f32,
        tunables: &Tunables,
    ) {
        if !enabled || !has_light_sensor {
            self.factor = FULL;
            return;
        }

        let due = self
            .last_update_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= u64::from(tunables.adaptive_window_ms));
        if !due {
            return;
        }

        self.last_update_ms = Some(now_ms);
        let factor = factor_for(ambient, tunables);
        if factor != self.factor {
            debug!("adaptive brightness: ambient={ambient:.3} factor={factor}");
        }
        self.factor = factor;
    }
}

/// Linear map from ambient level to factor, clamped at both ends.
pub fn factor_for(ambient: f32, tunables: &Tunables) -> u8 {
    let low = tunables.adaptive_ambient_low;
    let high = tunables.adaptive_ambient_high;
    let min = f32::from(tunables.adaptive_min_factor);

    if ambient.is_nan() || ambient <= low {
        return tunables.adaptive_min_factor;
    }
    if ambient >= high {
        return FULL;
    }

    let t = (ambient - low) / (high - low);
    (min + t * (255.0 - min)).clamp(min, 255.0) as u8
}
