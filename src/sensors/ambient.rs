//! Ambient brightness estimator with a bounded warm-up.
//!
//! The first `warmup_sample_count` accepted samples after a reset feed an
//! exponential moving average.  When the count reaches the cap the lower and
//! upper day/night thresholds are derived from the estimate; afterwards the
//! estimate is frozen until the next reset.

use crate::config::Tunables;

/// Thresholds derived at the end of a warm-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedThresholds {
    pub lower: f32,
    pub upper: f32,
}

#[derive(Debug, Clone)]
pub struct AmbientEstimator {
    value: f32,
    count: u32,
    cap: u32,
}

impl AmbientEstimator {
    /// Start already warmed up: the configured thresholds apply until the
    /// first explicit reset.
    pub fn new(initial: f32, tunables: &Tunables) -> Self {
        Self {
            value: initial,
            count: tunables.warmup_sample_count,
            cap: tunables.warmup_sample_count,
        }
    }

    /// Restart the warm-up.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn is_warmed_up(&self) -> bool {
        self.count >= self.cap
    }

    /// Current ambient estimate (0–1).
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Accepted samples since the last reset, saturating at the cap.
    pub fn sample_count(&self) -> u32 {
        self.count
    }

    /// Feed one normalised sample.  Returns the new thresholds on the sample
    /// that completes the warm-up.
    pub fn accept(&mut self, brightness: f32, tunables: &Tunables) -> Option<DerivedThresholds> {
        if self.is_warmed_up() {
            return None;
        }

        self.count += 1;
        if self.count == 1 {
            self.value = brightness;
        } else {
            let w = tunables.ambient_ema_weight;
            self.value = w * self.value + (1.0 - w) * brightness;
        }

        if self.count == self.cap {
            Some(DerivedThresholds {
                lower: (self.value - tunables.threshold_delta).max(0.0),
                upper: (self.value + tunables.threshold_delta).min(1.0),
            })
        } else {
            None
        }
    }
}
