//! Clock adapter.
//!
//! Monotonic milliseconds come from `std::time::Instant`.  Wall-clock time
//! is unknown until something (NTP, the broker, the web UI) calls
//! [`SystemClock::set_local_time`]; from then on it advances with the
//! monotonic clock.

use std::time::Instant;

use log::info;

use crate::app::ports::{ClockPort, WallTime};

const MINUTES_PER_DAY: u64 = 24 * 60;

pub struct SystemClock {
    start: Instant,
    /// `(now_ms, minutes since midnight)` captured when the time was set.
    wall_anchor: Option<(u64, u64)>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            wall_anchor: None,
        }
    }

    /// Synchronise the time of day.  Out-of-range fields are clamped.
    pub fn set_local_time(&mut self, time: WallTime) {
        let minutes = u64::from(time.hour.min(23)) * 60 + u64::from(time.minute.min(59));
        self.wall_anchor = Some((self.now_ms(), minutes));
        info!("wall clock set to {:02}:{:02}", time.hour.min(23), time.minute.min(59));
    }

    /// Forget the wall-clock time (e.g. after a failed sync).
    pub fn clear_local_time(&mut self) {
        self.wall_anchor = None;
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn local_time(&self) -> Option<WallTime> {
        let (anchor_ms, anchor_minutes) = self.wall_anchor?;
        let elapsed_minutes = self.now_ms().saturating_sub(anchor_ms) / 60_000;
        let minutes = (anchor_minutes + elapsed_minutes) % MINUTES_PER_DAY;
        Some(WallTime {
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        })
    }
}
