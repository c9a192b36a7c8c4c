//! Addressable LED ring adapter.
//!
//! Bridges [`LedStripPort`] to any `smart_leds::SmartLedsWrite` driver
//! (WS2812 over RMT or SPI on the device, a frame recorder in the
//! simulator).  Frames can optionally be gamma corrected on the way out.

use core::fmt::Debug;

use log::warn;
use smart_leds::{RGB8, SmartLedsWrite, gamma};

use crate::app::ports::LedStripPort;

pub struct SmartLedStrip<W> {
    driver: W,
    gamma_correction: bool,
    write_errors: u32,
}

impl<W, E> SmartLedStrip<W>
where
    W: SmartLedsWrite<Color = RGB8, Error = E>,
    E: Debug,
{
    pub fn new(driver: W) -> Self {
        Self {
            driver,
            gamma_correction: false,
            write_errors: 0,
        }
    }

    /// Apply the WS2812 gamma table to every frame.
    pub fn with_gamma(mut self) -> Self {
        self.gamma_correction = true;
        self
    }

    /// Frames the driver rejected since construction.
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    pub fn driver(&self) -> &W {
        &self.driver
    }

    pub fn into_inner(self) -> W {
        self.driver
    }
}

impl<W, E> LedStripPort for SmartLedStrip<W>
where
    W: SmartLedsWrite<Color = RGB8, Error = E>,
    E: Debug,
{
    fn show(&mut self, frame: &[RGB8]) {
        let result = if self.gamma_correction {
            self.driver.write(gamma(frame.iter().copied()))
        } else {
            self.driver.write(frame.iter().copied())
        };
        if let Err(e) = result {
            // A dropped frame is replaced on the next tick.
            self.write_errors = self.write_errors.wrapping_add(1);
            warn!("LED write failed: {e:?}");
        }
    }
}
