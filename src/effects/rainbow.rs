//! Rainbow effects
//!
//! A 16-bit hue accumulator advances by [`HUE_STEP`] every frame; its high
//! byte is the base hue.  `Rainbow` paints every LED with the base hue,
//! `Rainbow Multi` spreads the hues evenly around the ring.  Both pulse
//! gently around the user brightness.

use smart_leds::RGB8;
use smart_leds::hsv::{Hsv, hsv2rgb};

use super::math8::{dim8, sin8};

/// Accumulator advance per frame.
pub const HUE_STEP: u16 = 20;

/// Share of the brightness that stays constant; the rest pulses.
const BASE_SHARE: u8 = 180;
const PULSE_SHARE: u8 = 75;

fn hue_color(hue: u8, value: u8) -> RGB8 {
    hsv2rgb(Hsv {
        hue,
        sat: 255,
        val: value,
    })
}

/// Brightness for this frame: a fixed base plus a sine pulse.
pub fn pulse_brightness(brightness: u8, tick: u32) -> u8 {
    let base = dim8(BASE_SHARE, brightness);
    let range = dim8(PULSE_SHARE, brightness);
    base.saturating_add(dim8(sin8(tick as u8), range))
}

/// Every LED the same hue.
pub fn uniform(frame: &mut [RGB8], hue: u8, value: u8) {
    frame.fill(hue_color(hue, value));
}

/// Hues spread evenly around the ring starting at `base_hue`.
pub fn spread(frame: &mut [RGB8], base_hue: u8, value: u8) {
    let n = frame.len().max(1);
    for (i, led) in frame.iter_mut().enumerate() {
        let offset = (i * 255 / n) as u8;
        *led = hue_color(base_hue.wrapping_add(offset), value);
    }
}
