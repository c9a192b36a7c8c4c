//! 8-bit LED math: dimming, a cheap sine and a cheap PRNG.

/// `value * brightness / 255` with exact endpoints.
#[inline]
pub const fn dim8(value: u8, brightness: u8) -> u8 {
    ((value as u16 * brightness as u16) / 255) as u8
}

/// `value * a * b / 255²`, used where an animation intensity and the user
/// brightness both scale a channel.
#[inline]
pub const fn dim8_2(value: u8, a: u8, b: u8) -> u8 {
    ((value as u32 * a as u32 * b as u32) / (255 * 255)) as u8
}

const SIN8_TABLE: [u8; 8] = [0, 49, 49, 41, 90, 27, 117, 10];

/// Piecewise-linear sine: `sin8(0) = 128`, peak 255 at 64, trough 1 at 192.
pub const fn sin8(theta: u8) -> u8 {
    let mut offset = theta;
    if theta & 0x40 != 0 {
        offset = 255 - offset;
    }
    offset &= 0x3F;

    let mut secoffset = offset & 0x0F;
    if theta & 0x40 != 0 {
        secoffset += 1;
    }

    let section = (offset >> 4) as usize;
    let b = SIN8_TABLE[section * 2];
    let m16 = SIN8_TABLE[section * 2 + 1];
    let mx = ((m16 as u16 * secoffset as u16) >> 4) as u8;

    let mut y = (mx + b) as i16;
    if theta & 0x80 != 0 {
        y = -y;
    }
    (y + 128) as u8
}

/// 16-bit linear congruential generator for sparkle effects.
#[derive(Debug, Clone)]
pub struct Random8 {
    seed: u16,
}

impl Default for Random8 {
    fn default() -> Self {
        Self::new(1337)
    }
}

impl Random8 {
    pub const fn new(seed: u16) -> Self {
        Self { seed }
    }

    pub fn next_u8(&mut self) -> u8 {
        self.seed = self.seed.wrapping_mul(2053).wrapping_add(13849);
        let [lo, hi] = self.seed.to_le_bytes();
        lo.wrapping_add(hi)
    }

    /// `true` with roughly `percent`% probability.
    pub fn chance(&mut self, percent: u8) -> bool {
        u16::from(self.next_u8()) * 100 / 256 < u16::from(percent)
    }
}
