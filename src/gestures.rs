//! Touch gesture recognizer
//!
//! Turns the per-pad booleans of [`SensorData`](crate::sensors::SensorData)
//! into discrete gestures:
//!
//! | Input                          | Gesture                        |
//! |--------------------------------|--------------------------------|
//! | both pads down in one frame    | toggle light                   |
//! | one pad held ≥ `long_press_ms` | brightness ± `brightness_step` |
//! | right pad tap (press+release)  | next effect mode               |
//! | left pad tap (press+release)   | previous effect mode           |
//!
//! A long press fires once per press.  A press that took part in a
//! dual-touch, or that already fired a long press, produces no tap on
//! release.

use heapless::Vec;
use log::info;

use crate::config::Tunables;
use crate::shared::SharedLightState;

/// A recognised gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ToggleLight,
    BrightnessUp,
    BrightnessDown,
    NextMode,
    PreviousMode,
}

/// At most one gesture per pad plus the dual-touch per tick.
pub type Gestures = Vec<Gesture, 3>;

#[derive(Debug, Clone, Copy, Default)]
struct PadState {
    pressed: bool,
    press_start_ms: u64,
    long_fired: bool,
    /// Part of a dual-touch; swallow the release.
    consumed: bool,
}

impl PadState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
pub struct GestureRecognizer {
    left: PadState,
    right: PadState,
}

#[derive(Clone, Copy)]
enum Pad {
    Left,
    Right,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any press in progress (touch sensor lost).
    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Feed one frame of pad state.
    pub fn update(&mut self, left: bool, right: bool, now_ms: u64, tunables: &Tunables) -> Gestures {
        let mut out = Gestures::new();

        let was_dual = self.left.pressed && self.right.pressed;
        if left && right && !was_dual {
            self.left = PadState {
                pressed: true,
                press_start_ms: now_ms,
                long_fired: false,
                consumed: true,
            };
            self.right = self.left;
            let _ = out.push(Gesture::ToggleLight);
            return out;
        }

        if let Some(g) = Self::pad(&mut self.left, Pad::Left, left, now_ms, tunables) {
            let _ = out.push(g);
        }
        if let Some(g) = Self::pad(&mut self.right, Pad::Right, right, now_ms, tunables) {
            let _ = out.push(g);
        }
        out
    }

    fn pad(state: &mut PadState, pad: Pad, down: bool, now_ms: u64, tunables: &Tunables) -> Option<Gesture> {
        match (state.pressed, down) {
            (false, true) => {
                state.pressed = true;
                state.press_start_ms = now_ms;
                state.long_fired = false;
                state.consumed = false;
                None
            }
            (true, true) => {
                let held = now_ms.saturating_sub(state.press_start_ms);
                if state.consumed || state.long_fired || held < u64::from(tunables.long_press_ms) {
                    return None;
                }
                state.long_fired = true;
                Some(match pad {
                    Pad::Left => Gesture::BrightnessDown,
                    Pad::Right => Gesture::BrightnessUp,
                })
            }
            (true, false) => {
                let tap = !state.consumed && !state.long_fired;
                state.reset();
                tap.then_some(match pad {
                    Pad::Left => Gesture::PreviousMode,
                    Pad::Right => Gesture::NextMode,
                })
            }
            (false, false) => None,
        }
    }
}

/// Apply a gesture to the shared light state.  Returns `true` if anything
/// changed.
pub fn apply(gesture: Gesture, shared: &SharedLightState, tunables: &Tunables) -> bool {
    match gesture {
        Gesture::ToggleLight => {
            let on = shared.toggle_light();
            info!("touch: light {}", if on { "on" } else { "off" });
            true
        }
        Gesture::BrightnessUp | Gesture::BrightnessDown => {
            let current = shared.brightness();
            let next = if gesture == Gesture::BrightnessUp {
                current.saturating_add(tunables.brightness_step)
            } else {
                current.saturating_sub(tunables.brightness_step)
            }
            .max(1);
            shared.set_brightness(next);
            info!("touch: brightness {current} -> {next}");
            next != current
        }
        Gesture::NextMode | Gesture::PreviousMode => {
            let current = shared.effect_mode();
            let next = if gesture == Gesture::NextMode {
                current.next()
            } else {
                current.previous()
            };
            shared.set_effect_mode(next);
            info!("touch: effect {} -> {}", current.name(), next.name());
            true
        }
    }
}
