//! Shared light state — the command surface both the core and the transport touch.
//!
//! The transport collaborator (MQTT, web UI) owns the *intent*: whether the
//! light is on, which effect runs, the brightness byte, the weather feed.
//! The core reads it every tick and mutates it from touch gestures.  Both
//! sides hold a plain `&SharedLightState`; interior mutability goes through
//! a critical-section mutex so the struct can also live in a `static`.
//!
//! The active effect is stored as a single [`EffectMode`], so the per-mode
//! boolean view can never report two modes at once.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::String;

/// Capacity of the weather state string.
pub const WEATHER_STATE_CAPACITY: usize = 24;

/// Circadian preview hour value meaning "follow the real clock".
pub const PREVIEW_DISABLED: i8 = -1;

// ---------------------------------------------------------------------------
// Effect mode
// ---------------------------------------------------------------------------

/// Mutually exclusive LED / motor strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EffectMode {
    /// Static colour.
    None = 0,
    Rainbow = 1,
    RainbowMulti = 2,
    Circadian = 3,
    Weather = 4,
    SensorAutonomous = 5,
}

impl EffectMode {
    /// Gesture ring order.
    pub const RING: [Self; 6] = [
        Self::None,
        Self::Rainbow,
        Self::RainbowMulti,
        Self::Circadian,
        Self::Weather,
        Self::SensorAutonomous,
    ];

    fn ring_index(self) -> usize {
        Self::RING.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Next mode in the ring (wraps SensorAutonomous → None).
    pub fn next(self) -> Self {
        Self::RING[(self.ring_index() + 1) % Self::RING.len()]
    }

    /// Previous mode in the ring (wraps None → SensorAutonomous).
    pub fn previous(self) -> Self {
        let len = Self::RING.len();
        Self::RING[(self.ring_index() + len - 1) % len]
    }

    /// Effect name as published to the home-automation side.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rainbow => "Rainbow",
            Self::RainbowMulti => "Rainbow Multi",
            Self::Circadian => "Circadian",
            Self::Weather => "Weather",
            Self::SensorAutonomous => "Sensor",
            Self::None => "None",
        }
    }

    /// Parse an effect name.  Unknown names select `None`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Rainbow" => Self::Rainbow,
            "Rainbow Multi" => Self::RainbowMulti,
            "Circadian" => Self::Circadian,
            "Weather" => Self::Weather,
            "Sensor" => Self::SensorAutonomous,
            _ => Self::None,
        }
    }

    /// Per-mode boolean view.
    pub fn flags(self) -> ModeFlags {
        ModeFlags {
            none: self == Self::None,
            rainbow: self == Self::Rainbow,
            rainbow_multi: self == Self::RainbowMulti,
            circadian: self == Self::Circadian,
            weather: self == Self::Weather,
            sensor_autonomous: self == Self::SensorAutonomous,
        }
    }

    /// Collapse a boolean view back into one mode.
    ///
    /// If several flags are set (e.g. a corrupted store), the highest
    /// rendering priority wins: Sensor > Weather > Circadian > RainbowMulti
    /// > Rainbow.
    pub fn from_flags(flags: &ModeFlags) -> Self {
        if flags.sensor_autonomous {
            Self::SensorAutonomous
        } else if flags.weather {
            Self::Weather
        } else if flags.circadian {
            Self::Circadian
        } else if flags.rainbow_multi {
            Self::RainbowMulti
        } else if flags.rainbow {
            Self::Rainbow
        } else {
            Self::None
        }
    }
}

/// Boolean view of the active effect mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub none: bool,
    pub rainbow: bool,
    pub rainbow_multi: bool,
    pub circadian: bool,
    pub weather: bool,
    pub sensor_autonomous: bool,
}

impl ModeFlags {
    /// Number of flags currently set.
    pub fn active_count(&self) -> usize {
        [
            self.none,
            self.rainbow,
            self.rainbow_multi,
            self.circadian,
            self.weather,
            self.sensor_autonomous,
        ]
        .iter()
        .filter(|f| **f)
        .count()
    }
}

// ---------------------------------------------------------------------------
// Light state
// ---------------------------------------------------------------------------

/// Snapshot of the command surface.
#[derive(Debug, Clone, PartialEq)]
pub struct LightState {
    pub light_on: bool,
    pub mode: EffectMode,
    /// User-set LED brightness (0–255).
    pub brightness: u8,
    pub adaptive_brightness_enabled: bool,
    /// Weather condition name from the weather feed (e.g. "rainy").
    pub weather_state: String<WEATHER_STATE_CAPACITY>,
    /// Hour override for the circadian effect, [`PREVIEW_DISABLED`] when off.
    pub circadian_preview_hour: i8,
    /// Bumped on every change; lets the core notice external mutations.
    pub revision: u32,
    /// Bumped only when a field that survives a reboot changes.
    pub persisted_revision: u32,
}

impl Default for LightState {
    fn default() -> Self {
        let mut weather_state = String::new();
        let _ = weather_state.push_str("sunny");
        Self {
            light_on: true,
            mode: EffectMode::RainbowMulti,
            brightness: 255,
            adaptive_brightness_enabled: true,
            weather_state,
            circadian_preview_hour: PREVIEW_DISABLED,
            revision: 0,
            persisted_revision: 0,
        }
    }
}

impl LightState {
    /// Preview hour as `Some(0..=23)`, or `None` when following the clock.
    pub fn preview_hour(&self) -> Option<u8> {
        u8::try_from(self.circadian_preview_hour)
            .ok()
            .filter(|h| *h < 24)
    }

    /// The fields written to non-volatile storage.
    fn persisted_fields(&self) -> (bool, EffectMode, u8, bool) {
        (self.light_on, self.mode, self.brightness, self.adaptive_brightness_enabled)
    }
}

// ---------------------------------------------------------------------------
// SharedLightState
// ---------------------------------------------------------------------------

/// Interior-mutable holder for [`LightState`].
pub struct SharedLightState {
    inner: Mutex<CriticalSectionRawMutex, RefCell<LightState>>,
}

impl Default for SharedLightState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLightState {
    pub fn new() -> Self {
        Self::with_state(LightState::default())
    }

    pub fn with_state(state: LightState) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(state)),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> LightState {
        self.inner.lock(|cell| cell.borrow().clone())
    }

    /// Current revision counter.
    pub fn revision(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().revision)
    }

    /// Revision of the persisted fields only (light, mode, brightness,
    /// adaptive flag).  Weather and preview updates leave it alone.
    pub fn persisted_revision(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().persisted_revision)
    }

    /// Apply `f`; bump the revisions if anything changed.
    fn update<R>(&self, f: impl FnOnce(&mut LightState) -> R) -> R {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            let before = state.clone();
            let result = f(&mut *state);
            if *state != before {
                state.revision = state.revision.wrapping_add(1);
                if state.persisted_fields() != before.persisted_fields() {
                    state.persisted_revision = state.persisted_revision.wrapping_add(1);
                }
            }
            result
        })
    }

    // ── Light on/off ──────────────────────────────────────────

    pub fn is_light_on(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().light_on)
    }

    pub fn set_light_on(&self, on: bool) {
        self.update(|s| s.light_on = on);
    }

    /// Flip the light and return the new value.
    pub fn toggle_light(&self) -> bool {
        self.update(|s| {
            s.light_on = !s.light_on;
            s.light_on
        })
    }

    // ── Effect mode ───────────────────────────────────────────

    pub fn effect_mode(&self) -> EffectMode {
        self.inner.lock(|cell| cell.borrow().mode)
    }

    /// Activate `mode`, clearing every other mode in the same step.
    pub fn set_effect_mode(&self, mode: EffectMode) {
        self.update(|s| s.mode = mode);
    }

    pub fn is_mode_enabled(&self, mode: EffectMode) -> bool {
        self.effect_mode() == mode
    }

    /// Per-mode flag setter.  Enabling a mode disables all others;
    /// disabling the active mode falls back to `None`.
    pub fn set_mode_enabled(&self, mode: EffectMode, enabled: bool) {
        self.update(|s| {
            if enabled {
                s.mode = mode;
            } else if s.mode == mode {
                s.mode = EffectMode::None;
            }
        });
    }

    pub fn mode_flags(&self) -> ModeFlags {
        self.effect_mode().flags()
    }

    // ── Brightness ────────────────────────────────────────────

    pub fn brightness(&self) -> u8 {
        self.inner.lock(|cell| cell.borrow().brightness)
    }

    pub fn set_brightness(&self, brightness: u8) {
        self.update(|s| s.brightness = brightness);
    }

    pub fn is_adaptive_brightness_enabled(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().adaptive_brightness_enabled)
    }

    pub fn set_adaptive_brightness_enabled(&self, enabled: bool) {
        self.update(|s| s.adaptive_brightness_enabled = enabled);
    }

    // ── Weather / circadian inputs ────────────────────────────

    pub fn weather_state(&self) -> String<WEATHER_STATE_CAPACITY> {
        self.inner.lock(|cell| cell.borrow().weather_state.clone())
    }

    /// Store the weather condition, truncated to the buffer capacity.
    pub fn set_weather_state(&self, state: &str) {
        let mut value: String<WEATHER_STATE_CAPACITY> = String::new();
        for c in state.trim().chars() {
            if value.push(c).is_err() {
                break;
            }
        }
        self.update(|s| s.weather_state = value);
    }

    pub fn circadian_preview_hour(&self) -> i8 {
        self.inner.lock(|cell| cell.borrow().circadian_preview_hour)
    }

    /// Set the preview hour; anything outside 0–23 disables the preview.
    pub fn set_circadian_preview_hour(&self, hour: i8) {
        let hour = if (0..24).contains(&hour) {
            hour
        } else {
            PREVIEW_DISABLED
        };
        self.update(|s| s.circadian_preview_hour = hour);
    }
}
