//! Persisted state and the save debounce.
//!
//! Every field lives under its own key in the `"flower"` namespace, encoded
//! with `postcard`.  Loading is per key: a missing or undecodable key keeps
//! the current value, so a first boot (empty namespace) simply yields the
//! defaults.
//!
//! Writes are never issued inline with a mutation.  [`SaveDebounce`]
//! records the time of the last mutation and reports a save as due only
//! after `save_quiet_ms` without further changes.

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::ports::StoragePort;
use crate::config::{Configuration, Tunables};
use crate::error::StorageError;
use crate::shared::{EffectMode, LightState, ModeFlags, SharedLightState};

pub const NAMESPACE: &str = "flower";

/// Largest encoded value (a `Color` or a varint `f32`).
const VALUE_BUF: usize = 16;

/// NVS key names, one per persisted field.
pub mod keys {
    pub const MOTOR_POSITION: &str = "motor_pos";
    pub const SPEED: &str = "speed";
    pub const LOWER_THRESHOLD: &str = "lower_thr";
    pub const UPPER_THRESHOLD: &str = "upper_thr";
    pub const DISTANCE_THRESHOLD: &str = "distance_thr";
    pub const AUTONOMOUS: &str = "autonomous";
    pub const COLOR: &str = "color";
    pub const LIGHT_ON: &str = "light_on";
    pub const BRIGHTNESS: &str = "brightness";
    pub const RAINBOW: &str = "fx_rainbow";
    pub const RAINBOW_MULTI: &str = "fx_rb_multi";
    pub const CIRCADIAN: &str = "fx_circadian";
    pub const WEATHER: &str = "fx_weather";
    pub const SENSOR: &str = "fx_sensor";
    pub const ADAPTIVE: &str = "adaptive_br";
}

// ---------------------------------------------------------------------------
// PersistedState
// ---------------------------------------------------------------------------

/// Everything that survives a reboot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedState {
    pub config: Configuration,
    pub light_on: bool,
    pub brightness: u8,
    pub modes: ModeFlags,
    pub adaptive_brightness_enabled: bool,
}

impl PersistedState {
    pub fn capture(config: &Configuration, light: &LightState) -> Self {
        Self {
            config: *config,
            light_on: light.light_on,
            brightness: light.brightness,
            modes: light.mode.flags(),
            adaptive_brightness_enabled: light.adaptive_brightness_enabled,
        }
    }

    /// Write every key.  Stops at the first failing key.
    pub fn save(&self, storage: &mut impl StoragePort) -> Result<(), StorageError> {
        let c = &self.config;
        write_key(storage, keys::MOTOR_POSITION, &c.motor_position)?;
        write_key(storage, keys::SPEED, &c.speed)?;
        write_key(storage, keys::LOWER_THRESHOLD, &c.lower_brightness_threshold)?;
        write_key(storage, keys::UPPER_THRESHOLD, &c.upper_brightness_threshold)?;
        write_key(storage, keys::DISTANCE_THRESHOLD, &c.distance_threshold)?;
        write_key(storage, keys::AUTONOMOUS, &c.is_autonomous)?;
        write_key(storage, keys::COLOR, &c.color)?;
        write_key(storage, keys::LIGHT_ON, &self.light_on)?;
        write_key(storage, keys::BRIGHTNESS, &self.brightness)?;
        write_key(storage, keys::RAINBOW, &self.modes.rainbow)?;
        write_key(storage, keys::RAINBOW_MULTI, &self.modes.rainbow_multi)?;
        write_key(storage, keys::CIRCADIAN, &self.modes.circadian)?;
        write_key(storage, keys::WEATHER, &self.modes.weather)?;
        write_key(storage, keys::SENSOR, &self.modes.sensor_autonomous)?;
        write_key(storage, keys::ADAPTIVE, &self.adaptive_brightness_enabled)?;
        Ok(())
    }

    /// Overlay whatever keys exist in `storage` onto `current`.
    pub fn load(storage: &impl StoragePort, current: Self) -> Self {
        let mut s = current;
        let c = &mut s.config;
        load_into(storage, keys::MOTOR_POSITION, &mut c.motor_position);
        load_into(storage, keys::SPEED, &mut c.speed);
        load_into(storage, keys::LOWER_THRESHOLD, &mut c.lower_brightness_threshold);
        load_into(storage, keys::UPPER_THRESHOLD, &mut c.upper_brightness_threshold);
        load_into(storage, keys::DISTANCE_THRESHOLD, &mut c.distance_threshold);
        load_into(storage, keys::AUTONOMOUS, &mut c.is_autonomous);
        load_into(storage, keys::COLOR, &mut c.color);
        s.config = s.config.sanitized();

        load_into(storage, keys::LIGHT_ON, &mut s.light_on);
        load_into(storage, keys::BRIGHTNESS, &mut s.brightness);
        load_into(storage, keys::ADAPTIVE, &mut s.adaptive_brightness_enabled);

        // Mode keys only count when at least one was stored; otherwise the
        // power-on mode stays.
        let mut modes = ModeFlags::default();
        let mut any = false;
        any |= load_into(storage, keys::RAINBOW, &mut modes.rainbow);
        any |= load_into(storage, keys::RAINBOW_MULTI, &mut modes.rainbow_multi);
        any |= load_into(storage, keys::CIRCADIAN, &mut modes.circadian);
        any |= load_into(storage, keys::WEATHER, &mut modes.weather);
        any |= load_into(storage, keys::SENSOR, &mut modes.sensor_autonomous);
        if any {
            s.modes = EffectMode::from_flags(&modes).flags();
        }
        s
    }

    /// Push the light-side fields into the shared state.
    pub fn apply_to(&self, shared: &SharedLightState) {
        shared.set_light_on(self.light_on);
        shared.set_brightness(self.brightness);
        shared.set_adaptive_brightness_enabled(self.adaptive_brightness_enabled);
        shared.set_effect_mode(EffectMode::from_flags(&self.modes));
    }
}

fn write_key<T: Serialize>(storage: &mut impl StoragePort, key: &str, value: &T) -> Result<(), StorageError> {
    let mut buf = [0u8; VALUE_BUF];
    let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StorageError::IoError)?;
    storage.write(NAMESPACE, key, bytes)
}

fn read_key<T: DeserializeOwned>(storage: &impl StoragePort, key: &str) -> Result<T, StorageError> {
    let mut buf = [0u8; VALUE_BUF];
    let len = storage.read(NAMESPACE, key, &mut buf)?;
    postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Corrupted)
}

/// Returns `true` if the key was present and decoded.
fn load_into<T: DeserializeOwned>(storage: &impl StoragePort, key: &str, slot: &mut T) -> bool {
    match read_key(storage, key) {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(StorageError::NotFound) => false,
        Err(e) => {
            warn!("persisted key '{key}' ignored: {e}");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// SaveDebounce
// ---------------------------------------------------------------------------

/// Coalesces bursts of mutations into one delayed write.
#[derive(Debug, Clone, Default)]
pub struct SaveDebounce {
    pending: bool,
    requested_at_ms: u64,
}

impl SaveDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a mutation.  Restarts the quiet period.
    pub fn request(&mut self, now_ms: u64) {
        if !self.pending {
            debug!("save requested");
        }
        self.pending = true;
        self.requested_at_ms = now_ms;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the quiet period since the last mutation has elapsed.
    pub fn is_due(&self, now_ms: u64, tunables: &Tunables) -> bool {
        self.pending && now_ms.saturating_sub(self.requested_at_ms) >= u64::from(tunables.save_quiet_ms)
    }

    pub fn clear(&mut self) {
        self.pending = false;
    }
}

/// Save `state` if the debounce says so.  Returns `true` if a write
/// happened.  A failed write is retried after another quiet period.
pub fn flush_if_due(
    debounce: &mut SaveDebounce,
    now_ms: u64,
    tunables: &Tunables,
    storage: &mut impl StoragePort,
    state: &PersistedState,
) -> bool {
    if !debounce.is_due(now_ms, tunables) {
        return false;
    }
    match state.save(storage) {
        Ok(()) => {
            debounce.clear();
            info!("state saved to '{NAMESPACE}'");
            true
        }
        Err(e) => {
            warn!("state save failed: {e}");
            debounce.request(now_ms);
            false
        }
    }
}
