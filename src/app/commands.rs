//! Inbound commands to the control core.
//!
//! These represent actions requested by the outside world (broker, web UI,
//! serial console) that the [`FlowerService`](super::service::FlowerService)
//! interprets and acts upon.  Plain flag changes (light on/off, effect,
//! brightness) go straight through [`SharedLightState`](crate::shared::SharedLightState)
//! instead.

use serde::Deserialize;

use crate::config::Color;
use crate::shared::EffectMode;

/// Manual cover control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    Open,
    Close,
    /// Keep the current position.
    Stop,
    /// Position in percent, 100 = open.
    Position(u8),
}

impl CoverCommand {
    /// Parse the `OPEN` / `CLOSE` / `STOP` payloads.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload.trim() {
            "OPEN" => Some(Self::Open),
            "CLOSE" => Some(Self::Close),
            "STOP" => Some(Self::Stop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RgbCommand {
    pub r: Option<u8>,
    pub g: Option<u8>,
    pub b: Option<u8>,
}

/// JSON light command in the home-automation schema.  Every field is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct LightCommand {
    pub state: Option<heapless::String<8>>,
    pub brightness: Option<u8>,
    pub color: Option<RgbCommand>,
    pub effect: Option<heapless::String<16>>,
}

impl LightCommand {
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// `Some(true)` for `"ON"`, `Some(false)` for `"OFF"`.
    pub fn light_on(&self) -> Option<bool> {
        match self.state.as_deref() {
            Some("ON") => Some(true),
            Some("OFF") => Some(false),
            _ => None,
        }
    }

    pub fn effect_mode(&self) -> Option<EffectMode> {
        self.effect.as_deref().map(EffectMode::from_name)
    }

    /// Merge the colour fields into `current`.
    pub fn color_over(&self, current: Color) -> Option<Color> {
        self.color.map(|c| Color {
            red: c.r.unwrap_or(current.red),
            green: c.g.unwrap_or(current.green),
            blue: c.b.unwrap_or(current.blue),
        })
    }
}

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Manual open / close / stop / position.
    Cover(CoverCommand),

    /// Select "Automatic" (`true`) or "Manual" (`false`).
    SetAutonomous(bool),

    /// Disable every effect and show a static colour.
    SetColor(Color),

    /// Combined light command (state, brightness, colour, effect).
    Light(LightCommand),

    /// Restart the ambient warm-up ("recalibrate sensors").
    ResetSensorWarmup,
}

impl AppCommand {
    /// Parse the mode select payload.
    pub fn autonomy_from_label(label: &str) -> Self {
        Self::SetAutonomous(label.trim() == "Automatic")
    }
}
