//! Outbound application events.
//!
//! The [`FlowerService`](super::service::FlowerService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish to the
//! home-automation broker, push to the web UI.

use serde::Serialize;

use crate::config::{Color, Configuration};
use crate::shared::{EffectMode, LightState};

/// Which sensor a presence event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Light,
    Touch,
}

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Start-up finished; the motor is calibrated.
    Started,

    /// Light on/off, brightness, colour or effect changed.
    LightState(LightStateReport),

    /// The petals were commanded to a new position.
    CoverState(CoverStateReport),

    /// The legacy autonomy flag changed ("Automatic" / "Manual").
    AutonomyMode { automatic: bool },

    /// A sensor appeared on or vanished from the bus.
    SensorPresence { sensor: SensorKind, present: bool },

    /// The ambient warm-up finished and derived new thresholds.
    ThresholdsUpdated { lower: f32, upper: f32 },

    /// Persisted state was written.
    StateSaved,
}

// ---------------------------------------------------------------------------
// Light state report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RgbReport {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<Color> for RgbReport {
    fn from(c: Color) -> Self {
        Self {
            r: c.red,
            g: c.green,
            b: c.blue,
        }
    }
}

/// JSON light state in the home-automation schema:
/// `{"state":"ON","brightness":255,"color_mode":"rgb","color":{"r":0,"g":145,"b":220},"effect":"Rainbow Multi"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightStateReport {
    pub state: &'static str,
    pub brightness: u8,
    pub color_mode: &'static str,
    pub color: RgbReport,
    pub effect: &'static str,
}

impl LightStateReport {
    pub fn new(light: &LightState, config: &Configuration) -> Self {
        Self {
            state: if light.light_on { "ON" } else { "OFF" },
            brightness: light.brightness,
            color_mode: "rgb",
            color: config.color.into(),
            effect: light.mode.name(),
        }
    }

    pub fn mode(&self) -> EffectMode {
        EffectMode::from_name(self.effect)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Cover state report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverState {
    Open,
    Closed,
    Stopped,
}

impl CoverState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Stopped => "stopped",
        }
    }
}

/// Petal position as a cover entity: 100 % = open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverStateReport {
    pub position: u8,
    pub state: CoverState,
}

impl CoverStateReport {
    pub fn from_position(motor_position: f32) -> Self {
        let position = (motor_position.clamp(0.0, 1.0) * 100.0) as u8;
        let state = if position >= 99 {
            CoverState::Open
        } else if position <= 1 {
            CoverState::Closed
        } else {
            CoverState::Stopped
        };
        Self { position, state }
    }
}
