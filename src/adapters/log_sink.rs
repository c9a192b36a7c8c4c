//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to the
//! logger (UART / USB-CDC on the device, stderr in the simulator).  The
//! broker bridge implements the same trait and publishes the JSON payloads
//! instead.

use log::{info, warn};

use crate::app::events::{AppEvent, SensorKind};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | calibrated");
            }
            AppEvent::LightState(report) => match report.to_json() {
                Ok(json) => info!("LIGHT | {json}"),
                Err(e) => warn!("LIGHT | unserialisable report: {e}"),
            },
            AppEvent::CoverState(report) => {
                info!("COVER | {} ({}%)", report.state.as_str(), report.position);
            }
            AppEvent::AutonomyMode { automatic } => {
                info!("MODE  | {}", if *automatic { "Automatic" } else { "Manual" });
            }
            AppEvent::SensorPresence { sensor, present } => {
                let name = match sensor {
                    SensorKind::Light => "light",
                    SensorKind::Touch => "touch",
                };
                if *present {
                    info!("SENSR | {name} sensor present");
                } else {
                    warn!("SENSR | {name} sensor missing");
                }
            }
            AppEvent::ThresholdsUpdated { lower, upper } => {
                info!("SENSR | thresholds lower={lower:.3} upper={upper:.3}");
            }
            AppEvent::StateSaved => {
                info!("NVS   | state saved");
            }
        }
    }
}
