//! Sensor fusion — light/proximity and touch inputs turned into [`SensorData`].
//!
//! [`SensorFusion::update`] runs on every tick that is not a motor tick.
//! It watches each sensor's bus presence, re-initialises a device whose
//! presence flipped, rejects out-of-range light samples, and feeds the
//! ambient warm-up that derives the day/night thresholds.  No failure here
//! ever leaves the module: a flaky sensor keeps its previous good value.

pub mod ambient;

use log::{debug, info, warn};

use crate::app::ports::{LightSensorPort, TouchSensorPort};
use crate::config::{Configuration, Tunables};
use ambient::AmbientEstimator;

/// Fused sensor view consumed by the rest of the core.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorData {
    pub has_light_sensor: bool,
    pub has_touch_sensor: bool,
    /// Normalised ambient brightness (0 = dark, 1 = saturated).
    pub brightness: f32,
    /// Normalised distance (0 = touching the sensor, 1 = nothing in range).
    pub distance: f32,
    pub touch_left: bool,
    pub touch_right: bool,
}

/// What changed during one [`SensorFusion::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FusionOutcome {
    /// `Some(present)` when the light sensor's presence flipped.
    pub light_presence_changed: Option<bool>,
    /// `Some(present)` when the touch sensor's presence flipped.
    pub touch_presence_changed: Option<bool>,
    /// The ambient warm-up completed and wrote new thresholds.
    pub thresholds_updated: bool,
}

pub struct SensorFusion {
    data: SensorData,
    ambient: AmbientEstimator,
}

impl SensorFusion {
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            data: SensorData {
                distance: 1.0,
                ..Default::default()
            },
            ambient: AmbientEstimator::new(0.0, tunables),
        }
    }

    /// Probe both sensors once at startup.
    pub fn init(&mut self, sensors: &mut (impl LightSensorPort + TouchSensorPort)) {
        self.data.has_light_sensor = LightSensorPort::init(sensors);
        if self.data.has_light_sensor {
            info!("light sensor initialised");
        } else {
            warn!("light sensor not found");
        }

        self.data.has_touch_sensor = TouchSensorPort::init(sensors);
        if self.data.has_touch_sensor {
            info!("touch sensor initialised");
        } else {
            warn!("touch sensor not found");
        }
    }

    pub fn data(&self) -> &SensorData {
        &self.data
    }

    pub fn ambient(&self) -> &AmbientEstimator {
        &self.ambient
    }

    /// Whether the ambient thresholds are trustworthy.
    pub fn is_warmed_up(&self) -> bool {
        self.ambient.is_warmed_up()
    }

    /// Restart the ambient warm-up ("recalibrate sensors").
    pub fn reset_warmup(&mut self) {
        info!("ambient warm-up restarted");
        self.ambient.reset();
    }

    /// Refresh [`SensorData`] from both devices.
    ///
    /// Writes derived thresholds into `config` when the warm-up completes.
    pub fn update(
        &mut self,
        sensors: &mut (impl LightSensorPort + TouchSensorPort),
        tunables: &Tunables,
        config: &mut Configuration,
    ) -> FusionOutcome {
        let mut outcome = FusionOutcome {
            light_presence_changed: self.update_light_presence(sensors),
            ..Default::default()
        };

        if self.data.has_light_sensor {
            outcome.thresholds_updated = self.read_light(sensors, tunables, config);
        }

        outcome.touch_presence_changed = self.update_touch(sensors);

        debug!(
            "sensors: brightness={:.3} distance={:.3} touch=({}, {})",
            self.data.brightness, self.data.distance, self.data.touch_left, self.data.touch_right,
        );

        outcome
    }

    fn update_light_presence(&mut self, light: &mut impl LightSensorPort) -> Option<bool> {
        let connected = light.is_connected();
        if connected == self.data.has_light_sensor {
            return None;
        }

        // Re-initialise on a flip either way; a vanished device stays absent
        // even if the driver reports a successful init.
        let was_present = self.data.has_light_sensor;
        let initialised = light.init();
        self.data.has_light_sensor = connected && initialised;

        if self.data.has_light_sensor {
            info!("light sensor reconnected");
        } else if connected {
            warn!("light sensor present but init failed");
        } else {
            warn!("light sensor disconnected");
        }

        (self.data.has_light_sensor != was_present).then_some(self.data.has_light_sensor)
    }

    fn read_light(
        &mut self,
        light: &mut impl LightSensorPort,
        tunables: &Tunables,
        config: &mut Configuration,
    ) -> bool {
        let sample = match light.read() {
            Ok(s) => s,
            Err(e) => {
                debug!("light sample dropped: {e}");
                return false;
            }
        };

        let max = tunables.sensor_raw_max;
        let proximity = sample.proximity as f32;
        if !(0.0..=max).contains(&sample.brightness) || proximity > max {
            debug!(
                "light sample out of range: brightness={} proximity={}",
                sample.brightness, sample.proximity
            );
            return false;
        }

        self.data.brightness = sample.brightness / max;
        self.data.distance = 1.0 - proximity / max;

        match self.ambient.accept(self.data.brightness, tunables) {
            Some(th) => {
                config.lower_brightness_threshold = th.lower;
                config.upper_brightness_threshold = th.upper;
                info!(
                    "ambient warm-up complete: ambient={:.3} thresholds=[{:.3}, {:.3}]",
                    self.ambient.value(),
                    th.lower,
                    th.upper
                );
                true
            }
            None => false,
        }
    }

    fn update_touch(&mut self, touch: &mut impl TouchSensorPort) -> Option<bool> {
        let was_present = self.data.has_touch_sensor;

        self.data.has_touch_sensor = if touch.is_connected() {
            true
        } else {
            touch.init()
        };

        let changed = (self.data.has_touch_sensor != was_present).then_some(self.data.has_touch_sensor);
        match changed {
            Some(true) => info!("touch sensor reconnected"),
            Some(false) => warn!("touch sensor disconnected"),
            None => {}
        }

        if !self.data.has_touch_sensor {
            self.data.touch_left = false;
            self.data.touch_right = false;
            return changed;
        }

        match touch.read() {
            // The pads are mounted mirrored relative to the driver channels.
            Ok(raw) => {
                self.data.touch_left = raw.right;
                self.data.touch_right = raw.left;
            }
            Err(e) => {
                debug!("touch read failed: {e}");
                self.data.touch_left = false;
                self.data.touch_right = false;
            }
        }

        changed
    }
}
