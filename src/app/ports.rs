//! Port traits — the hexagonal boundary between the control core and the device.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FlowerService (domain)
//! ```
//!
//! Driven adapters (bus drivers, LED strip, clock, storage, transport)
//! implement these traits.  The [`FlowerService`](super::service::FlowerService)
//! consumes them via generics, so the control core never touches a bus or a
//! pin directly.  Sensor hot-plug is handled by calling `init()` again on the
//! same handle; no driver object is ever rebuilt.

use embedded_hal::delay::DelayNs;
use smart_leds::RGB8;

use crate::error::{SensorError, StorageError};

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One raw sample from the combined ambient-light / proximity sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightSample {
    /// Raw ambient-light value (valid range `0..=sensor_raw_max`).
    pub brightness: f32,
    /// Raw proximity count; larger means nearer (valid range `0..=sensor_raw_max`).
    pub proximity: u32,
}

/// Ambient-light / proximity sensor.
pub trait LightSensorPort {
    /// (Re-)initialise the device.  Returns `true` on success.
    fn init(&mut self) -> bool;

    /// Whether the device currently acknowledges on the bus.
    fn is_connected(&mut self) -> bool;

    /// Read one sample.
    fn read(&mut self) -> Result<LightSample, SensorError>;
}

/// Raw per-pad touch state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchSample {
    pub left: bool,
    pub right: bool,
}

/// Two-pad capacitive touch controller.
pub trait TouchSensorPort {
    /// (Re-)initialise the device.  Returns `true` on success.
    fn init(&mut self) -> bool;

    /// Whether the device currently acknowledges on the bus.
    fn is_connected(&mut self) -> bool;

    /// Read both pads.
    fn read(&mut self) -> Result<TouchSample, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → stepper driver)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCurrent {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteppingMode {
    Full,
    Micro,
}

/// Stepper driver with an absolute micro-step counter and an end-stop
/// homing routine.
pub trait MotorPort {
    /// Whether the driver has found its closed reference position.
    fn is_calibrated(&self) -> bool;

    /// Absolute position in micro-steps (0 = closed).
    fn position(&self) -> i32;

    /// Whether a rotation is in progress.
    fn is_moving(&self) -> bool;

    /// Stop the current rotation immediately.
    fn stop(&mut self);

    fn set_current(&mut self, current: MotorCurrent);

    fn set_direction(&mut self, direction: Direction);

    /// Number of full steps for the next rotation.
    fn set_steps(&mut self, steps: u32);

    fn set_stepping_mode(&mut self, mode: SteppingMode);

    /// Take the driver out of sleep.
    fn wake(&mut self);

    /// Start (or re-time) rotation with the given step period in seconds.
    fn rotate(&mut self, step_period_secs: f32);
}

// ───────────────────────────────────────────────────────────────
// LED strip port (driven adapter: domain → addressable LEDs)
// ───────────────────────────────────────────────────────────────

/// Addressable LED ring.  Rendering is synchronous and assumed fast.
pub trait LedStripPort {
    fn show(&mut self, frame: &[RGB8]);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
}

pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Local time of day, `None` until the wall clock is synchronised.
    fn local_time(&self) -> Option<WallTime>;
}

/// Everything the control core drives on the device itself.
///
/// Blanket-implemented, so a single adapter (or a test mock) that implements
/// each port can be handed to the service as one value.
pub trait FlowerHardware:
    LightSensorPort + TouchSensorPort + MotorPort + LedStripPort + ClockPort + DelayNs
{
}

impl<T> FlowerHardware for T where
    T: LightSensorPort + TouchSensorPort + MotorPort + LedStripPort + ClockPort + DelayNs
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → transport / logging)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s through
/// this port.  Adapters decide where they go (serial log, MQTT, web UI).
/// Calls are fire-and-forget.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Write operations MUST be atomic per key — no partial writes on power
/// loss.  The ESP-IDF NVS API guarantees this natively; in-memory
/// simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}
