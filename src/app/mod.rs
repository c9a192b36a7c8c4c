//! Application core — pure domain logic, zero I/O.
//!
//! This module wires the flower's behaviour together: sensor fusion, the
//! petal state machine, touch gestures, effects and persistence.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
