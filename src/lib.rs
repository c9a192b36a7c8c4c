//! Bionic Flower control library.
//!
//! The control core of a motorised flower: a stepper drives the petals, an
//! LED ring renders effects, and an ambient-light / proximity sensor plus
//! two capacitive pads provide input.  Everything hardware-specific sits
//! behind the port traits in [`app::ports`], so the whole core runs on the
//! host against mock adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod effects;
pub mod error;
pub mod gestures;
pub mod persistence;
pub mod sensors;
pub mod shared;

pub use app::service::FlowerService;
pub use shared::SharedLightState;
