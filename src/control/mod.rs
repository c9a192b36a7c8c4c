//! Closed-loop control: petal motor state machine and LED brightness adaptation.

pub mod adaptive_brightness;
pub mod motor;
