//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements    | Connects to                          |
//! |-------------|---------------|--------------------------------------|
//! | `led_strip` | LedStripPort  | any `smart_leds::SmartLedsWrite`     |
//! | `log_sink`  | EventSink     | Serial log output                    |
//! | `nvs`       | StoragePort   | NVS / in-memory store                |
//! | `time`      | ClockPort     | Monotonic timer + synced wall clock  |
//!
//! Sensor and stepper drivers live with the board support code; they only
//! need to implement the sensor and motor ports.

pub mod led_strip;
pub mod log_sink;
pub mod nvs;
pub mod time;
