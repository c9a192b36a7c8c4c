//! Fuzz target: `LightCommand::from_json`
//!
//! Feeds arbitrary bytes to the light command parser and, when they parse,
//! applies the command to a fresh shared state.  Checks:
//! - No panics under any payload
//! - Exactly one effect mode is active afterwards
//! - A colour always forces the static mode
//!
//! cargo fuzz run fuzz_light_command

#![no_main]

use bionicflower::app::commands::LightCommand;
use bionicflower::config::Color;
use bionicflower::shared::{EffectMode, SharedLightState};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(cmd) = LightCommand::from_json(text) else {
        return;
    };

    let shared = SharedLightState::new();
    if let Some(mode) = cmd.effect_mode() {
        shared.set_effect_mode(mode);
    }
    if let Some(brightness) = cmd.brightness {
        shared.set_brightness(brightness);
    }
    let recoloured = cmd.color_over(Color::new(0, 145, 220)).is_some();
    if recoloured {
        shared.set_effect_mode(EffectMode::None);
    }
    if let Some(on) = cmd.light_on() {
        shared.set_light_on(on);
    }

    assert_eq!(shared.mode_flags().active_count(), 1);
    if recoloured {
        assert_eq!(shared.effect_mode(), EffectMode::None);
    }
});
