//! Board configuration
//!
//! Constants are generated from focuser.toml by build.rs, which has
//! already validated every value.

use focuser_core::config::FocuserConfig;

include!(concat!(env!("OUT_DIR"), "/focuser_config.rs"));

/// Runtime focuser settings from the board configuration
pub fn focuser_config() -> FocuserConfig {
    FocuserConfig::new(FIRMWARE_VERSION, POLL_INTERVAL_MS, INITIAL_SPEED)
}
