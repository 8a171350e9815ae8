//! Configuration type definitions
//!
//! The firmware builds a [`FocuserConfig`] from constants generated out of
//! `focuser.toml` at compile time.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum firmware version string length
pub const MAX_VERSION_LEN: usize = 8;

/// Version reported by `GV` unless configured otherwise
pub const DEFAULT_FIRMWARE_VERSION: &str = "10";

/// Default motion poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 5;

/// Default speed multiplier (fastest)
pub const DEFAULT_INITIAL_SPEED: u8 = 1;

/// Focuser behavior configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FocuserConfig {
    /// Text answered to `GV`
    pub firmware_version: String<MAX_VERSION_LEN>,
    /// How often the motion task polls the stepper while moving
    pub poll_interval_ms: u32,
    /// Speed multiplier applied at startup
    pub initial_speed: u8,
}

impl FocuserConfig {
    /// Create a config, truncating the version to [`MAX_VERSION_LEN`]
    pub fn new(firmware_version: &str, poll_interval_ms: u32, initial_speed: u8) -> Self {
        let mut version = String::new();
        for ch in firmware_version.chars() {
            if version.push(ch).is_err() {
                break;
            }
        }

        Self {
            firmware_version: version,
            poll_interval_ms,
            initial_speed,
        }
    }
}

impl Default for FocuserConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_FIRMWARE_VERSION,
            DEFAULT_POLL_INTERVAL_MS,
            DEFAULT_INITIAL_SPEED,
        )
    }
}
