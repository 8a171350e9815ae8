//! Shared focuser state
//!
//! One [`FocuserState`] is guarded by the focuser's mutex. The command path
//! records intent in `move_request`/`cancel_move`/`save_request`; the motion
//! task consumes those flags.

use super::timing::step_interval_ns;

/// State shared between the command and motion tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FocuserState {
    /// A move to `desired_position` is waiting for the motion task
    pub move_request: bool,
    /// Motion must halt at the next opportunity
    pub cancel_move: bool,
    /// `desired_position` must be written to the position store
    pub save_request: bool,
    /// Target written by `SN`, not yet acted upon
    pub staged_position: u16,
    /// Position being driven toward, or the last known position when idle
    pub desired_position: u16,
    /// Speed multiplier byte, never 0
    pub speed_multiplier: u8,
    /// Step interval derived from `speed_multiplier`
    pub step_interval_ns: u64,
    /// Half-step mode flag
    pub half_step: bool,
    /// Temperature coefficient (two's complement)
    pub temperature_coeff: i8,
}

impl FocuserState {
    pub fn new(speed_multiplier: u8) -> Self {
        let mut state = Self {
            move_request: false,
            cancel_move: false,
            save_request: false,
            staged_position: 0,
            desired_position: 0,
            speed_multiplier: 1,
            step_interval_ns: step_interval_ns(1),
            half_step: false,
            temperature_coeff: 0,
        };
        state.set_speed(speed_multiplier);
        state
    }

    /// Store a speed multiplier (0 clamps to 1) and refresh the interval
    pub fn set_speed(&mut self, multiplier: u8) {
        self.speed_multiplier = multiplier.max(1);
        self.step_interval_ns = step_interval_ns(self.speed_multiplier);
    }

    /// Adopt `position` as both staged and desired, dropping pending intent
    pub fn rebase(&mut self, position: u16) {
        self.staged_position = position;
        self.desired_position = position;
        self.move_request = false;
        self.cancel_move = false;
    }
}

impl Default for FocuserState {
    fn default() -> Self {
        Self::new(1)
    }
}
