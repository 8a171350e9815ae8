//! Focuser motion control
//!
//! Shared state, speed-to-cadence math and the motion controller that
//! serves both the command task and the motion task.

pub mod focuser;
pub mod state;
pub mod timing;

pub use focuser::{Focuser, FocuserError};
pub use state::FocuserState;
pub use timing::{step_interval_ns, steps_per_second};
