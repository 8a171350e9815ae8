//! Embassy async tasks
//!
//! Each task runs independently; they share the receive queue, the
//! focuser and the step engine.

pub mod command;
pub mod motion;
pub mod serial_rx;
pub mod step_pulse;

pub use command::command_task;
pub use motion::motion_task;
pub use serial_rx::serial_rx_task;
pub use step_pulse::step_pulse_task;
