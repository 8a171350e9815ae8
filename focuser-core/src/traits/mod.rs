//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod stepper;
pub mod store;

pub use stepper::{FocuserStepper, StepperError};
pub use store::{NullPositionStore, PositionStore};
