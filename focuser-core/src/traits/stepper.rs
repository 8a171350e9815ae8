//! Stepper capability trait
//!
//! The motion controller drives the focuser motor through this trait. A
//! driver that exposes a move-to-position primitive implements it directly;
//! raw step/dir hardware is wrapped by a pulse engine that provides the same
//! contract.

/// Errors that can occur with stepper operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Driver hardware is not available
    NotReady,
    /// Communication with the driver failed
    Io,
    /// Argument rejected by the driver (e.g. zero interval)
    InvalidArgument,
    /// Driver is already in the requested enable state
    AlreadyInState,
}

/// Stepper capability consumed by the focuser
///
/// All methods take `&self`: the command task and the motion task share one
/// instance, so implementations use interior mutability.
pub trait FocuserStepper {
    /// Check whether the driver hardware is usable
    fn is_ready(&self) -> bool;

    /// Re-base the position counter without moving
    fn set_reference_position(&self, position: i32) -> Result<(), StepperError>;

    /// Set the time between step pulses in nanoseconds (0 is invalid)
    fn set_microstep_interval(&self, interval_ns: u64) -> Result<(), StepperError>;

    /// Start moving toward an absolute target
    ///
    /// Non-blocking; completion is observed through [`is_moving`](Self::is_moving).
    fn move_to(&self, target: i32) -> Result<(), StepperError>;

    /// Check if a move is in progress
    fn is_moving(&self) -> Result<bool, StepperError>;

    /// Halt motion immediately, keeping the current position
    fn stop(&self) -> Result<(), StepperError>;

    /// Position the motor has actually reached
    fn actual_position(&self) -> Result<i32, StepperError>;

    /// Enable or disable the driver output stage
    ///
    /// Returns [`StepperError::AlreadyInState`] when nothing changed; callers
    /// treat that as success.
    fn enable_driver(&self, enable: bool) -> Result<(), StepperError>;
}

impl<T: FocuserStepper + ?Sized> FocuserStepper for &T {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn set_reference_position(&self, position: i32) -> Result<(), StepperError> {
        (**self).set_reference_position(position)
    }

    fn set_microstep_interval(&self, interval_ns: u64) -> Result<(), StepperError> {
        (**self).set_microstep_interval(interval_ns)
    }

    fn move_to(&self, target: i32) -> Result<(), StepperError> {
        (**self).move_to(target)
    }

    fn is_moving(&self) -> Result<bool, StepperError> {
        (**self).is_moving()
    }

    fn stop(&self) -> Result<(), StepperError> {
        (**self).stop()
    }

    fn actual_position(&self) -> Result<i32, StepperError> {
        (**self).actual_position()
    }

    fn enable_driver(&self, enable: bool) -> Result<(), StepperError> {
        (**self).enable_driver(enable)
    }
}
