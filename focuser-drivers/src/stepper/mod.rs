//! Stepper driver implementations

pub mod step_engine;

pub use step_engine::{pulse_high_ns, StepEngine, StepPins, MIN_PULSE_HIGH_NS};
