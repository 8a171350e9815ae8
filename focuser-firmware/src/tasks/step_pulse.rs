//! Step pulse task
//!
//! Generates step/dir pulses for the moves the motion loop hands to the
//! step engine.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::Delay;

use focuser_drivers::stepper::StepPins;

use crate::channels::Engine;

/// Step pulse task - drives the STEP, DIR and ENABLE pins
#[embassy_executor::task]
pub async fn step_pulse_task(
    engine: &'static Engine,
    pins: StepPins<Output<'static>, Output<'static>, Output<'static>>,
) {
    info!("Step pulse task started");

    engine.run(pins, Delay).await
}
