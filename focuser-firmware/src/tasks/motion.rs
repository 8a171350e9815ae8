//! Motion control task
//!
//! Runs the focuser motion loop. This is the only context that starts
//! moves on the step engine.

use defmt::*;
use embassy_time::Delay;

use crate::channels::AppFocuser;

/// Motion task - services move requests forever
#[embassy_executor::task]
pub async fn motion_task(focuser: &'static AppFocuser) {
    info!("Motion task started (poll every {} ms)", focuser.config().poll_interval_ms);

    focuser.run(Delay).await
}
