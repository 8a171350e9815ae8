//! Software step pulse engine
//!
//! For boards that drive a plain step/dir/enable driver (A4988, DRV8825,
//! TMC in standalone mode). The command side ([`FocuserStepper`]) only
//! updates atomics and kicks the pulse task; [`StepEngine::run`] generates
//! one pulse per step and re-checks for a stop between every step.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;
use portable_atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use focuser_core::motion::step_interval_ns;
use focuser_core::traits::{FocuserStepper, StepperError};

/// Shortest step pulse high time the drivers accept
pub const MIN_PULSE_HIGH_NS: u64 = 10_000;

/// Step pulse high time for a step period
///
/// Half the period, at least [`MIN_PULSE_HIGH_NS`], always leaving some
/// low time before the next step.
pub fn pulse_high_ns(period_ns: u64) -> u64 {
    if period_ns == 0 {
        return MIN_PULSE_HIGH_NS;
    }

    let high = (period_ns / 2).max(MIN_PULSE_HIGH_NS);
    if high >= period_ns {
        return (period_ns - 1).max(1);
    }
    high
}

/// Step, direction and enable outputs
pub struct StepPins<STEP, DIR, EN> {
    pub step: STEP,
    /// High moves toward larger positions
    pub dir: DIR,
    pub enable: EN,
    /// Driver enable input is active low (A4988/TMC `EN`)
    pub enable_active_low: bool,
}

impl<STEP, DIR, EN> StepPins<STEP, DIR, EN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    fn set_enabled(&mut self, enabled: bool) -> Result<(), StepperError> {
        let level = PinState::from(enabled != self.enable_active_low);
        self.enable.set_state(level).map_err(|_| StepperError::Io)
    }

    fn set_direction(&mut self, forward: bool) -> Result<(), StepperError> {
        self.dir
            .set_state(PinState::from(forward))
            .map_err(|_| StepperError::Io)
    }

    fn set_step(&mut self, high: bool) -> Result<(), StepperError> {
        self.step
            .set_state(PinState::from(high))
            .map_err(|_| StepperError::Io)
    }
}

/// Pulse engine state shared by the command side and the pulse task
pub struct StepEngine<M: RawMutex> {
    actual: AtomicI32,
    target: AtomicI32,
    interval_ns: AtomicU64,
    moving: AtomicBool,
    enabled: AtomicBool,
    kick: Signal<M, ()>,
}

impl<M: RawMutex> StepEngine<M> {
    pub fn new() -> Self {
        Self {
            actual: AtomicI32::new(0),
            target: AtomicI32::new(0),
            interval_ns: AtomicU64::new(step_interval_ns(1)),
            moving: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            kick: Signal::new(),
        }
    }

    pub fn interval_ns(&self) -> u64 {
        self.interval_ns.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Pulse task body
    pub async fn run<STEP, DIR, EN, D>(&self, mut pins: StepPins<STEP, DIR, EN>, mut delay: D) -> !
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        D: DelayNs,
    {
        if pins.set_step(false).is_err() {
            error!("step pin init failed");
        }
        loop {
            self.kick.wait().await;
            self.service(&mut pins, &mut delay).await;
        }
    }

    /// Apply the enable state and step until the target is reached or the
    /// move is stopped
    pub async fn service<STEP, DIR, EN, D>(&self, pins: &mut StepPins<STEP, DIR, EN>, delay: &mut D)
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        D: DelayNs,
    {
        loop {
            let enabled = self.enabled.load(Ordering::Relaxed);
            if let Err(e) = pins.set_enabled(enabled) {
                error!("enable pin update failed: {}", e);
            }

            if !self.moving.load(Ordering::Acquire) {
                return;
            }

            let actual = self.actual.load(Ordering::Relaxed);
            let target = self.target.load(Ordering::Relaxed);
            if actual == target {
                self.moving.store(false, Ordering::Release);
                return;
            }

            if !enabled {
                warn!("move to {} aborted, driver disabled", target);
                self.abort();
                return;
            }

            let forward = target > actual;
            if let Err(e) = self.pulse(pins, delay, forward).await {
                error!("step pulse failed: {}", e);
                self.abort();
                return;
            }
        }
    }

    /// Count a step; the position moves on the rising edge
    fn advance(&self, forward: bool) {
        let delta = if forward { 1 } else { -1 };
        let reached = self.actual.fetch_add(delta, Ordering::Relaxed) + delta;
        if reached == self.target.load(Ordering::Relaxed) {
            self.moving.store(false, Ordering::Release);
        }
    }

    async fn pulse<STEP, DIR, EN, D>(
        &self,
        pins: &mut StepPins<STEP, DIR, EN>,
        delay: &mut D,
        forward: bool,
    ) -> Result<(), StepperError>
    where
        STEP: OutputPin,
        DIR: OutputPin,
        EN: OutputPin,
        D: DelayNs,
    {
        let period_ns = self.interval_ns.load(Ordering::Relaxed);
        let high_ns = pulse_high_ns(period_ns);

        pins.set_direction(forward)?;
        pins.set_step(true)?;
        self.advance(forward);
        delay.delay_ns(clamp_ns(high_ns)).await;
        pins.set_step(false)?;
        delay.delay_ns(clamp_ns(period_ns.saturating_sub(high_ns))).await;
        Ok(())
    }

    fn abort(&self) {
        self.target
            .store(self.actual.load(Ordering::Relaxed), Ordering::Relaxed);
        self.moving.store(false, Ordering::Release);
    }
}

impl<M: RawMutex> Default for StepEngine<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_ns(ns: u64) -> u32 {
    u32::try_from(ns).unwrap_or(u32::MAX)
}

impl<M: RawMutex> FocuserStepper for StepEngine<M> {
    fn is_ready(&self) -> bool {
        true
    }

    fn set_reference_position(&self, position: i32) -> Result<(), StepperError> {
        self.abort();
        self.actual.store(position, Ordering::Relaxed);
        self.target.store(position, Ordering::Relaxed);
        Ok(())
    }

    fn set_microstep_interval(&self, interval_ns: u64) -> Result<(), StepperError> {
        if interval_ns == 0 {
            return Err(StepperError::InvalidArgument);
        }
        self.interval_ns.store(interval_ns, Ordering::Relaxed);
        Ok(())
    }

    fn move_to(&self, target: i32) -> Result<(), StepperError> {
        self.target.store(target, Ordering::Relaxed);
        let moving = self.actual.load(Ordering::Relaxed) != target;
        self.moving.store(moving, Ordering::Release);
        if moving {
            self.kick.signal(());
        }
        Ok(())
    }

    fn is_moving(&self) -> Result<bool, StepperError> {
        Ok(self.moving.load(Ordering::Acquire))
    }

    fn stop(&self) -> Result<(), StepperError> {
        self.abort();
        Ok(())
    }

    fn actual_position(&self) -> Result<i32, StepperError> {
        Ok(self.actual.load(Ordering::Relaxed))
    }

    fn enable_driver(&self, enable: bool) -> Result<(), StepperError> {
        if self.enabled.swap(enable, Ordering::Relaxed) == enable {
            return Err(StepperError::AlreadyInState);
        }
        self.kick.signal(());
        Ok(())
    }
}
