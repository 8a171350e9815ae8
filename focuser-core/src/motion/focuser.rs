//! Focuser motion controller
//!
//! [`Focuser`] is shared by two tasks:
//!
//! - the command task calls the capability methods (through
//!   [`Handler`]) which only touch the guarded state, plus short hardware
//!   queries made outside the lock
//! - the motion task sleeps in [`Focuser::run`] until woken, then executes
//!   pending moves and cancellations
//!
//! Intent travels through the `move_request`/`cancel_move`/`save_request`
//! flags; the wake signal carries no data, so repeated wakes coalesce
//! without losing the latest request. Position writes happen only in the
//! motion task.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use moonlite_protocol::Handler;

use super::state::FocuserState;
use crate::config::FocuserConfig;
use crate::traits::{FocuserStepper, PositionStore, StepperError};

/// Errors that stop the focuser from starting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FocuserError {
    /// Stepper hardware is not available
    DeviceNotReady,
    /// A zero step interval was about to reach the driver
    InvalidInterval,
    /// Stepper command failed
    Stepper(StepperError),
}

impl From<StepperError> for FocuserError {
    fn from(e: StepperError) -> Self {
        FocuserError::Stepper(e)
    }
}

/// Work picked up by the motion task
enum Action {
    Cancel,
    Move { target: u16, interval_ns: u64 },
    Save(u16),
    Idle,
}

/// Motion controller for a single focuser motor
pub struct Focuser<M: RawMutex, S, P> {
    state: Mutex<M, RefCell<FocuserState>>,
    wake: Signal<M, ()>,
    stepper: S,
    store: AsyncMutex<M, P>,
    config: FocuserConfig,
}

impl<M, S, P> Focuser<M, S, P>
where
    M: RawMutex,
    S: FocuserStepper,
    P: PositionStore,
{
    pub fn new(stepper: S, store: P, config: FocuserConfig) -> Self {
        Self {
            state: Mutex::new(RefCell::new(FocuserState::new(config.initial_speed))),
            wake: Signal::new(),
            stepper,
            store: AsyncMutex::new(store),
            config,
        }
    }

    /// Snapshot of the shared state
    pub fn state(&self) -> FocuserState {
        self.with_state(|s| *s)
    }

    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    pub fn config(&self) -> &FocuserConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FocuserState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    async fn persist(&self, position: u16) {
        self.store.lock().await.save(position).await;
    }

    /// Bring up the hardware and restore the persisted position
    ///
    /// Must succeed before the command and motion tasks start.
    pub async fn initialise(&self) -> Result<(), FocuserError> {
        let restored = self.store.lock().await.load().await;

        if !self.stepper.is_ready() {
            error!("stepper not ready");
            return Err(FocuserError::DeviceNotReady);
        }

        self.set_driver_enabled(true)?;

        let position = restored.unwrap_or(0);
        self.stepper.set_reference_position(i32::from(position))?;

        let interval_ns = self.with_state(|s| {
            s.staged_position = position;
            s.desired_position = position;
            s.step_interval_ns
        });
        self.apply_interval(interval_ns)?;

        info!(
            "focuser ready at {} (restored: {})",
            position,
            restored.is_some()
        );
        Ok(())
    }

    fn apply_interval(&self, interval_ns: u64) -> Result<(), FocuserError> {
        if interval_ns == 0 {
            return Err(FocuserError::InvalidInterval);
        }
        self.stepper.set_microstep_interval(interval_ns)?;
        Ok(())
    }

    fn set_driver_enabled(&self, enable: bool) -> Result<(), StepperError> {
        match self.stepper.enable_driver(enable) {
            Ok(()) | Err(StepperError::AlreadyInState) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Actual hardware position, `None` if the query failed
    fn read_actual(&self) -> Option<u16> {
        match self.stepper.actual_position() {
            Ok(position) => Some(position as u16),
            Err(e) => {
                warn!("position query failed: {}", e);
                None
            }
        }
    }

    /// Halt motion and release the driver
    ///
    /// Safe to call at any time; with no move in flight it only settles the
    /// state on the current position. The motion task persists the position
    /// once it has consumed the cancel.
    pub fn stop(&self) {
        let actual = self.read_actual();

        let position = self.with_state(|s| {
            s.cancel_move = true;
            s.move_request = false;
            if let Some(position) = actual {
                s.desired_position = position;
            }
            s.desired_position
        });
        info!("stop at {}", position);

        if let Err(e) = self.stepper.stop() {
            error!("stepper stop failed: {}", e);
        }
        if let Err(e) = self.set_driver_enabled(false) {
            error!("driver disable failed: {}", e);
        }

        self.wake.signal(());
    }

    /// Actual position, falling back to the last known one
    pub fn current_position(&self) -> u16 {
        let actual = self.read_actual();
        let position = self.with_state(|s| {
            // A pending goto owns desired_position until the motion task takes it
            if let (Some(position), false) = (actual, s.move_request) {
                s.desired_position = position;
            }
            actual.unwrap_or(s.desired_position)
        });
        debug!("current position {}", position);
        position
    }

    /// Re-base the position counter without moving
    pub fn set_current_position(&self, position: u16) {
        info!("set current position {}", position);
        if let Err(e) = self.stepper.set_reference_position(i32::from(position)) {
            error!("reference position update failed: {}", e);
        }
        self.with_state(|s| {
            s.rebase(position);
            s.save_request = true;
        });
        self.wake.signal(());
    }

    pub fn new_position(&self) -> u16 {
        self.with_state(|s| s.staged_position)
    }

    pub fn set_new_position(&self, position: u16) {
        info!("set new position {}", position);
        self.with_state(|s| s.staged_position = position);
    }

    /// Request a move to the staged position
    pub fn go_to_new_position(&self) {
        let target = self.with_state(|s| {
            s.desired_position = s.staged_position;
            s.move_request = true;
            s.cancel_move = false;
            s.desired_position
        });
        info!("go to {}", target);
        self.wake.signal(());
    }

    pub fn is_half_step(&self) -> bool {
        self.with_state(|s| s.half_step)
    }

    pub fn set_half_step(&self, enabled: bool) {
        info!("half step {}", enabled);
        self.with_state(|s| s.half_step = enabled);
    }

    /// Live motion query; a failed query reports not moving
    pub fn is_moving(&self) -> bool {
        match self.stepper.is_moving() {
            Ok(moving) => moving,
            Err(e) => {
                warn!("motion query failed: {}", e);
                false
            }
        }
    }

    pub fn firmware_version(&self) -> &str {
        self.config.firmware_version.as_str()
    }

    pub fn speed(&self) -> u8 {
        self.with_state(|s| s.speed_multiplier)
    }

    /// Set the speed multiplier (0 clamps to 1) and re-apply the interval
    pub fn set_speed(&self, multiplier: u8) {
        let (speed, interval_ns) = self.with_state(|s| {
            s.set_speed(multiplier);
            (s.speed_multiplier, s.step_interval_ns)
        });
        info!("set speed {} ({} ns/step)", speed, interval_ns);

        if let Err(e) = self.apply_interval(interval_ns) {
            error!("step interval update failed: {}", e);
        }
    }

    /// No sensor is fitted
    pub fn temperature(&self) -> u16 {
        0
    }

    pub fn temperature_coefficient_raw(&self) -> u8 {
        self.with_state(|s| s.temperature_coeff as u8)
    }

    /// Wait until a command needs the motion task
    pub async fn wait_for_wake(&self) {
        self.wake.wait().await;
    }

    /// Execute pending work until no request remains
    pub async fn service<D: DelayNs>(&self, delay: &mut D) {
        loop {
            let action = self.with_state(|s| {
                if s.cancel_move {
                    s.cancel_move = false;
                    Action::Cancel
                } else if s.move_request {
                    s.move_request = false;
                    Action::Move {
                        target: s.desired_position,
                        interval_ns: s.step_interval_ns,
                    }
                } else if s.save_request {
                    s.save_request = false;
                    Action::Save(s.desired_position)
                } else {
                    Action::Idle
                }
            });

            match action {
                Action::Cancel => {
                    self.settle_cancel().await;
                    break;
                }
                Action::Move {
                    target,
                    interval_ns,
                } => {
                    if !self.move_to(target, interval_ns, delay).await {
                        break;
                    }
                }
                Action::Save(position) => self.persist(position).await,
                Action::Idle => break,
            }
        }
    }

    /// Motion task body
    pub async fn run<D: DelayNs>(&self, mut delay: D) -> ! {
        loop {
            self.wait_for_wake().await;
            self.service(&mut delay).await;
        }
    }

    async fn settle_cancel(&self) {
        if let Err(e) = self.stepper.stop() {
            error!("stepper stop failed: {}", e);
        }
        let actual = self.read_actual();
        let position = self.with_state(|s| {
            if let Some(position) = actual {
                s.desired_position = position;
            }
            s.save_request = false;
            s.desired_position
        });
        debug!("cancelled at {}", position);
        self.persist(position).await;
    }

    /// Drive to `target`; returns whether a newer request is already pending
    async fn move_to<D: DelayNs>(&self, target: u16, interval_ns: u64, delay: &mut D) -> bool {
        debug!("moving to {}", target);

        if let Err(e) = self.set_driver_enabled(true) {
            error!("driver enable failed: {}", e);
            return self.with_state(|s| s.move_request);
        }

        if let Err(e) = self.apply_interval(interval_ns) {
            error!("step interval update failed: {}", e);
        }

        match self.stepper.move_to(i32::from(target)) {
            Ok(()) => self.wait_for_motion(delay).await,
            Err(e) => error!("move to {} failed: {}", target, e),
        }

        let actual = self.read_actual();
        let (position, pending) = self.with_state(|s| {
            // A goto issued mid-move already owns desired_position
            if s.move_request {
                return (actual, true);
            }
            if let Some(position) = actual {
                s.desired_position = position;
            }
            s.save_request = false;
            (Some(s.desired_position), false)
        });

        if let Some(position) = position {
            debug!("move ended at {}", position);
            self.persist(position).await;
        }

        if !pending {
            if let Err(e) = self.set_driver_enabled(false) {
                error!("driver disable failed: {}", e);
            }
        }

        pending
    }

    async fn wait_for_motion<D: DelayNs>(&self, delay: &mut D) {
        loop {
            let cancelled = self.with_state(|s| core::mem::replace(&mut s.cancel_move, false));
            if cancelled {
                info!("move cancelled");
                if let Err(e) = self.stepper.stop() {
                    error!("stepper stop failed: {}", e);
                }
                break;
            }

            match self.stepper.is_moving() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("motion query failed: {}", e);
                    break;
                }
            }

            delay.delay_ms(self.config.poll_interval_ms).await;
        }
    }
}

impl<M, S, P> Handler for &Focuser<M, S, P>
where
    M: RawMutex,
    S: FocuserStepper,
    P: PositionStore,
{
    fn stop(&mut self) {
        Focuser::stop(*self)
    }

    fn current_position(&mut self) -> u16 {
        Focuser::current_position(*self)
    }

    fn set_current_position(&mut self, position: u16) {
        Focuser::set_current_position(*self, position)
    }

    fn new_position(&mut self) -> u16 {
        Focuser::new_position(*self)
    }

    fn set_new_position(&mut self, position: u16) {
        Focuser::set_new_position(*self, position)
    }

    fn go_to_new_position(&mut self) {
        Focuser::go_to_new_position(*self)
    }

    fn is_half_step(&mut self) -> bool {
        Focuser::is_half_step(*self)
    }

    fn set_half_step(&mut self, enabled: bool) {
        Focuser::set_half_step(*self, enabled)
    }

    fn is_moving(&mut self) -> bool {
        Focuser::is_moving(*self)
    }

    fn firmware_version(&mut self) -> &str {
        Focuser::firmware_version(*self)
    }

    fn speed(&mut self) -> u8 {
        Focuser::speed(*self)
    }

    fn set_speed(&mut self, speed: u8) {
        Focuser::set_speed(*self, speed)
    }

    fn temperature(&mut self) -> u16 {
        Focuser::temperature(*self)
    }

    fn temperature_coefficient_raw(&mut self) -> u8 {
        Focuser::temperature_coefficient_raw(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use moonlite_protocol::Parser;

    /// Stepper double that advances a fixed number of steps per motion query
    struct FakeStepper {
        ready: bool,
        actual: Cell<i32>,
        target: Cell<i32>,
        moving: Cell<bool>,
        enabled: Cell<bool>,
        interval_ns: Cell<u64>,
        reference: Cell<Option<i32>>,
        steps_per_poll: i32,
        stops: Cell<u32>,
        moves: RefCell<Vec<i32>>,
        fail_position: Cell<bool>,
        fail_motion: Cell<bool>,
    }

    impl FakeStepper {
        fn new() -> Self {
            Self {
                ready: true,
                actual: Cell::new(0),
                target: Cell::new(0),
                moving: Cell::new(false),
                enabled: Cell::new(false),
                interval_ns: Cell::new(0),
                reference: Cell::new(None),
                steps_per_poll: 1000,
                stops: Cell::new(0),
                moves: RefCell::new(Vec::new()),
                fail_position: Cell::new(false),
                fail_motion: Cell::new(false),
            }
        }

        fn with_steps_per_poll(steps: i32) -> Self {
            Self {
                steps_per_poll: steps,
                ..Self::new()
            }
        }
    }

    impl FocuserStepper for FakeStepper {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn set_reference_position(&self, position: i32) -> Result<(), StepperError> {
            self.reference.set(Some(position));
            self.actual.set(position);
            self.target.set(position);
            Ok(())
        }

        fn set_microstep_interval(&self, interval_ns: u64) -> Result<(), StepperError> {
            if interval_ns == 0 {
                return Err(StepperError::InvalidArgument);
            }
            self.interval_ns.set(interval_ns);
            Ok(())
        }

        fn move_to(&self, target: i32) -> Result<(), StepperError> {
            self.moves.borrow_mut().push(target);
            self.target.set(target);
            self.moving.set(self.actual.get() != target);
            Ok(())
        }

        fn is_moving(&self) -> Result<bool, StepperError> {
            if self.fail_motion.get() {
                return Err(StepperError::Io);
            }
            if self.moving.get() {
                let actual = self.actual.get();
                let remaining = self.target.get() - actual;
                let step = remaining.clamp(-self.steps_per_poll, self.steps_per_poll);
                self.actual.set(actual + step);
                self.moving.set(self.actual.get() != self.target.get());
            }
            Ok(self.moving.get())
        }

        fn stop(&self) -> Result<(), StepperError> {
            self.stops.set(self.stops.get() + 1);
            self.moving.set(false);
            self.target.set(self.actual.get());
            Ok(())
        }

        fn actual_position(&self) -> Result<i32, StepperError> {
            if self.fail_position.get() {
                return Err(StepperError::Io);
            }
            Ok(self.actual.get())
        }

        fn enable_driver(&self, enable: bool) -> Result<(), StepperError> {
            if self.enabled.get() == enable {
                return Err(StepperError::AlreadyInState);
            }
            self.enabled.set(enable);
            Ok(())
        }
    }

    /// Store double backed by cells owned by the test
    struct CellStore<'a> {
        value: &'a Cell<Option<u16>>,
        writes: &'a Cell<u32>,
    }

    impl PositionStore for CellStore<'_> {
        async fn load(&mut self) -> Option<u16> {
            self.value.get()
        }

        async fn save(&mut self, position: u16) {
            if self.value.get() == Some(position) {
                return;
            }
            self.value.set(Some(position));
            self.writes.set(self.writes.get() + 1);
        }
    }

    /// Delay that runs a hook instead of sleeping
    struct HookDelay<F: FnMut(u32)> {
        calls: u32,
        hook: F,
    }

    impl<F: FnMut(u32)> HookDelay<F> {
        fn new(hook: F) -> Self {
            Self { calls: 0, hook }
        }
    }

    impl<F: FnMut(u32)> DelayNs for HookDelay<F> {
        async fn delay_ns(&mut self, _ns: u32) {
            self.calls += 1;
            (self.hook)(self.calls);
        }
    }

    fn no_delay() -> HookDelay<impl FnMut(u32)> {
        HookDelay::new(|_| {})
    }

    type TestFocuser<'a> = Focuser<NoopRawMutex, &'a FakeStepper, CellStore<'a>>;

    fn focuser<'a>(
        stepper: &'a FakeStepper,
        value: &'a Cell<Option<u16>>,
        writes: &'a Cell<u32>,
    ) -> TestFocuser<'a> {
        Focuser::new(stepper, CellStore { value, writes }, FocuserConfig::default())
    }

    #[test]
    fn test_initialise_not_ready() {
        let stepper = FakeStepper {
            ready: false,
            ..FakeStepper::new()
        };
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        assert_eq!(block_on(f.initialise()), Err(FocuserError::DeviceNotReady));
        assert!(!stepper.enabled.get());
        assert_eq!(stepper.reference.get(), None);
    }

    #[test]
    fn test_initialise_restores_position() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(Some(500)), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        assert_eq!(block_on(f.initialise()), Ok(()));
        assert!(stepper.enabled.get());
        assert_eq!(stepper.reference.get(), Some(500));
        assert_eq!(stepper.interval_ns.get(), 500_000);
        assert_eq!(f.new_position(), 500);
        assert_eq!(f.state().desired_position, 500);
    }

    #[test]
    fn test_initialise_without_record_starts_at_zero() {
        let stepper = FakeStepper::new();
        stepper.enabled.set(true);
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        // Already-enabled driver is not an error
        assert_eq!(block_on(f.initialise()), Ok(()));
        assert_eq!(stepper.reference.get(), Some(0));
        assert_eq!(f.state().desired_position, 0);
        assert_eq!(writes.get(), 0);
    }

    #[test]
    fn test_set_speed_zero_clamps_to_one() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        f.set_speed(5);
        f.set_speed(0);
        assert_eq!(f.speed(), 1);
        assert_eq!(f.state().step_interval_ns, 500_000);
        assert_eq!(stepper.interval_ns.get(), 500_000);
    }

    #[test]
    fn test_set_speed_slow_hits_floor() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        f.set_speed(40);
        assert_eq!(f.speed(), 40);
        assert_eq!(stepper.interval_ns.get(), 10_000_000);
    }

    #[test]
    fn test_goto_moves_and_persists() {
        let stepper = FakeStepper::with_steps_per_poll(50);
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(300);
        assert_eq!(f.state().desired_position, 0);
        f.go_to_new_position();
        assert!(f.state().move_request);

        let mut delay = no_delay();
        block_on(f.service(&mut delay));

        assert_eq!(*stepper.moves.borrow(), [300]);
        assert_eq!(stepper.actual.get(), 300);
        assert_eq!(f.state().desired_position, 300);
        assert!(!f.state().move_request);
        assert_eq!(value.get(), Some(300));
        assert!(!stepper.enabled.get());
        assert!(delay.calls > 0);
    }

    #[test]
    fn test_rapid_gotos_coalesce_to_latest() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(100);
        f.go_to_new_position();
        f.set_new_position(200);
        f.go_to_new_position();

        block_on(f.wait_for_wake());
        block_on(f.service(&mut no_delay()));

        assert_eq!(*stepper.moves.borrow(), [200]);
        assert_eq!(f.state().desired_position, 200);
        assert_eq!(value.get(), Some(200));
    }

    #[test]
    fn test_goto_during_move_retargets() {
        let stepper = FakeStepper::with_steps_per_poll(10);
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(100);
        f.go_to_new_position();

        let mut delay = HookDelay::new(|calls| {
            if calls == 2 {
                f.set_new_position(500);
                f.go_to_new_position();
            }
        });
        block_on(f.service(&mut delay));

        assert_eq!(*stepper.moves.borrow(), [100, 500]);
        assert_eq!(stepper.actual.get(), 500);

        let state = f.state();
        assert_eq!(state.desired_position, 500);
        assert!(!state.move_request);
        assert_eq!(value.get(), Some(500));
        assert!(!stepper.enabled.get());
    }

    #[test]
    fn test_stop_mid_move() {
        let stepper = FakeStepper::with_steps_per_poll(10);
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(1000);
        f.go_to_new_position();

        let mut delay = HookDelay::new(|calls| {
            if calls == 3 {
                f.stop();
                assert!(f.state().cancel_move);
                assert!(!f.state().move_request);
            }
        });
        block_on(f.service(&mut delay));

        let actual = stepper.actual.get();
        assert!(actual > 0 && actual < 1000);
        assert!(stepper.stops.get() >= 1);

        let state = f.state();
        assert_eq!(i32::from(state.desired_position), actual);
        assert!(!state.cancel_move);
        assert!(!state.move_request);
        assert_eq!(value.get(), Some(actual as u16));
        assert!(!stepper.enabled.get());
    }

    #[test]
    fn test_stop_before_move_starts() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(400);
        f.go_to_new_position();
        f.stop();

        block_on(f.wait_for_wake());
        block_on(f.service(&mut no_delay()));

        assert!(stepper.moves.borrow().is_empty());
        assert_eq!(f.state().desired_position, 0);
        assert!(!f.state().cancel_move);
        assert_eq!(value.get(), Some(0));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();
        stepper.actual.set(42);

        f.stop();
        f.stop();
        assert_eq!(f.state().desired_position, 42);
        assert!(!stepper.enabled.get());
        // Persisting is left to the motion task
        assert_eq!(value.get(), None);

        block_on(f.service(&mut no_delay()));
        block_on(f.service(&mut no_delay()));
        assert_eq!(value.get(), Some(42));
        assert_eq!(writes.get(), 1);
    }

    #[test]
    fn test_stop_falls_back_when_position_unreadable() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(Some(77)), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        stepper.fail_position.set(true);
        f.stop();
        assert_eq!(f.state().desired_position, 77);
        assert!(f.state().cancel_move);
    }

    #[test]
    fn test_current_position_tracks_hardware() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        stepper.actual.set(1234);
        assert_eq!(f.current_position(), 1234);
        assert_eq!(f.state().desired_position, 1234);

        stepper.fail_position.set(true);
        assert_eq!(f.current_position(), 1234);
    }

    #[test]
    fn test_current_position_keeps_pending_goto() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(900);
        f.go_to_new_position();
        assert_eq!(f.current_position(), 0);
        assert_eq!(f.state().desired_position, 900);

        block_on(f.service(&mut no_delay()));
        assert_eq!(*stepper.moves.borrow(), [900]);
    }

    #[test]
    fn test_is_moving_fail_safe() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        stepper.moving.set(true);
        stepper.target.set(10_000);
        assert!(f.is_moving());

        stepper.fail_motion.set(true);
        assert!(!f.is_moving());
    }

    #[test]
    fn test_set_current_position_rebases() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.set_new_position(50);
        f.go_to_new_position();
        f.set_current_position(0x2222);

        let state = f.state();
        assert_eq!(stepper.reference.get(), Some(0x2222));
        assert_eq!(state.staged_position, 0x2222);
        assert_eq!(state.desired_position, 0x2222);
        assert!(!state.move_request);
        assert!(!state.cancel_move);
        assert!(state.save_request);

        block_on(f.wait_for_wake());
        block_on(f.service(&mut no_delay()));
        assert_eq!(value.get(), Some(0x2222));
        assert!(!f.state().save_request);
        assert!(stepper.moves.borrow().is_empty());
    }

    #[test]
    fn test_goto_current_position() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(Some(250)), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        f.go_to_new_position();
        block_on(f.service(&mut no_delay()));

        assert_eq!(f.state().desired_position, 250);
        assert!(!f.state().move_request);
        assert_eq!(writes.get(), 0);
        assert!(!stepper.enabled.get());
    }

    #[test]
    fn test_service_idle_does_nothing() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        block_on(f.service(&mut no_delay()));
        assert!(stepper.moves.borrow().is_empty());
        assert_eq!(stepper.stops.get(), 0);
        assert_eq!(writes.get(), 0);
    }

    #[test]
    fn test_query_defaults() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);

        assert_eq!(f.temperature(), 0);
        assert_eq!(f.temperature_coefficient_raw(), 0);
        assert_eq!(f.firmware_version(), "10");
        assert!(!f.is_half_step());
        f.set_half_step(true);
        assert!(f.is_half_step());
    }

    #[test]
    fn test_wire_session_end_to_end() {
        let stepper = FakeStepper::new();
        let (value, writes) = (Cell::new(None), Cell::new(0));
        let f = focuser(&stepper, &value, &writes);
        block_on(f.initialise()).unwrap();

        let mut parser = Parser::new();
        let mut handler = &f;
        let mut send = |bytes: &[u8]| -> Vec<String> {
            bytes
                .iter()
                .filter_map(|&b| parser.process(b, &mut handler).response)
                .map(|r| String::from(r.as_str()))
                .collect()
        };

        assert!(send(b":SN0100#:FG#").is_empty());
        block_on(f.service(&mut no_delay()));

        assert_eq!(send(b":GP#"), ["0100#"]);
        assert_eq!(send(b":GN#:GI#"), ["0100#", "00#"]);
        assert_eq!(send(b":GV#"), ["10#"]);
        assert!(send(b":SD02#").is_empty());
        assert_eq!(send(b":GD#"), ["02#"]);
        assert_eq!(stepper.interval_ns.get(), 1_000_000);
    }
}
