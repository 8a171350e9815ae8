//! Speed multiplier to step cadence conversion
//!
//! The multiplier byte divides a 2000 steps/s base rate. Slow settings are
//! floored at 100 steps/s so a large multiplier never stalls the focuser.

/// Step rate at multiplier 1
pub const BASE_STEPS_PER_SECOND: u32 = 2000;

/// Slowest cadence ever produced
pub const MIN_STEPS_PER_SECOND: u32 = 100;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Steps per second for a speed multiplier (0 behaves as 1)
pub fn steps_per_second(multiplier: u8) -> u32 {
    let divisor = u32::from(multiplier.max(1));
    (BASE_STEPS_PER_SECOND / divisor).max(MIN_STEPS_PER_SECOND)
}

/// Time between step pulses in nanoseconds
pub fn step_interval_ns(multiplier: u8) -> u64 {
    NANOS_PER_SECOND / u64::from(steps_per_second(multiplier))
}
