//! Board-agnostic core logic for the Moonlite focuser firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (stepper, position store)
//! - Motion controller and step timing
//! - Position record format
//! - Serial receive queue and command session
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod motion;
pub mod persistence;
pub mod serial;
pub mod traits;
