//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in focuser-core:
//!
//! - Step/dir pulse engine implementing `FocuserStepper`
//! - NOR-flash backed `PositionStore`

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod stepper;
pub mod storage;
