//! Inter-task shared state
//!
//! The receive queue is the only channel between tasks; the focuser and
//! step engine are shared by reference and live in `StaticCell`s in main.

use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use focuser_core::motion::Focuser;
use focuser_core::serial::{RxQueue, RX_QUEUE_DEPTH};
use focuser_drivers::stepper::StepEngine;
use focuser_drivers::storage::FlashPositionStore;

use crate::config::FLASH_SIZE;

/// Step pulse engine shared by the motion loop and the pulse task
pub type Engine = StepEngine<CriticalSectionRawMutex>;

/// On-chip flash, DMA-driven so the position map can await it
pub type PositionFlash = Flash<'static, FLASH, Async, FLASH_SIZE>;

/// The focuser as wired on this board
pub type AppFocuser =
    Focuser<CriticalSectionRawMutex, &'static Engine, FlashPositionStore<PositionFlash>>;

/// Bytes received from the host, waiting for the command task
pub static RX_QUEUE: RxQueue<CriticalSectionRawMutex, RX_QUEUE_DEPTH> = RxQueue::new();
