//! Moonlite focuser firmware
//!
//! Main firmware binary for RP2040-based focuser controllers. Speaks the
//! Moonlite serial protocol on UART0 and drives a step/dir stepper driver.
//!
//! Task layout:
//! - `serial_rx_task`: UART bytes into the receive queue
//! - `command_task`: receive queue through the protocol parser, replies out
//! - `motion_task`: the focuser motion loop
//! - `step_pulse_task`: step/dir pulse generation

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use focuser_core::motion::Focuser;
use focuser_drivers::stepper::{StepEngine, StepPins};
use focuser_drivers::storage::FlashPositionStore;

use crate::channels::{AppFocuser, Engine};

mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

// Shared between the command, motion and pulse tasks
static ENGINE: StaticCell<Engine> = StaticCell::new();
static FOCUSER: StaticCell<AppFocuser> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Focuser firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Pin assignments are board-specific (SKR Pico X axis: STEP=GPIO11, DIR=GPIO10, ENABLE=GPIO12)
    let disabled = if config::ENABLE_INVERTED {
        Level::High
    } else {
        Level::Low
    };
    let pins = StepPins {
        step: Output::new(p.PIN_11, Level::Low),
        dir: Output::new(p.PIN_10, Level::Low),
        enable: Output::new(p.PIN_12, disabled),
        enable_active_low: config::ENABLE_INVERTED,
    };

    let engine: &'static Engine = ENGINE.init(StepEngine::new());
    spawner.spawn(tasks::step_pulse_task(engine, pins)).unwrap();
    info!("Step engine started");

    let flash = Flash::new(p.FLASH, p.DMA_CH0);
    let store = FlashPositionStore::new(flash, config::POSITION_FLASH_RANGE);
    let focuser: &'static AppFocuser =
        FOCUSER.init(Focuser::new(engine, store, config::focuser_config()));

    if let Err(e) = focuser.initialise().await {
        error!("Focuser initialisation failed: {}", e);
        // Without a working stepper there is nothing to serve
        loop {
            embassy_time::Timer::after_secs(60).await;
        }
    }
    info!(
        "Focuser ready at position {} (firmware {})",
        focuser.state().desired_position,
        config::FIRMWARE_VERSION
    );

    // Moonlite clients use 8N1 at the configured rate
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config::UART_BAUDRATE;

    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART initialized at {} baud", config::UART_BAUDRATE);

    spawner.spawn(tasks::motion_task(focuser)).unwrap();
    spawner.spawn(tasks::command_task(focuser, tx)).unwrap();
    spawner.spawn(tasks::serial_rx_task(rx)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        let dropped = channels::RX_QUEUE.dropped();
        if dropped > 0 {
            warn!("{} received bytes dropped so far", dropped);
        }
        trace!("Main loop heartbeat");
    }
}
