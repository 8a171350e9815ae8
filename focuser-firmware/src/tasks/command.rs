//! Command processing task
//!
//! Drains the receive queue one byte at a time through the Moonlite
//! parser and writes each response back to the host.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use focuser_core::serial::CommandSession;

use crate::channels::{AppFocuser, RX_QUEUE};

/// Command task - parser, dispatch and replies
#[embassy_executor::task]
pub async fn command_task(focuser: &'static AppFocuser, mut tx: BufferedUartTx) {
    info!("Command task started");

    let mut session = CommandSession::new(focuser);

    loop {
        let byte = RX_QUEUE.read_byte().await;

        let Some(response) = session.process(byte) else {
            continue;
        };

        if let Err(e) = tx.write_all(response.as_bytes()).await {
            warn!("UART write error: {:?}", e);
        }
    }
}
