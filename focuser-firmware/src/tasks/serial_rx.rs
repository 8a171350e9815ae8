//! Serial receive task
//!
//! Moves bytes from the UART into the receive queue. Never blocks on the
//! queue: bytes that do not fit are dropped and counted.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use focuser_core::serial::RX_BURST_SIZE;

use crate::channels::RX_QUEUE;

/// Serial RX task - feeds the receive queue from UART0
#[embassy_executor::task]
pub async fn serial_rx_task(mut rx: BufferedUartRx) {
    info!("Serial RX task started");

    let mut buf = [0u8; RX_BURST_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                trace!("RX: {} bytes", n);
                RX_QUEUE.push_slice(&buf[..n]);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
