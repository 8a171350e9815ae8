//! Serial link plumbing
//!
//! [`RxQueue`] decouples the UART reader from command processing;
//! [`CommandSession`] turns the byte stream into handler calls and
//! responses.

pub mod rx_queue;
pub mod session;

pub use rx_queue::{RxQueue, RX_BURST_SIZE, RX_QUEUE_DEPTH};
pub use session::{CommandSession, MAX_LOGGED_FRAME_LEN};
