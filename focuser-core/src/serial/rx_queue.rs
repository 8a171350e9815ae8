//! Bounded receive queue between the UART reader and the command task
//!
//! The producer never blocks: when the queue is full, incoming bytes are
//! dropped, counted and logged. A dropped byte corrupts at most the frame it
//! belonged to; the next `:` resynchronizes the parser.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicU32, Ordering};

/// Queue depth used by the firmware
pub const RX_QUEUE_DEPTH: usize = 128;

/// Largest chunk the UART reader hands over at once
pub const RX_BURST_SIZE: usize = 8;

/// Byte queue with drop-on-full semantics
pub struct RxQueue<M: RawMutex, const N: usize> {
    channel: Channel<M, u8, N>,
    dropped: AtomicU32,
}

impl<M: RawMutex, const N: usize> RxQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue one byte; returns `false` if it was dropped
    pub fn push(&self, byte: u8) -> bool {
        if self.channel.try_send(byte).is_err() {
            self.record_drop(1);
            return false;
        }
        true
    }

    /// Enqueue a chunk, returning how many bytes were accepted
    ///
    /// Once the queue fills, the rest of the chunk is dropped.
    pub fn push_slice(&self, bytes: &[u8]) -> usize {
        for (accepted, &byte) in bytes.iter().enumerate() {
            if self.channel.try_send(byte).is_err() {
                self.record_drop(bytes.len() - accepted);
                return accepted;
            }
        }
        bytes.len()
    }

    fn record_drop(&self, count: usize) {
        self.dropped.fetch_add(count as u32, Ordering::Relaxed);
        warn!("RX queue full, dropping {} byte(s)", count);
    }

    /// Wait for the next byte
    pub async fn read_byte(&self) -> u8 {
        self.channel.receive().await
    }

    pub fn try_read_byte(&self) -> Option<u8> {
        self.channel.try_receive().ok()
    }

    /// Total bytes dropped since startup
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex, const N: usize> Default for RxQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
