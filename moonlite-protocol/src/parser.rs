//! Frame decoding for the Moonlite protocol.
//!
//! Frame format (ASCII):
//! - START (1 byte): `:` synchronization byte, always restarts the parser
//! - OPCODE (2 bytes): command code, see [`Command::from_opcode`]
//! - PAYLOAD (0-16 bytes): hex digits, length fixed per command
//! - END (1 byte): `#` terminator
//!
//! Responses are `<payload>#` without a leading `:`.

use heapless::Vec;

use crate::command::Command;
use crate::handler::{dispatch, Handler, Response};
use crate::hex::is_hex_digit;

/// Frame synchronization byte
pub const FRAME_START: u8 = b':';

/// Frame terminator byte
pub const FRAME_END: u8 = b'#';

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 16;

/// Reasons a frame is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload grew past [`MAX_PAYLOAD_SIZE`] before the terminator
    Overflow,
    /// Opcode not in the command table
    Unrecognized,
    /// Payload length does not match the command
    PayloadLength,
    /// Payload contains a non-hex character
    InvalidHex,
}

impl FrameError {
    /// Whether the error ended a terminated frame
    ///
    /// Overflow aborts a frame before its terminator arrives and is not
    /// counted as a completed frame.
    pub fn completes_frame(self) -> bool {
        !matches!(self, FrameError::Overflow)
    }
}

/// A validated request frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Decoded command
    pub command: Command,
    /// Payload characters (hex digits)
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given command and payload
    pub fn new(command: Command, payload: &[u8]) -> Result<Self, FrameError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::Overflow)?;

        Ok(Self {
            command,
            payload: payload_vec,
        })
    }
}

/// Outcome of feeding one byte through [`Parser::process`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// A terminated frame (valid or not) was consumed
    pub completed: bool,
    /// Text to transmit, including the trailing `#`
    pub response: Option<Response>,
}

impl Completion {
    fn pending() -> Self {
        Self {
            completed: false,
            response: None,
        }
    }

    fn rejected() -> Self {
        Self {
            completed: true,
            response: None,
        }
    }
}

/// State machine for parsing incoming frames
#[derive(Debug, Clone)]
pub struct Parser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for START byte
    Idle,
    /// Got START, collecting the two opcode bytes
    ReadingOpcode,
    /// Collecting payload until END
    ReadingPayload,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            buffer: Vec::new(),
            command: Command::Unrecognized,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.buffer.clear();
        self.command = Command::Unrecognized;
    }

    /// Whether the parser is between frames
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Idle
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a valid frame is terminated,
    /// `Ok(None)` when more bytes are needed, or `Err` when a frame is
    /// discarded. The parser is back in its idle state after any `Err`.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if byte == FRAME_START {
            self.reset();
            self.state = ParseState::ReadingOpcode;
            return Ok(None);
        }

        match self.state {
            ParseState::Idle => {
                // Silently ignore bytes outside a frame
                Ok(None)
            }
            ParseState::ReadingOpcode => {
                // Cannot fail: the buffer is cleared before it holds 2 bytes
                let _ = self.buffer.push(byte);
                if self.buffer.len() == 2 {
                    self.command = Command::from_opcode([self.buffer[0], self.buffer[1]]);
                    self.buffer.clear();
                    self.state = ParseState::ReadingPayload;
                }
                Ok(None)
            }
            ParseState::ReadingPayload => {
                if byte != FRAME_END {
                    if self.buffer.push(byte).is_err() {
                        self.reset();
                        return Err(FrameError::Overflow);
                    }
                    return Ok(None);
                }

                let result = self.validate();
                self.reset();
                result.map(Some)
            }
        }
    }

    /// Check the collected payload against the command
    fn validate(&self) -> Result<Frame, FrameError> {
        if !self.command.is_recognized() {
            return Err(FrameError::Unrecognized);
        }

        let expected = self.command.expected_payload_len();
        if self.buffer.len() != expected {
            return Err(FrameError::PayloadLength);
        }

        if expected > 0 && !self.buffer.iter().all(|&b| is_hex_digit(b)) {
            return Err(FrameError::InvalidHex);
        }

        Frame::new(self.command, &self.buffer)
    }

    /// Feed a byte and dispatch completed frames to the handler
    ///
    /// Only a fully valid frame reaches the handler. The response, when
    /// present, already carries the trailing `#`.
    pub fn process<H: Handler + ?Sized>(&mut self, byte: u8, handler: &mut H) -> Completion {
        match self.feed(byte) {
            Ok(Some(frame)) => {
                let response = dispatch(&frame, handler).map(|mut text| {
                    // Dispatch leaves room for the terminator
                    let _ = text.push(FRAME_END as char);
                    text
                });
                Completion {
                    completed: true,
                    response,
                }
            }
            Ok(None) => Completion::pending(),
            Err(e) if e.completes_frame() => Completion::rejected(),
            Err(_) => Completion::pending(),
        }
    }
}
