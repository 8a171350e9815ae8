//! Moonlite Focuser Serial Protocol
//!
//! This crate implements the controller side of the Moonlite focuser
//! protocol used by ASCOM/INDI drivers: framing, hex payload codec and
//! dispatch of decoded commands to a [`Handler`].
//!
//! # Protocol Overview
//!
//! All messages are short ASCII frames:
//! ```text
//! ┌───────┬────────┬──────────────┬─────┐
//! │ START │ OPCODE │ PAYLOAD      │ END │
//! │ ':'   │ 2B     │ 0, 2 or 4 hex│ '#' │
//! └───────┴────────┴──────────────┴─────┘
//! ```
//!
//! Queries answer with `<payload>#`. Actions and malformed frames produce
//! no output at all; the protocol has no error vocabulary.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod handler;
pub mod hex;
pub mod parser;

pub use command::Command;
pub use handler::{dispatch, Handler, Response, MAX_RESPONSE_LEN};
pub use parser::{Completion, Frame, FrameError, Parser, FRAME_END, FRAME_START, MAX_PAYLOAD_SIZE};
