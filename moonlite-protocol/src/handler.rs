//! Device handler interface and command dispatch
//!
//! The parser talks to the focuser exclusively through [`Handler`]. Getter
//! methods return native values which [`dispatch`] converts to the wire's
//! hexadecimal text; setter methods produce no response.

use heapless::String;

use crate::command::Command;
use crate::hex::{decode_byte, decode_word, encode_byte, encode_word};
use crate::parser::Frame;

/// Maximum response length including the trailing `#`
pub const MAX_RESPONSE_LEN: usize = 32;

/// Response text ready to be written to the wire
pub type Response = String<MAX_RESPONSE_LEN>;

/// Operations the protocol requires from a focuser
///
/// Positions are absolute step counts (0..=65535). The speed is a delay
/// multiplier byte: larger values mean slower stepping.
pub trait Handler {
    /// Halt motion immediately (`FQ`)
    fn stop(&mut self);

    /// Actual position (`GP`)
    fn current_position(&mut self) -> u16;

    /// Re-base the position without moving the motor (`SP`)
    fn set_current_position(&mut self, position: u16);

    /// Staged target position (`GN`)
    fn new_position(&mut self) -> u16;

    /// Stage a target position without moving (`SN`)
    fn set_new_position(&mut self, position: u16);

    /// Start moving toward the staged target (`FG`)
    fn go_to_new_position(&mut self);

    /// Whether half-step mode is selected (`GH`)
    fn is_half_step(&mut self) -> bool;

    /// Select half-step (`SH`) or full-step (`SF`) mode
    fn set_half_step(&mut self, enabled: bool);

    /// Whether the motor is currently moving (`GI`)
    fn is_moving(&mut self) -> bool;

    /// Firmware version string (`GV`)
    fn firmware_version(&mut self) -> &str;

    /// Speed multiplier byte (`GD`)
    fn speed(&mut self) -> u8;

    /// Set the speed multiplier byte (`SD`)
    fn set_speed(&mut self, speed: u8);

    /// Temperature reading, 0 when no sensor is fitted (`GT`)
    fn temperature(&mut self) -> u16;

    /// Raw temperature coefficient byte (`GC`)
    fn temperature_coefficient_raw(&mut self) -> u8;
}

impl<H: Handler + ?Sized> Handler for &mut H {
    fn stop(&mut self) {
        (**self).stop()
    }

    fn current_position(&mut self) -> u16 {
        (**self).current_position()
    }

    fn set_current_position(&mut self, position: u16) {
        (**self).set_current_position(position)
    }

    fn new_position(&mut self) -> u16 {
        (**self).new_position()
    }

    fn set_new_position(&mut self, position: u16) {
        (**self).set_new_position(position)
    }

    fn go_to_new_position(&mut self) {
        (**self).go_to_new_position()
    }

    fn is_half_step(&mut self) -> bool {
        (**self).is_half_step()
    }

    fn set_half_step(&mut self, enabled: bool) {
        (**self).set_half_step(enabled)
    }

    fn is_moving(&mut self) -> bool {
        (**self).is_moving()
    }

    fn firmware_version(&mut self) -> &str {
        (**self).firmware_version()
    }

    fn speed(&mut self) -> u8 {
        (**self).speed()
    }

    fn set_speed(&mut self, speed: u8) {
        (**self).set_speed(speed)
    }

    fn temperature(&mut self) -> u16 {
        (**self).temperature()
    }

    fn temperature_coefficient_raw(&mut self) -> u8 {
        (**self).temperature_coefficient_raw()
    }
}

/// Build a response from ASCII hex digits
fn hex_response(digits: &[u8]) -> Response {
    let mut out = Response::new();
    for &d in digits {
        // Hex digits are ASCII and always fit
        let _ = out.push(d as char);
    }
    out
}

/// Build a response from free text, leaving room for the terminator
fn text_response(text: &str) -> Response {
    let mut out = Response::new();
    for ch in text.chars() {
        if out.len() + ch.len_utf8() > MAX_RESPONSE_LEN - 1 {
            break;
        }
        let _ = out.push(ch);
    }
    out
}

/// Invoke the handler operation for a validated frame
///
/// Returns the response payload (without the trailing `#`), or `None` for
/// commands that do not answer.
pub fn dispatch<H: Handler + ?Sized>(frame: &Frame, handler: &mut H) -> Option<Response> {
    let payload = frame.payload.as_slice();
    match frame.command {
        Command::Stop => {
            handler.stop();
            None
        }
        Command::GetCurrentPosition => Some(hex_response(&encode_word(handler.current_position()))),
        Command::SetCurrentPosition => {
            handler.set_current_position(decode_word(payload));
            None
        }
        Command::GetNewPosition => Some(hex_response(&encode_word(handler.new_position()))),
        Command::SetNewPosition => {
            handler.set_new_position(decode_word(payload));
            None
        }
        Command::GoToNewPosition => {
            handler.go_to_new_position();
            None
        }
        Command::CheckHalfStep => {
            let flag = if handler.is_half_step() { b"FF" } else { b"00" };
            Some(hex_response(flag))
        }
        Command::SetFullStep => {
            handler.set_half_step(false);
            None
        }
        Command::SetHalfStep => {
            handler.set_half_step(true);
            None
        }
        Command::CheckMoving => {
            let flag = if handler.is_moving() { b"01" } else { b"00" };
            Some(hex_response(flag))
        }
        Command::GetFirmwareVersion => {
            let version = text_response(handler.firmware_version());
            if version.is_empty() {
                None
            } else {
                Some(version)
            }
        }
        Command::GetSpeed => Some(hex_response(&encode_byte(handler.speed()))),
        Command::SetSpeed => {
            handler.set_speed(decode_byte(payload));
            None
        }
        Command::GetTemperature => Some(hex_response(&encode_word(handler.temperature()))),
        Command::GetTemperatureCoefficient => Some(hex_response(&encode_byte(
            handler.temperature_coefficient_raw(),
        ))),
        Command::Unrecognized => None,
    }
}
