//! Moonlite command set
//!
//! Every request is a two-character opcode followed by an optional hex
//! payload. Commands are divided into two categories:
//! - Queries (`G*`): no payload, the controller answers with `<payload>#`
//! - Actions (`S*`, `F*`): optional payload, no answer

// Opcodes
pub const OP_STOP: [u8; 2] = *b"FQ";
pub const OP_GET_CURRENT_POSITION: [u8; 2] = *b"GP";
pub const OP_SET_CURRENT_POSITION: [u8; 2] = *b"SP";
pub const OP_GET_NEW_POSITION: [u8; 2] = *b"GN";
pub const OP_SET_NEW_POSITION: [u8; 2] = *b"SN";
pub const OP_GO_TO_NEW_POSITION: [u8; 2] = *b"FG";
pub const OP_CHECK_HALF_STEP: [u8; 2] = *b"GH";
pub const OP_SET_FULL_STEP: [u8; 2] = *b"SF";
pub const OP_SET_HALF_STEP: [u8; 2] = *b"SH";
pub const OP_CHECK_MOVING: [u8; 2] = *b"GI";
pub const OP_GET_FIRMWARE_VERSION: [u8; 2] = *b"GV";
pub const OP_GET_SPEED: [u8; 2] = *b"GD";
pub const OP_SET_SPEED: [u8; 2] = *b"SD";
pub const OP_GET_TEMPERATURE: [u8; 2] = *b"GT";
pub const OP_GET_TEMPERATURE_COEFFICIENT: [u8; 2] = *b"GC";

/// Payload length of position arguments (`PPPP`)
pub const POSITION_PAYLOAD_LEN: usize = 4;

/// Payload length of byte arguments (`SS`)
pub const BYTE_PAYLOAD_LEN: usize = 2;

/// Decoded Moonlite command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `FQ`: halt any motion and release the driver
    Stop,
    /// `GP`: report the actual position
    GetCurrentPosition,
    /// `SP PPPP`: re-base the position without moving
    SetCurrentPosition,
    /// `GN`: report the staged target
    GetNewPosition,
    /// `SN PPPP`: stage a new target
    SetNewPosition,
    /// `FG`: start moving to the staged target
    GoToNewPosition,
    /// `GH`: `FF` when half-stepping, `00` otherwise
    CheckHalfStep,
    /// `SF`: select full steps
    SetFullStep,
    /// `SH`: select half steps
    SetHalfStep,
    /// `GI`: `01` while moving, `00` otherwise
    CheckMoving,
    /// `GV`: firmware version string
    GetFirmwareVersion,
    /// `GD`: speed multiplier byte
    GetSpeed,
    /// `SD SS`: set the speed multiplier byte
    SetSpeed,
    /// `GT`: temperature reading
    GetTemperature,
    /// `GC`: temperature coefficient, two's complement byte
    GetTemperatureCoefficient,
    /// Anything not in the opcode table
    Unrecognized,
}

impl Command {
    /// Look up a two-character opcode (case-sensitive)
    pub fn from_opcode(opcode: [u8; 2]) -> Self {
        match opcode {
            OP_STOP => Command::Stop,
            OP_GET_CURRENT_POSITION => Command::GetCurrentPosition,
            OP_SET_CURRENT_POSITION => Command::SetCurrentPosition,
            OP_GET_NEW_POSITION => Command::GetNewPosition,
            OP_SET_NEW_POSITION => Command::SetNewPosition,
            OP_GO_TO_NEW_POSITION => Command::GoToNewPosition,
            OP_CHECK_HALF_STEP => Command::CheckHalfStep,
            OP_SET_FULL_STEP => Command::SetFullStep,
            OP_SET_HALF_STEP => Command::SetHalfStep,
            OP_CHECK_MOVING => Command::CheckMoving,
            OP_GET_FIRMWARE_VERSION => Command::GetFirmwareVersion,
            OP_GET_SPEED => Command::GetSpeed,
            OP_SET_SPEED => Command::SetSpeed,
            OP_GET_TEMPERATURE => Command::GetTemperature,
            OP_GET_TEMPERATURE_COEFFICIENT => Command::GetTemperatureCoefficient,
            _ => Command::Unrecognized,
        }
    }

    /// Expected request payload length in hex characters
    pub fn expected_payload_len(self) -> usize {
        match self {
            Command::SetSpeed => BYTE_PAYLOAD_LEN,
            Command::SetCurrentPosition | Command::SetNewPosition => POSITION_PAYLOAD_LEN,
            _ => 0,
        }
    }

    /// Whether this command is in the opcode table
    pub fn is_recognized(self) -> bool {
        self != Command::Unrecognized
    }
}
