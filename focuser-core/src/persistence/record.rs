//! Persisted position record
//!
//! The record carries its own marker and checksum so that a value left
//! behind by other firmware, or a half-written item, is never mistaken for
//! a position. Storage backends serialize it with postcard (see the
//! `serde` feature).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Record marker, ASCII "FOCP"
pub const RECORD_MAGIC: u32 = 0x464F_4350;

/// Reasons a stored record is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Marker does not match [`RECORD_MAGIC`]
    BadMagic,
    /// Checksum does not match the position
    BadChecksum,
}

/// Persisted focuser position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionRecord {
    pub magic: u32,
    pub position: u16,
    pub checksum: u16,
}

impl PositionRecord {
    pub fn new(position: u16) -> Self {
        Self {
            magic: RECORD_MAGIC,
            position,
            checksum: Self::checksum(position),
        }
    }

    /// Checksum over the marker halves and the position
    pub fn checksum(position: u16) -> u16 {
        ((RECORD_MAGIC >> 16) as u16) ^ (RECORD_MAGIC as u16) ^ position
    }

    /// Position held by a record read back from storage
    pub fn validate(&self) -> Result<u16, RecordError> {
        if self.magic != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        if self.checksum != Self::checksum(self.position) {
            return Err(RecordError::BadChecksum);
        }
        Ok(self.position)
    }
}
