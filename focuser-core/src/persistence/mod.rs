//! Position persistence format

pub mod record;

pub use record::{PositionRecord, RecordError, RECORD_MAGIC};
