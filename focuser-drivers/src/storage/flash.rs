//! NOR-flash position store
//!
//! Keeps the position as a postcard-encoded [`PositionRecord`] in a
//! sequential-storage map over a dedicated flash range. The map appends
//! new items and only erases a page once the range fills up, so saving
//! after every move spreads wear across the range. Redundant writes are
//! skipped.

use core::ops::Range;

use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use focuser_core::persistence::{PositionRecord, RecordError};
use focuser_core::traits::PositionStore;

/// Map key of the position item
const POSITION_KEY: u8 = 0;

/// Room for an encoded record
const RECORD_BUF_SIZE: usize = 16;

/// Scratch space for sequential-storage item headers and data
const DATA_BUF_SIZE: usize = 64;

/// Errors from flash position storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Flash or map operation failed
    Storage,
    /// Record could not be serialized
    Encode,
    /// Stored bytes are not a record
    Decode,
    /// Stored record failed validation
    Record(RecordError),
}

impl From<RecordError> for StoreError {
    fn from(e: RecordError) -> Self {
        StoreError::Record(e)
    }
}

impl From<postcard::Error> for StoreError {
    fn from(_: postcard::Error) -> Self {
        StoreError::Decode
    }
}

/// Position store backed by a NOR flash range
pub struct FlashPositionStore<F> {
    flash: F,
    range: Range<u32>,
    last: Option<u16>,
}

impl<F: NorFlash> FlashPositionStore<F> {
    /// Create a store over `range`
    ///
    /// The range must be erase-page aligned and span at least two pages.
    pub fn new(flash: F, range: Range<u32>) -> Self {
        Self {
            flash,
            range,
            last: None,
        }
    }

    /// Release the flash device
    pub fn into_inner(self) -> F {
        self.flash
    }

    async fn read_record(&mut self) -> Result<Option<u16>, StoreError> {
        let mut data_buffer = [0u8; DATA_BUF_SIZE];

        let item = map::fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &POSITION_KEY,
        )
        .await
        .map_err(|_| StoreError::Storage)?;

        match item {
            Some(bytes) => {
                let record: PositionRecord = postcard::from_bytes(bytes)?;
                Ok(Some(record.validate()?))
            }
            None => Ok(None),
        }
    }

    async fn write_record(&mut self, position: u16) -> Result<(), StoreError> {
        let mut record_buf = [0u8; RECORD_BUF_SIZE];
        let data: &[u8] = postcard::to_slice(&PositionRecord::new(position), &mut record_buf)
            .map_err(|_| StoreError::Encode)?;

        let mut data_buffer = [0u8; DATA_BUF_SIZE];
        map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &POSITION_KEY,
            &data,
        )
        .await
        .map_err(|_| StoreError::Storage)
    }
}

impl<F: NorFlash> PositionStore for FlashPositionStore<F> {
    async fn load(&mut self) -> Option<u16> {
        match self.read_record().await {
            Ok(Some(position)) => {
                debug!("loaded position {}", position);
                self.last = Some(position);
                Some(position)
            }
            Ok(None) => {
                info!("no stored position");
                None
            }
            Err(e) => {
                warn!("stored position rejected: {}", e);
                None
            }
        }
    }

    async fn save(&mut self, position: u16) {
        if self.last == Some(position) {
            return;
        }

        match self.write_record(position).await {
            Ok(()) => {
                debug!("saved position {}", position);
                self.last = Some(position);
            }
            Err(e) => error!("position save failed: {}", e),
        }
    }
}
