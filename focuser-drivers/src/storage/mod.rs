//! Position storage implementations

pub mod flash;

pub use flash::{FlashPositionStore, StoreError};
