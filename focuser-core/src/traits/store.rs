//! Position persistence trait

use core::future::Future;

/// Non-volatile storage for the focuser position
///
/// Implementations remember the last value they wrote (or loaded) and skip
/// writing it again, so callers may save after every move. Only the motion
/// task calls into the store, so flash work never runs on the command path.
pub trait PositionStore {
    /// Load the persisted position, `None` if absent or corrupted
    fn load(&mut self) -> impl Future<Output = Option<u16>>;

    /// Persist a position (best effort)
    fn save(&mut self, position: u16) -> impl Future<Output = ()>;
}

/// Store that persists nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPositionStore;

impl PositionStore for NullPositionStore {
    async fn load(&mut self) -> Option<u16> {
        None
    }

    async fn save(&mut self, _position: u16) {}
}

impl<T: PositionStore + ?Sized> PositionStore for &mut T {
    async fn load(&mut self) -> Option<u16> {
        (**self).load().await
    }

    async fn save(&mut self, position: u16) {
        (**self).save(position).await
    }
}
