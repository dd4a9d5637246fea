//! Concurrency Guard
//!
//! Per-bucket read/write lock over the state lookups depend on.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared mode for lookups, exclusive mode for anything that swaps the
/// reader, index or staging buffer
///
/// Lookups take the shared mode only long enough to resolve a key and clone
/// the current reader handle; the bytes are then read without the lock held.
/// A reader captured before a remap stays valid until its last holder drops it.
pub struct ConcurrencyGuard<T> {
    lock: RwLock<T>,
}

impl<T> ConcurrencyGuard<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: RwLock::new(value),
        }
    }

    /// Shared (read) mode; many holders at once
    pub fn shared(&self) -> RwLockReadGuard<'_, T> {
        self.lock.read()
    }

    /// Exclusive (write) mode; waits out every shared holder
    pub fn exclusive(&self) -> RwLockWriteGuard<'_, T> {
        self.lock.write()
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}
