//! Versioned, swap-on-write snapshots shared between cycles and administrators.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A value tagged with the version it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    version: u64,
    value: T,
}

impl<T> Versioned<T> {
    /// Wraps a value with an explicit version.
    #[must_use]
    pub const fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }

    /// Returns the version, incremented on every publish.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the wrapped value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }
}

/// Holder of the current snapshot of some shared configuration.
///
/// Readers take one `Arc` and keep it for the whole cycle, so a concurrent
/// publish is observed either entirely or not at all. Writers never mutate a
/// published value; they build a new one and swap it in.
pub struct SnapshotCell<T> {
    current: RwLock<Arc<Versioned<T>>>,
}

impl<T> SnapshotCell<T> {
    /// Creates a cell publishing `value` as version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(Versioned::new(0, value))),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<Versioned<T>> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Returns the version of the current snapshot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.load().version()
    }

    /// Publishes a replacement value and returns its version.
    pub fn store(&self, value: T) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = guard.version() + 1;
        *guard = Arc::new(Versioned::new(version, value));
        version
    }

    /// Derives a replacement from the current value under the write lock and
    /// publishes it. Concurrent updates are applied one after another.
    pub fn update<F>(&self, derive: F) -> u64
    where
        F: FnOnce(&T) -> T,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = derive(guard.value());
        let version = guard.version() + 1;
        *guard = Arc::new(Versioned::new(version, next));
        version
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.load();
        f.debug_struct("SnapshotCell")
            .field("version", &snapshot.version())
            .field("value", snapshot.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_keep_their_snapshot_across_publishes() {
        let cell = SnapshotCell::new(vec![1, 2]);
        let before = cell.load();

        let version = cell.store(vec![3]);
        assert_eq!(version, 1);
        assert_eq!(before.value(), &vec![1, 2]);
        assert_eq!(before.version(), 0);
        assert_eq!(cell.load().value(), &vec![3]);
    }

    #[test]
    fn update_derives_from_current_value() {
        let cell = SnapshotCell::new(10_u32);
        cell.update(|value| value + 1);
        let version = cell.update(|value| value * 2);
        assert_eq!(version, 2);
        assert_eq!(*cell.load().value(), 22);
    }
}
