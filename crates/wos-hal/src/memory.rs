//! In-memory HAL implementation.
//!
//! Provides a BTreeMap-backed store that doesn't outlive the process, plus a
//! clock that only moves when told to.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::{HalError, HAL};

/// Default starting clock value (2025-01-22T00:00:00Z).
const DEFAULT_WALLCLOCK_MS: u64 = 1_737_504_000_000;

/// In-memory HAL for tests and ephemeral sessions.
pub struct MemoryHal {
    /// Storage (key -> value)
    entries: RefCell<BTreeMap<String, String>>,
    /// Current wall-clock value
    wallclock: Cell<u64>,
    /// Amount the clock advances on every read
    tick: Cell<u64>,
    /// Number of completed writes
    writes: Cell<u64>,
}

impl Default for MemoryHal {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHal {
    /// Create an empty store with the default clock.
    pub fn new() -> Self {
        Self::with_time(DEFAULT_WALLCLOCK_MS)
    }

    /// Create an empty store whose clock starts at `ms`.
    pub fn with_time(ms: u64) -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            wallclock: Cell::new(ms),
            tick: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    /// Set the current timestamp (for testing).
    pub fn set_now(&self, ms: u64) {
        self.wallclock.set(ms);
    }

    /// Advance the clock by `ms`.
    pub fn advance(&self, ms: u64) {
        self.wallclock.set(self.wallclock.get() + ms);
    }

    /// Make every clock read advance the clock by `ms` afterwards.
    pub fn set_tick(&self, ms: u64) {
        self.tick.set(ms);
    }

    /// Number of successful `storage_write` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    /// Snapshot of all stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl HAL for MemoryHal {
    fn storage_read(&self, key: &str) -> Result<Option<String>, HalError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn storage_write(&self, key: &str, value: &str) -> Result<(), HalError> {
        if key.is_empty() {
            return Err(HalError::InvalidKey(String::new()));
        }
        self.entries
            .borrow_mut()
            .insert(String::from(key), String::from(value));
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn storage_delete(&self, key: &str) -> Result<(), HalError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn wallclock_ms(&self) -> u64 {
        let now = self.wallclock.get();
        self.wallclock.set(now + self.tick.get());
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_delete() {
        let hal = MemoryHal::new();

        assert_eq!(hal.storage_read("k").unwrap(), None);
        hal.storage_write("k", "v1").unwrap();
        hal.storage_write("k", "v2").unwrap();
        assert_eq!(hal.storage_read("k").unwrap().as_deref(), Some("v2"));
        assert!(hal.storage_exists("k").unwrap());
        assert_eq!(hal.write_count(), 2);

        hal.storage_delete("k").unwrap();
        assert!(!hal.storage_exists("k").unwrap());

        // Deleting again is fine
        hal.storage_delete("k").unwrap();
    }

    #[test]
    fn test_empty_key_rejected() {
        let hal = MemoryHal::new();
        assert!(matches!(
            hal.storage_write("", "v"),
            Err(HalError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_clock() {
        let hal = MemoryHal::with_time(1000);
        assert_eq!(hal.wallclock_ms(), 1000);

        hal.advance(5);
        assert_eq!(hal.wallclock_ms(), 1005);

        hal.set_tick(10);
        assert_eq!(hal.wallclock_ms(), 1005);
        assert_eq!(hal.wallclock_ms(), 1015);

        hal.set_now(42);
        assert_eq!(hal.wallclock_ms(), 42);
    }
}
