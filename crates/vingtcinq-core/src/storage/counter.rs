//! Locally persisted "next session number".

use std::sync::Mutex;

use crate::error::DatabaseError;

/// Single integer slot holding the next session number.
pub trait SessionCounter: Send {
    /// The stored value, or `None` when nothing was ever written.
    fn load(&self) -> Option<u64>;

    fn store(&self, next: u64) -> Result<(), DatabaseError>;
}

/// Process-local counter, for tests and for running without a data directory.
#[derive(Debug, Default)]
pub struct MemoryCounter {
    value: Mutex<Option<u64>>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self {
            value: Mutex::new(Some(next)),
        }
    }
}

impl SessionCounter for MemoryCounter {
    fn load(&self) -> Option<u64> {
        self.value.lock().ok().and_then(|v| *v)
    }

    fn store(&self, next: u64) -> Result<(), DatabaseError> {
        let mut slot = self
            .value
            .lock()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        *slot = Some(next);
        Ok(())
    }
}
