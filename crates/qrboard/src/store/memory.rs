//! In-process content store.
//!
//! Writes are visible to every request served by this process and are lost
//! when it exits. Suitable for demos and tests only.

use parking_lot::RwLock;

use super::{ContentStore, StoreBackend};
use crate::content::ContentRecord;
use crate::error::Result;

/// Content store backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    defaults: ContentRecord,
    record: RwLock<ContentRecord>,
}

impl MemoryStore {
    /// Create a store holding the given defaults.
    #[must_use]
    pub fn new(defaults: ContentRecord) -> Self {
        Self {
            record: RwLock::new(defaults.clone()),
            defaults,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ContentRecord::default())
    }
}

impl ContentStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Ephemeral
    }

    fn defaults(&self) -> &ContentRecord {
        &self.defaults
    }

    // The record is seeded at construction, so there is nothing to do.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn fetch(&self) -> Result<ContentRecord> {
        Ok(self.record.read().clone())
    }

    fn replace(&self, record: &ContentRecord) -> Result<()> {
        *self.record.write() = record.clone();
        Ok(())
    }
}
