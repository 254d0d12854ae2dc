//! Content storage for qrboard.
//!
//! A [`ContentStore`] holds exactly one [`ContentRecord`]. Two backends
//! implement the same contract:
//!
//! - [`MemoryStore`]: lives in process memory and is lost on exit.
//! - [`SqliteStore`]: a single-row `SQLite` table shared by every process
//!   that opens the same file.
//!
//! Backends only implement the raw [`fetch`](ContentStore::fetch) and
//! [`replace`](ContentStore::replace) primitives. Validation, timestamps and
//! the read fallback live in the provided methods so both backends behave
//! identically.

pub mod memory;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::content::ContentRecord;
use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A store shared between request handlers.
pub type SharedStore = Arc<dyn ContentStore>;

/// Which backend holds the content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process memory; lost when the process exits.
    Ephemeral,
    /// `SQLite` file; survives restarts and is shared between processes.
    #[default]
    Durable,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ephemeral => write!(f, "ephemeral"),
            Self::Durable => write!(f, "durable"),
        }
    }
}

/// Single-slot storage for the content record.
pub trait ContentStore: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn backend(&self) -> StoreBackend;

    /// The record served before any write.
    fn defaults(&self) -> &ContentRecord;

    /// Ensure a record exists, seeding it with the defaults.
    ///
    /// Never overwrites an existing record, so it is safe to call on every
    /// process start.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be reached.
    fn initialize(&self) -> Result<()>;

    /// Load the stored record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be reached.
    fn fetch(&self) -> Result<ContentRecord>;

    /// Replace the stored record in a single operation.
    ///
    /// Callers are expected to have validated the record already.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn replace(&self, record: &ContentRecord) -> Result<()>;

    /// Read the current record.
    ///
    /// Falls back to the defaults when the storage cannot be reached, so
    /// visitors still get a page.
    fn read(&self) -> ContentRecord {
        match self.fetch() {
            Ok(record) => record,
            Err(e) => {
                warn!("Content store unavailable, serving defaults: {}", e);
                self.defaults().clone()
            }
        }
    }

    /// Validate and store a new record, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if either
    /// field is empty, leaving the previous record untouched, or a storage
    /// error if the write fails.
    fn write(&self, title: &str, message: &str) -> Result<ContentRecord> {
        let record = ContentRecord::for_write(title, message)?;
        self.replace(&record)?;
        info!(
            backend = %self.backend(),
            "Content updated (title: {} chars, message: {} chars)",
            record.title.chars().count(),
            record.message.chars().count()
        );
        Ok(record)
    }

    /// Overwrite the stored record with the defaults.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    fn reset(&self) -> Result<ContentRecord> {
        let defaults = self.defaults().clone();
        self.write(&defaults.title, &defaults.message)
    }
}

/// Open and initialize the store selected by the configuration.
///
/// The durable database is connected on first use. If it cannot be reached
/// at startup the store is still returned: reads serve the defaults and
/// writes report [`Error::StorageUnavailable`](crate::Error::StorageUnavailable)
/// until the database becomes usable.
///
/// # Errors
///
/// Returns an error if initialization fails for any other reason, such as
/// a database written by a newer schema.
pub fn open_store(config: &Config) -> Result<SharedStore> {
    let defaults = config.default_record();
    let store: SharedStore = match config.storage.backend {
        StoreBackend::Ephemeral => Arc::new(MemoryStore::new(defaults)),
        StoreBackend::Durable => {
            Arc::new(SqliteStore::open_lazy(config.database_path(), defaults))
        }
    };
    match store.initialize() {
        Ok(()) => info!("Content store ready ({})", store.backend()),
        Err(e) if e.is_storage_unavailable() => {
            warn!("Content store unavailable, serving defaults until it recovers: {}", e);
        }
        Err(e) => return Err(e),
    }
    Ok(store)
}
