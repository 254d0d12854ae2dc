//! Durable content store backed by `SQLite`.
//!
//! The record lives in a single row with a fixed key. Every process that
//! opens the same file sees the same record; concurrent writers are
//! serialized by `SQLite` and the last write wins.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::schema::CONTENT_ROW_ID;
use super::{migrations, ContentStore, StoreBackend};
use crate::content::ContentRecord;
use crate::error::{Error, Result};

/// How long a writer waits for another process to release the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Content store persisted in a `SQLite` database.
///
/// The connection is opened on first use when the store is created with
/// [`SqliteStore::open_lazy`]. A failed open leaves the store disconnected
/// and is retried on the next call.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, if one has been established.
    conn: Mutex<Option<Connection>>,
    /// Record served before the first write.
    defaults: ContentRecord,
}

impl SqliteStore {
    /// Open or create a content database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date. Does not seed the record; call
    /// [`ContentStore::initialize`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>, defaults: ContentRecord) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Self::connect(&path)?;
        Ok(Self {
            path,
            conn: Mutex::new(Some(conn)),
            defaults,
        })
    }

    /// Create a store that connects on first use.
    #[must_use]
    pub fn open_lazy(path: impl AsRef<Path>, defaults: ContentRecord) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
            defaults,
        }
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(defaults: ContentRecord) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(Some(conn)),
            defaults,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }

    fn connect(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening content database at {}", path.display());
        let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
            path: path.to_path_buf(),
            source,
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets visitors keep reading while an administrator writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Content database opened at {}", path.display());
        Ok(conn)
    }

    /// Run `f` against the connection, opening it first if needed.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(Self::connect(&self.path)?);
        }
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::storage_unavailable("database connection missing")),
        }
    }

    /// Convert the content row into a record.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ContentRecord> {
        let title: String = row.get(0)?;
        let message: String = row.get(1)?;
        let updated_at_str: String = row.get(2)?;

        let updated_at = match DateTime::parse_from_rfc3339(&updated_at_str) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                warn!("Unparseable updated_at '{}' in content row", updated_at_str);
                None
            }
        };

        Ok(ContentRecord {
            title,
            message,
            updated_at,
        })
    }
}

impl ContentStore for SqliteStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Durable
    }

    fn defaults(&self) -> &ContentRecord {
        &self.defaults
    }

    fn initialize(&self) -> Result<()> {
        let inserted = self.with_conn(|conn| {
            Ok(conn.execute(
                "INSERT OR IGNORE INTO content (id, title, message) VALUES (?1, ?2, ?3)",
                params![CONTENT_ROW_ID, self.defaults.title, self.defaults.message],
            )?)
        })?;

        if inserted > 0 {
            info!("Seeded content database with default record");
        } else {
            debug!("Content record already present, leaving it untouched");
        }
        Ok(())
    }

    fn fetch(&self) -> Result<ContentRecord> {
        let record = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT title, message, updated_at FROM content WHERE id = ?1",
                    [CONTENT_ROW_ID],
                    Self::row_to_record,
                )
                .optional()?)
        })?;

        Ok(record.unwrap_or_else(|| {
            debug!("Content row missing, serving defaults");
            self.defaults.clone()
        }))
    }

    fn replace(&self, record: &ContentRecord) -> Result<()> {
        let updated_at = record.updated_at.unwrap_or_else(Utc::now).to_rfc3339();

        self.with_conn(|conn| {
            conn.execute(
                r"
                INSERT INTO content (id, title, message, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    message = excluded.message,
                    updated_at = excluded.updated_at
                ",
                params![CONTENT_ROW_ID, record.title, record.message, updated_at],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory(ContentRecord::default()).expect("failed to create test store")
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_fetch_before_initialize_serves_defaults() {
        let store = create_test_store();
        assert_eq!(store.fetch().unwrap(), ContentRecord::default());
    }

    #[test]
    fn test_initialize_seeds_row_with_timestamp() {
        let store = create_test_store();
        store.initialize().unwrap();

        let record = store.fetch().unwrap();
        assert!(record.same_content(&ContentRecord::default()));
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_initialize_keeps_existing_row() {
        let store = create_test_store();
        store.initialize().unwrap();
        store.write("Kept", "Across restarts").unwrap();

        store.initialize().unwrap();
        assert_eq!(store.fetch().unwrap().title, "Kept");
    }

    #[test]
    fn test_replace_stores_exact_timestamp() {
        let store = create_test_store();
        let record = ContentRecord::for_write("Sale", "50% off today").unwrap();
        store.replace(&record).unwrap();

        assert_eq!(store.fetch().unwrap(), record);
    }

    #[test]
    fn test_single_row_after_many_writes() {
        let store = create_test_store();
        store.initialize().unwrap();
        for i in 0..5 {
            store.write(&format!("Title {i}"), "Body").unwrap();
        }

        let count: i64 = store
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.fetch().unwrap().title, "Title 4");
    }

    #[test]
    fn test_unicode_content() {
        let store = create_test_store();
        store.write("Hello 世界 🌍", "مرحبا").unwrap();

        let record = store.fetch().unwrap();
        assert_eq!(record.title, "Hello 世界 🌍");
        assert_eq!(record.message, "مرحبا");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("content.db");

        let store = SqliteStore::open(&db_path, ContentRecord::default()).unwrap();
        store.initialize().unwrap();
        store.write("Sale", "50% off today").unwrap();
        assert_eq!(store.path(), db_path);
        drop(store);

        let reopened = SqliteStore::open(&db_path, ContentRecord::default()).unwrap();
        reopened.initialize().unwrap();
        let record = reopened.read();
        assert_eq!(record.title, "Sale");
        assert_eq!(record.message, "50% off today");
    }

    #[test]
    fn test_writes_visible_to_other_handles() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("shared.db");

        let admin = SqliteStore::open(&db_path, ContentRecord::default()).unwrap();
        let visitor = SqliteStore::open(&db_path, ContentRecord::default()).unwrap();
        admin.initialize().unwrap();
        visitor.initialize().unwrap();

        admin.write("Fresh", "From the admin").unwrap();
        assert_eq!(visitor.read().title, "Fresh");
    }

    #[test]
    fn test_concurrent_writers_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("race.db");
        SqliteStore::open(&db_path, ContentRecord::default())
            .unwrap()
            .initialize()
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let path = db_path.clone();
                std::thread::spawn(move || {
                    let store = SqliteStore::open(&path, ContentRecord::default()).unwrap();
                    for j in 0..10 {
                        store.write(&format!("writer {i}"), &format!("write {j}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = SqliteStore::open(&db_path, ContentRecord::default()).unwrap();
        let record = store.read();
        assert!(record.title.starts_with("writer "));
        assert_eq!(record.message, "write 9");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/content.db");

        let store = SqliteStore::open(&nested_path, ContentRecord::default()).unwrap();
        assert!(nested_path.exists());
        drop(store);
    }

    #[test]
    fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = SqliteStore::open(blocker.join("sub/content.db"), ContentRecord::default())
            .unwrap_err();
        assert!(matches!(err, Error::DirectoryCreate { .. }));
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_lazy_store_reports_unavailable_and_serves_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = SqliteStore::open_lazy(blocker.join("content.db"), ContentRecord::default());
        assert!(!store.is_connected());

        assert!(store.fetch().unwrap_err().is_storage_unavailable());
        assert_eq!(store.read(), ContentRecord::default());
        assert!(store.write("Sale", "50% off").unwrap_err().is_storage_unavailable());
        assert!(!store.is_connected());
    }

    #[test]
    fn test_lazy_store_recovers_when_path_becomes_usable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = SqliteStore::open_lazy(blocker.join("content.db"), ContentRecord::default());
        assert!(store.initialize().is_err());

        std::fs::remove_file(&blocker).unwrap();
        store.write("Back", "Storage recovered").unwrap();
        assert!(store.is_connected());
        assert_eq!(store.read().title, "Back");
    }
}
