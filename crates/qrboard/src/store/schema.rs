//! `SQLite` schema definitions for the durable content store.

/// Fixed primary key of the single content row.
pub const CONTENT_ROW_ID: i64 = 1;

/// SQL statement to create the content table.
///
/// The `CHECK` constraint keeps the table to exactly one logical slot.
pub const CREATE_CONTENT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS content (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_CONTENT_TABLE, CREATE_METADATA_TABLE];
