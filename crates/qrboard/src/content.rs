//! The content record shown to visitors.
//!
//! A single `{title, message}` pair lives behind the QR code. Writes always
//! replace both fields together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Built-in title used until an administrator writes one.
pub const DEFAULT_TITLE: &str = "Welcome!";

/// Built-in message used until an administrator writes one.
pub const DEFAULT_MESSAGE: &str = "Scan this QR code to see dynamic content!";

/// The title/message pair behind the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Headline shown to visitors.
    pub title: String,

    /// Body text shown to visitors.
    pub message: String,

    /// When the record was last written. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    /// Create a record without a write timestamp.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            updated_at: None,
        }
    }

    /// Build a validated record stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if either field is empty or whitespace.
    pub fn for_write(title: &str, message: &str) -> Result<Self> {
        validate(title, message)?;
        Ok(Self {
            title: title.to_string(),
            message: message.to_string(),
            updated_at: Some(Utc::now()),
        })
    }

    /// Whether two records carry the same visible content, ignoring timestamps.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.title == other.title && self.message == other.message
    }
}

impl Default for ContentRecord {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, DEFAULT_MESSAGE)
    }
}

/// Check that both fields carry visible text.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the first empty field.
pub fn validate(title: &str, message: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("title"));
    }
    if message.trim().is_empty() {
        return Err(Error::validation("message"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = ContentRecord::default();
        assert_eq!(record.title, "Welcome!");
        assert_eq!(record.message, "Scan this QR code to see dynamic content!");
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_for_write_stamps_time() {
        let before = Utc::now();
        let record = ContentRecord::for_write("Sale", "50% off today").unwrap();
        assert_eq!(record.title, "Sale");
        assert_eq!(record.message, "50% off today");
        assert!(record.updated_at.unwrap() >= before);
    }

    #[test]
    fn test_for_write_keeps_text_verbatim() {
        let record = ContentRecord::for_write("  Sale ", "line one\nline two").unwrap();
        assert_eq!(record.title, "  Sale ");
        assert_eq!(record.message, "line one\nline two");
    }

    #[test]
    fn test_validate_empty_title() {
        let err = validate("", "message").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "title" }));
    }

    #[test]
    fn test_validate_empty_message() {
        let err = validate("title", "").unwrap_err();
        assert!(matches!(err, Error::Validation { field: "message" }));
    }

    #[test]
    fn test_validate_whitespace_only() {
        assert!(validate("   ", "message").is_err());
        assert!(validate("title", "\n\t").is_err());
    }

    #[test]
    fn test_same_content_ignores_timestamp() {
        let written = ContentRecord::for_write("A", "B").unwrap();
        assert!(written.same_content(&ContentRecord::new("A", "B")));
        assert!(!written.same_content(&ContentRecord::new("A", "C")));
    }

    #[test]
    fn test_serialization_omits_missing_timestamp() {
        let json = serde_json::to_string(&ContentRecord::new("T", "M")).unwrap();
        assert!(!json.contains("updated_at"));

        let written = ContentRecord::for_write("T", "M").unwrap();
        let json = serde_json::to_string(&written).unwrap();
        let back: ContentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, written);
    }
}
