//! View selection from the `view` query flag.
//!
//! The QR code encodes `?view=content`; every other request lands on the
//! admin page.

use std::fmt;

/// Query parameter that selects the view.
pub const VIEW_PARAM: &str = "view";

/// Value of [`VIEW_PARAM`] that selects the visitor view.
pub const VISITOR_FLAG: &str = "content";

/// Which page a request renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Editable page with the QR code.
    Admin,
    /// Read-only page reached by scanning the QR code.
    Visitor,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Visitor => write!(f, "visitor"),
        }
    }
}

/// Pick the view for a `view` flag value.
///
/// Only an exact `content` selects the visitor view; anything else,
/// including a missing flag, falls back to the admin view.
#[must_use]
pub fn route(query_flag: Option<&str>) -> ViewKind {
    match query_flag {
        Some(VISITOR_FLAG) => ViewKind::Visitor,
        _ => ViewKind::Admin,
    }
}

/// Extract the first `view` value from a raw query string.
#[must_use]
pub fn view_flag(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == VIEW_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Route a raw query string.
#[must_use]
pub fn route_query(query: Option<&str>) -> ViewKind {
    route(view_flag(query).as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_content_is_visitor() {
        assert_eq!(route(Some("content")), ViewKind::Visitor);
    }

    #[test]
    fn test_route_absent_is_admin() {
        assert_eq!(route(None), ViewKind::Admin);
    }

    #[test]
    fn test_route_other_values_are_admin() {
        for flag in ["anything-else", "", "Content", "content ", "admin"] {
            assert_eq!(route(Some(flag)), ViewKind::Admin, "flag {flag:?}");
        }
    }

    #[test]
    fn test_view_flag_extraction() {
        assert_eq!(view_flag(Some("view=content")), Some("content".to_string()));
        assert_eq!(
            view_flag(Some("utm=print&view=content")),
            Some("content".to_string())
        );
        assert_eq!(view_flag(Some("other=1")), None);
        assert_eq!(view_flag(None), None);
    }

    #[test]
    fn test_view_flag_first_value_wins() {
        assert_eq!(
            view_flag(Some("view=admin&view=content")),
            Some("admin".to_string())
        );
    }

    #[test]
    fn test_view_flag_percent_decoded() {
        assert_eq!(view_flag(Some("view=cont%65nt")), Some("content".to_string()));
    }

    #[test]
    fn test_route_query() {
        assert_eq!(route_query(Some("view=content")), ViewKind::Visitor);
        assert_eq!(route_query(Some("view=nope")), ViewKind::Admin);
        assert_eq!(route_query(Some("")), ViewKind::Admin);
        assert_eq!(route_query(None), ViewKind::Admin);
    }

    #[test]
    fn test_view_kind_display() {
        assert_eq!(ViewKind::Admin.to_string(), "admin");
        assert_eq!(ViewKind::Visitor.to_string(), "visitor");
    }
}
