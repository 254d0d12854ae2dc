//! HTML rendering for the admin and visitor pages.
//!
//! Templates are compiled into the binary and rendered with minijinja.
//! Template names end in `.html`, so every interpolated value is
//! HTML-escaped unless the template marks it `safe`.

use minijinja::{context, Environment};
use serde::Serialize;

use crate::content::ContentRecord;
use crate::error::Result;
use crate::qr::DOWNLOAD_FILE_NAME;
use crate::store::StoreBackend;

const ADMIN_TEMPLATE: &str = include_str!("../templates/admin.html");
const VISITOR_TEMPLATE: &str = include_str!("../templates/visitor.html");
const ERROR_TEMPLATE: &str = include_str!("../templates/error.html");

/// Shown after a successful write.
pub const UPDATED_NOTICE: &str = "Content updated successfully!";

/// Shown after a reset to the default record.
pub const RESET_NOTICE: &str = "Content reset to defaults.";

/// Shown when a write is rejected for an empty field.
pub const VALIDATION_NOTICE: &str = "Please fill in both title and message";

/// Shown when the store cannot be written.
pub const STORAGE_NOTICE: &str = "Could not save content: storage is unavailable";

/// Shown when the admin page cannot load the stored record.
pub const STORAGE_READ_NOTICE: &str = "Storage is unavailable: showing the default content";

/// Tone of an admin notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The action worked.
    Success,
    /// The action was rejected or failed.
    Error,
}

/// One-line feedback shown above the admin form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Tone of the message.
    pub kind: NoticeKind,
    /// Text shown to the administrator.
    pub text: String,
}

impl Notice {
    /// A success notice.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Values pre-filled into the admin form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormValues<'a> {
    /// Title field value.
    pub title: &'a str,
    /// Message field value.
    pub message: &'a str,
}

impl<'a> From<&'a ContentRecord> for FormValues<'a> {
    fn from(record: &'a ContentRecord) -> Self {
        Self {
            title: &record.title,
            message: &record.message,
        }
    }
}

/// Everything the admin page shows.
#[derive(Debug, Clone, Serialize)]
pub struct AdminPage<'a> {
    /// URL encoded into the QR code.
    pub target_url: &'a str,
    /// Inline SVG rendering of the QR code.
    pub qr_svg: &'a str,
    /// The stored record, used for the preview.
    pub record: &'a ContentRecord,
    /// Values shown in the edit form.
    pub form: FormValues<'a>,
    /// Feedback from the last action, if any.
    pub notice: Option<Notice>,
    /// Which store backs the page.
    pub backend: StoreBackend,
}

/// Compiled page templates.
#[derive(Debug)]
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Compile the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("admin.html", ADMIN_TEMPLATE)?;
        env.add_template("visitor.html", VISITOR_TEMPLATE)?;
        env.add_template("error.html", ERROR_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render the editable admin page.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn admin(&self, page: &AdminPage<'_>) -> Result<String> {
        let template = self.env.get_template("admin.html")?;
        Ok(template.render(context! {
            download_name => DOWNLOAD_FILE_NAME,
            ..minijinja::Value::from_serialize(page)
        })?)
    }

    /// Render the read-only visitor page.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn visitor(&self, record: &ContentRecord) -> Result<String> {
        let template = self.env.get_template("visitor.html")?;
        Ok(template.render(context! { record })?)
    }

    /// Render a plain error page.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn error(&self, status: u16, reason: &str, detail: &str) -> Result<String> {
        let template = self.env.get_template("error.html")?;
        Ok(template.render(context! { status, reason, detail })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new().expect("templates should compile")
    }

    fn admin_page<'a>(record: &'a ContentRecord, notice: Option<Notice>) -> AdminPage<'a> {
        AdminPage {
            target_url: "http://localhost:8080/?view=content",
            qr_svg: "<svg id=\"qr\"></svg>",
            record,
            form: FormValues::from(record),
            notice,
            backend: StoreBackend::Durable,
        }
    }

    #[test]
    fn test_admin_page_contents() {
        let record = ContentRecord::new("Sale", "50% off today");
        let html = renderer().admin(&admin_page(&record, None)).unwrap();

        assert!(html.contains("Dynamic QR Code System"));
        // Auto-escaping encodes `/` in interpolated values.
        assert!(html.contains("http:&#x2f;&#x2f;localhost:8080&#x2f;?view=content"));
        assert!(html.contains("<svg id=\"qr\"></svg>"));
        assert!(html.contains("qr_code.png"));
        assert!(html.contains("value=\"Sale\""));
        assert!(html.contains("50% off today"));
        assert!(html.contains("Storage: durable"));
        assert!(!html.contains("class=\"notice"));
    }

    #[test]
    fn test_admin_page_notice() {
        let record = ContentRecord::default();
        let html = renderer()
            .admin(&admin_page(&record, Some(Notice::error(VALIDATION_NOTICE))))
            .unwrap();

        assert!(html.contains("notice error"));
        assert!(html.contains(VALIDATION_NOTICE));
    }

    #[test]
    fn test_admin_form_can_differ_from_record() {
        let record = ContentRecord::new("Stored", "Stored message");
        let mut page = admin_page(&record, None);
        page.form = FormValues {
            title: "",
            message: "Draft",
        };

        let html = renderer().admin(&page).unwrap();
        assert!(html.contains("value=\"\""));
        assert!(html.contains("Draft"));
        assert!(html.contains("<h3>Stored</h3>"));
    }

    #[test]
    fn test_visitor_page_contents() {
        let html = renderer()
            .visitor(&ContentRecord::new("Sale", "50% off today"))
            .unwrap();

        assert!(html.contains("<h1>Sale</h1>"));
        assert!(html.contains("50% off today"));
        assert!(!html.contains("<form"));
    }

    #[test]
    fn test_content_is_escaped() {
        let record = ContentRecord::new("<script>alert(1)</script>", "a & b");
        let r = renderer();

        let visitor = r.visitor(&record).unwrap();
        assert!(!visitor.contains("<script>alert(1)</script>"));
        assert!(visitor.contains("&lt;script&gt;"));
        assert!(visitor.contains("a &amp; b"));

        let admin = r.admin(&admin_page(&record, None)).unwrap();
        assert!(!admin.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_error_page() {
        let html = renderer().error(404, "Not Found", "No such page").unwrap();
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("No such page"));
    }

    #[test]
    fn test_notice_serializes_kind() {
        let json = serde_json::to_string(&Notice::success("ok")).unwrap();
        assert!(json.contains("\"kind\":\"success\""));
    }
}
