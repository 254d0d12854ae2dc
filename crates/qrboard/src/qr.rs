//! QR code generation for the visitor URL.
//!
//! The encoded URL depends only on configuration, never on the stored
//! content, so a printed code keeps working after every edit. Symbol
//! construction is delegated to the `qrcode` crate and PNG encoding to
//! `image`.

use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::render::svg;
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode, Version};
use url::Url;

use crate::config::Config;
use crate::error::Result;
use crate::router::{VIEW_PARAM, VISITOR_FLAG};

/// File name offered when the PNG is downloaded.
pub const DOWNLOAD_FILE_NAME: &str = "qr_code.png";

/// MIME type of the downloadable image.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Build the URL a QR code should point at: the base URL with
/// `?view=content`.
#[must_use]
pub fn target_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    url.set_query(Some(&format!("{VIEW_PARAM}={VISITOR_FLAG}")));
    url.set_fragment(None);
    url
}

/// Strong ETag for a rendered image.
#[must_use]
pub fn etag(bytes: &[u8]) -> String {
    format!("\"{}\"", blake3::hash(bytes).to_hex())
}

/// Renders the QR code for a fixed target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrEncoder {
    target_url: String,
    module_size: u32,
    min_version: i16,
}

impl QrEncoder {
    /// Create an encoder for the given target URL.
    #[must_use]
    pub fn new(target_url: impl Into<String>, module_size: u32, min_version: i16) -> Self {
        Self {
            target_url: target_url.into(),
            module_size,
            min_version,
        }
    }

    /// Create an encoder pointing at the configured visitor URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let url = target_url(&config.base_url()?);
        Ok(Self::new(
            url.as_str(),
            config.qr.module_size,
            config.qr.min_version,
        ))
    }

    /// The URL encoded into every image.
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Build the QR symbol with high error correction.
    ///
    /// Starts at the configured minimum version and grows when the URL
    /// does not fit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QrEncode`](crate::Error::QrEncode) if the URL is too
    /// long for any QR version.
    pub fn symbol(&self) -> Result<QrCode> {
        let data = self.target_url.as_bytes();
        match QrCode::with_version(data, Version::Normal(self.min_version), EcLevel::H) {
            Ok(code) => Ok(code),
            Err(QrError::DataTooLong) => Ok(QrCode::with_error_correction_level(data, EcLevel::H)?),
            Err(e) => Err(e.into()),
        }
    }

    /// Render the code as an inline SVG document.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol cannot be built.
    pub fn svg(&self) -> Result<String> {
        let code = self.symbol()?;
        Ok(code
            .render::<svg::Color<'_>>()
            .quiet_zone(true)
            .module_dimensions(self.module_size, self.module_size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build())
    }

    /// Render the code as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol cannot be built or the image cannot
    /// be encoded.
    pub fn png(&self) -> Result<Vec<u8>> {
        let code = self.symbol()?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(self.module_size, self.module_size)
            .build();

        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn encoder() -> QrEncoder {
        QrEncoder::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_target_url_appends_view_flag() {
        let base = Url::parse("https://qr.example.com/").unwrap();
        assert_eq!(
            target_url(&base).as_str(),
            "https://qr.example.com/?view=content"
        );
    }

    #[test]
    fn test_target_url_replaces_existing_query_and_fragment() {
        let base = Url::parse("https://qr.example.com/app?view=admin#top").unwrap();
        assert_eq!(
            target_url(&base).as_str(),
            "https://qr.example.com/app?view=content"
        );
    }

    #[test]
    fn test_from_config_uses_base_url() {
        assert_eq!(encoder().target_url(), "http://localhost:8080/?view=content");
    }

    #[test]
    fn test_symbol_uses_min_version_and_high_ec() {
        let code = encoder().symbol().unwrap();
        assert_eq!(code.version(), Version::Normal(5));
        assert_eq!(code.error_correction_level(), EcLevel::H);
    }

    #[test]
    fn test_symbol_grows_for_long_urls() {
        let long = format!("https://example.com/{}?view=content", "a".repeat(200));
        let code = QrEncoder::new(long, 10, 5).symbol().unwrap();
        assert!(matches!(code.version(), Version::Normal(v) if v > 5));
    }

    #[test]
    fn test_symbol_too_long_fails() {
        let huge = format!("https://example.com/{}", "a".repeat(5000));
        let err = QrEncoder::new(huge, 10, 5).svg().unwrap_err();
        assert!(matches!(err, Error::QrEncode(QrError::DataTooLong)));
    }

    #[test]
    fn test_png_encoding() {
        let png = encoder().png().unwrap();
        assert!(png.starts_with(PNG_MAGIC));

        // Version 5 is 37 modules wide plus a 4-module quiet zone per side.
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), (37 + 8) * 10);
        assert_eq!(decoded.height(), (37 + 8) * 10);
    }

    #[test]
    fn test_png_is_deterministic() {
        assert_eq!(encoder().png().unwrap(), encoder().png().unwrap());
    }

    #[test]
    fn test_svg_rendering() {
        let svg = encoder().svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[test]
    fn test_etag_format() {
        let tag = etag(b"abc");
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 64 + 2);
        assert_eq!(tag, etag(b"abc"));
        assert_ne!(tag, etag(b"abd"));
    }
}
