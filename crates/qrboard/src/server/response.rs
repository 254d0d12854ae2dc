//! HTTP response builders.
//!
//! Every builder falls back to a bare response if the builder rejects a
//! header, so handlers never have to deal with build errors.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{header, Response, StatusCode};
use tracing::error;

use crate::qr::{DOWNLOAD_FILE_NAME, PNG_CONTENT_TYPE};

/// Response type produced by every handler.
pub type HttpResponse = Response<Full<Bytes>>;

/// Build an HTML page response.
///
/// HEAD requests get the same headers with an empty body.
pub fn html_response(status: StatusCode, content: String, is_head: bool) -> HttpResponse {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a plain text response.
pub fn text_response(status: StatusCode, text: &'static str, is_head: bool) -> HttpResponse {
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from_static(text.as_bytes())
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, text.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(text.as_bytes())))
        })
}

/// Build the QR image download response.
///
/// The image only changes when the configured URL does, so clients are
/// asked to revalidate against the ETag rather than cache blindly.
pub fn png_response(data: Vec<u8>, etag: &str, is_head: bool) -> HttpResponse {
    let content_length = data.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(data)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, PNG_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, content_length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{DOWNLOAD_FILE_NAME}\""),
        )
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn not_modified_response(etag: &str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(header::ETAG, etag)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NOT_MODIFIED, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 405 Method Not Allowed response
pub fn method_not_allowed_response(allow: &'static str) -> HttpResponse {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::ALLOW, allow)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::METHOD_NOT_ALLOWED, &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build 413 Payload Too Large response
pub fn payload_too_large_response() -> HttpResponse {
    text_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        "413 Payload Too Large",
        false,
    )
}

/// Log response build error
fn log_build_error(status: StatusCode, err: &hyper::http::Error) {
    error!("Failed to build {} response: {}", status, err);
}
