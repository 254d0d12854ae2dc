//! Request dispatch.
//!
//! [`handle_request`] adapts a hyper request into an [`AppRequest`] and
//! enforces the body size limit; [`dispatch`] does the routing and is what
//! the tests drive directly.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::{BodyExt, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::{header, Method, Request, StatusCode};
use tracing::{debug, error, warn};

use super::response::{
    html_response, method_not_allowed_response, not_modified_response,
    payload_too_large_response, png_response, text_response, HttpResponse,
};
use super::AppState;
use crate::content::ContentRecord;
use crate::error::{Error, Result};
use crate::qr;
use crate::render::{
    AdminPage, FormValues, Notice, RESET_NOTICE, STORAGE_NOTICE, STORAGE_READ_NOTICE,
    UPDATED_NOTICE, VALIDATION_NOTICE,
};
use crate::router::{route_query, ViewKind};

/// A request reduced to the parts the application looks at.
#[derive(Debug, Clone, Default)]
pub struct AppRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path without the query.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Value of the `If-None-Match` header.
    pub if_none_match: Option<String>,
    /// Collected request body.
    pub body: Bytes,
}

impl AppRequest {
    /// A bodiless GET request for `path_and_query`.
    #[must_use]
    pub fn get(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method: Method::GET,
            path,
            query,
            ..Self::default()
        }
    }

    /// A form POST to `path` with an urlencoded body.
    #[must_use]
    pub fn post_form(path: &str, body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            body: body.into(),
            ..Self::default()
        }
    }

    fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Serve a hyper request.
///
/// # Errors
///
/// Never fails; every problem becomes an HTTP error response.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<HttpResponse, Infallible> {
    let max_body_size = state.config.server.max_body_size;
    debug!("{} {}", req.method(), req.uri());

    if let Some(resp) = check_body_size(&req, max_body_size) {
        return Ok(resp);
    }

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Ok(payload_too_large_response());
        }
    };

    let request = AppRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(ToString::to_string),
        if_none_match: parts
            .headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string),
        body,
    };

    Ok(dispatch(request, &state).await)
}

/// Reject requests whose declared length exceeds the limit before reading.
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let declared = req.headers().get(header::CONTENT_LENGTH)?;
    match declared.to_str().ok()?.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            warn!(
                "Request body too large: {} bytes (max: {})",
                size, max_body_size
            );
            Some(payload_too_large_response())
        }
        Ok(_) => None,
        Err(_) => {
            warn!("Invalid Content-Length header, skipping size check");
            None
        }
    }
}

/// Route a request to its page.
pub async fn dispatch(req: AppRequest, state: &Arc<AppState>) -> HttpResponse {
    if u64::try_from(req.body.len()).unwrap_or(u64::MAX) > state.config.server.max_body_size {
        return payload_too_large_response();
    }

    match req.path.as_str() {
        "/" => match req.method {
            Method::GET | Method::HEAD => show_page(&req, state).await,
            Method::POST if route_query(req.query.as_deref()) == ViewKind::Admin => {
                submit_content(&req, state).await
            }
            Method::POST => method_not_allowed_response("GET, HEAD"),
            _ => method_not_allowed_response("GET, HEAD, POST"),
        },
        "/reset" => match req.method {
            Method::POST => reset_content(state).await,
            _ => method_not_allowed_response("POST"),
        },
        "/qr.png" => match req.method {
            Method::GET | Method::HEAD => qr_image(&req, state).await,
            _ => method_not_allowed_response("GET, HEAD"),
        },
        "/healthz" => match req.method {
            Method::GET | Method::HEAD => text_response(StatusCode::OK, "ok", req.is_head()),
            _ => method_not_allowed_response("GET, HEAD"),
        },
        _ => error_page(
            state,
            StatusCode::NOT_FOUND,
            "The page you asked for does not exist.",
            req.is_head(),
        ),
    }
}

async fn show_page(req: &AppRequest, state: &Arc<AppState>) -> HttpResponse {
    match route_query(req.query.as_deref()) {
        ViewKind::Visitor => {
            let record = read_record(state).await;
            let rendered = state.renderer.visitor(&record);
            page_response(state, StatusCode::OK, rendered, req.is_head())
        }
        ViewKind::Admin => show_admin(req, state).await,
    }
}

/// The admin page says so when the store cannot be read.
async fn show_admin(req: &AppRequest, state: &Arc<AppState>) -> HttpResponse {
    let store = Arc::clone(&state.store);
    let (status, record, notice) = match run_blocking(move || store.fetch()).await {
        Ok(record) => (StatusCode::OK, record, None),
        Err(e) if e.is_storage_unavailable() => {
            warn!("Admin page served defaults, content store unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                state.store.defaults().clone(),
                Some(Notice::error(STORAGE_READ_NOTICE)),
            )
        }
        Err(e) => {
            error!("Content read failed: {}", e);
            return error_page(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "The content could not be loaded.",
                req.is_head(),
            );
        }
    };

    let rendered = render_admin(state, &record, FormValues::from(&record), notice);
    page_response(state, status, rendered, req.is_head())
}

async fn submit_content(req: &AppRequest, state: &Arc<AppState>) -> HttpResponse {
    let (title, message) = parse_content_form(&req.body);

    let store = Arc::clone(&state.store);
    let (t, m) = (title.clone(), message.clone());
    let result = run_blocking(move || store.write(&t, &m)).await;

    let submitted = FormValues {
        title: &title,
        message: &message,
    };
    after_write(state, result, UPDATED_NOTICE, submitted).await
}

async fn reset_content(state: &Arc<AppState>) -> HttpResponse {
    let store = Arc::clone(&state.store);
    let result = run_blocking(move || store.reset()).await;

    let defaults = state.store.defaults().clone();
    after_write(state, result, RESET_NOTICE, FormValues::from(&defaults)).await
}

/// Re-render the admin page after a write attempt.
///
/// On success the page shows the record that was just written. On failure
/// the form keeps what was submitted and the preview shows whatever the
/// store still holds.
async fn after_write(
    state: &Arc<AppState>,
    result: Result<ContentRecord>,
    success: &str,
    submitted: FormValues<'_>,
) -> HttpResponse {
    match result {
        Ok(record) => {
            let rendered = render_admin(
                state,
                &record,
                FormValues::from(&record),
                Some(Notice::success(success)),
            );
            page_response(state, StatusCode::OK, rendered, false)
        }
        Err(e) if e.is_validation() => {
            debug!("Rejected content write: {}", e);
            let record = read_record(state).await;
            let rendered =
                render_admin(state, &record, submitted, Some(Notice::error(VALIDATION_NOTICE)));
            page_response(state, StatusCode::UNPROCESSABLE_ENTITY, rendered, false)
        }
        Err(e) if e.is_storage_unavailable() => {
            error!("Content write failed: {}", e);
            let record = read_record(state).await;
            let rendered =
                render_admin(state, &record, submitted, Some(Notice::error(STORAGE_NOTICE)));
            page_response(state, StatusCode::SERVICE_UNAVAILABLE, rendered, false)
        }
        Err(e) => {
            error!("Content write failed: {}", e);
            error_page(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "The content could not be saved.",
                false,
            )
        }
    }
}

async fn qr_image(req: &AppRequest, state: &Arc<AppState>) -> HttpResponse {
    let encoder = state.qr.clone();
    let png = match run_blocking(move || encoder.png()).await {
        Ok(png) => png,
        Err(e) => {
            error!("QR image rendering failed: {}", e);
            return error_page(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "The QR code could not be rendered.",
                req.is_head(),
            );
        }
    };

    let etag = qr::etag(&png);
    if req
        .if_none_match
        .as_deref()
        .is_some_and(|candidates| etag_matches(candidates, &etag))
    {
        return not_modified_response(&etag);
    }
    png_response(png, &etag, req.is_head())
}

fn render_admin(
    state: &AppState,
    record: &ContentRecord,
    form: FormValues<'_>,
    notice: Option<Notice>,
) -> Result<String> {
    let qr_svg = state.qr.svg()?;
    state.renderer.admin(&AdminPage {
        target_url: state.qr.target_url(),
        qr_svg: &qr_svg,
        record,
        form,
        notice,
        backend: state.store.backend(),
    })
}

fn page_response(
    state: &AppState,
    status: StatusCode,
    rendered: Result<String>,
    is_head: bool,
) -> HttpResponse {
    match rendered {
        Ok(html) => html_response(status, html, is_head),
        Err(e) => {
            error!("Page rendering failed: {}", e);
            error_page(
                state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "The page could not be rendered.",
                is_head,
            )
        }
    }
}

fn error_page(state: &AppState, status: StatusCode, detail: &str, is_head: bool) -> HttpResponse {
    let reason = status.canonical_reason().unwrap_or("Error");
    match state.renderer.error(status.as_u16(), reason, detail) {
        Ok(html) => html_response(status, html, is_head),
        Err(e) => {
            error!("Error page rendering failed: {}", e);
            text_response(status, "request failed", is_head)
        }
    }
}

async fn read_record(state: &Arc<AppState>) -> ContentRecord {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.read()).await {
        Ok(record) => record,
        Err(e) => {
            error!("Content read task failed: {}", e);
            state.store.defaults().clone()
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}

/// Pull `title` and `message` out of an urlencoded form body.
///
/// Missing fields come back empty so validation can name them.
fn parse_content_form(body: &[u8]) -> (String, String) {
    let mut title = None;
    let mut message = None;
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "title" if title.is_none() => title = Some(value.into_owned()),
            "message" if message.is_none() => message = Some(value.into_owned()),
            _ => {}
        }
    }
    (title.unwrap_or_default(), message.unwrap_or_default())
}

fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match
        .split(',')
        .map(|candidate| candidate.trim().trim_start_matches("W/"))
        .any(|candidate| candidate == "*" || candidate == etag)
}
