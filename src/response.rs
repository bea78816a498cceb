//! Owned reply values and the [`IntoResponse`] conversion trait.
//!
//! Handlers built with [`handler_fn`](crate::handler_fn) return one of these;
//! it is replayed into the chain's [`ResponseSink`]. The free functions at the
//! bottom write the fixed responses the adapters produce.

use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderName, HeaderValue, StatusCode};
use tracing::warn;

use crate::error::Error;
use crate::sink::ResponseSink;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use http::StatusCode;
/// use plait::Response;
///
/// Response::text("hello");
/// Response::html("<h1>hello</h1>");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use http::StatusCode;
/// use plait::Response;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .text("created");
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw(TEXT_PLAIN, body.into().into_bytes())
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    fn bytes_raw(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![(CONTENT_TYPE.as_str().to_owned(), content_type.to_owned())],
            status: StatusCode::OK,
        }
    }

    /// Replays this response into `sink`: headers, then status, then body.
    ///
    /// Headers that are not valid HTTP are dropped with a warning.
    pub fn write_to(self, sink: &mut dyn ResponseSink) {
        for (name, value) in &self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    sink.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        sink.write_status(self.status);
        if !self.body.is_empty() {
            sink.write(&self.body);
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT_PLAIN, body.into().into_bytes())
    }

    /// Terminate with a body of any content type.
    pub fn bytes(self, content_type: &str, body: Vec<u8>) -> Response {
        self.finish(content_type, body)
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![(CONTENT_TYPE.as_str().to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

// ── Fixed responses ───────────────────────────────────────────────────────────

/// Writes a plain-text error body with `status`.
pub fn error(sink: &mut dyn ResponseSink, message: &str, status: StatusCode) {
    let headers = sink.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    sink.write_status(status);
    sink.write(message.as_bytes());
    sink.write(b"\n");
}

/// Points the client at `location` with a redirect `status`.
pub fn redirect(sink: &mut dyn ResponseSink, location: HeaderValue, status: StatusCode) {
    sink.headers_mut().insert(LOCATION, location);
    sink.write_status(status);
}

/// Appends a `Set-Cookie` header. `cookie` is the full header value,
/// e.g. `csrf=abc; Path=/; HttpOnly`.
pub fn set_cookie(sink: &mut dyn ResponseSink, cookie: &str) -> Result<(), Error> {
    let value = HeaderValue::from_str(cookie)?;
    sink.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
