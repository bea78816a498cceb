//! Incoming HTTP request type.

use bytes::Bytes;
use http::header::HOST;
use http::{Extensions, HeaderMap, Method, Uri};

/// An incoming HTTP request as seen by handlers and adapters.
///
/// Adapters read it and pass it inward by value. The only change an adapter
/// makes is to attach values to its [`extensions`](Request::extensions_mut).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) extensions: Extensions,
    pub(crate) body: Bytes,
    pub(crate) tls: bool,
}

impl Request {
    /// Builds a request from the head and the collected body.
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
            tls: false,
        }
    }

    /// Marks whether the request arrived over a completed TLS handshake.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Raw query string, without the leading `?`. Empty if absent.
    pub fn query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// True when the direct transport completed a TLS handshake.
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Header lookup. Names are case-insensitive; non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Host` header, falling back to the URI authority (HTTP/2).
    pub fn host(&self) -> &str {
        self.header(HOST.as_str())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Returns a value attached by an adapter such as
    /// [`inject_value`](crate::middleware::inject_value).
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
