//! The write side of a request: [`ResponseSink`] and its two implementations.
//!
//! [`ResponseWriter`] buffers a whole response and sits at the top of every
//! chain. [`StatusRecorder`] decorates another sink and remembers the status
//! the inner handler wrote, which is what the instrumentation adapters label
//! their observations with.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::debug;

/// The capability a handler uses to produce its response.
///
/// The status is committed once: a second `write_status` is ignored, and
/// writing body bytes before any status commits `200 OK`.
pub trait ResponseSink: Send {
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    /// The status already committed, if any.
    fn committed(&self) -> Option<StatusCode>;
    fn write_status(&mut self, status: StatusCode);
    fn write(&mut self, chunk: &[u8]);
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// Buffering response sink.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, `200 OK` if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffered response into the form hyper sends.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *res.headers_mut() = self.headers;
        res
    }
}

impl ResponseSink for ResponseWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn committed(&self) -> Option<StatusCode> {
        self.status
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(committed) => {
                debug!(%committed, ignored = %status, "superfluous write_status call");
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }
}

// ── StatusRecorder ────────────────────────────────────────────────────────────

/// Sink decorator that records the status the response goes out with.
///
/// Every call is forwarded unchanged to the wrapped sink. If an outer layer
/// already committed a status on that sink, the recorder starts from it, so
/// later writes through the recorder do not change what it reports.
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseSink,
    status: Option<StatusCode>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink) -> Self {
        let status = inner.committed();
        Self { inner, status }
    }

    /// Committed status, or `200 OK` if none was ever written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }
}

impl ResponseSink for StatusRecorder<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn committed(&self) -> Option<StatusCode> {
        self.status
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
        self.inner.write_status(status);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.inner.write(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_status_wins() {
        let mut res = ResponseWriter::new();
        res.write_status(StatusCode::NOT_FOUND);
        res.write_status(StatusCode::OK);
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_write_commits_ok() {
        let mut res = ResponseWriter::new();
        res.write(b"hi");
        res.write_status(StatusCode::IM_A_TEAPOT);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"hi");
    }

    #[test]
    fn recorder_defaults_to_ok() {
        let mut res = ResponseWriter::new();
        let recorder = StatusRecorder::new(&mut res);
        assert_eq!(recorder.status(), StatusCode::OK);
    }

    #[test]
    fn recorder_keeps_first_status_and_forwards() {
        let mut res = ResponseWriter::new();
        let mut recorder = StatusRecorder::new(&mut res);
        recorder.write_status(StatusCode::CREATED);
        recorder.write_status(StatusCode::BAD_REQUEST);
        recorder.headers_mut().insert("x-seen", "1".parse().unwrap());
        recorder.write(b"done");
        assert_eq!(recorder.status(), StatusCode::CREATED);

        let res = res.into_http();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["x-seen"], "1");
    }

    #[test]
    fn recorder_starts_from_status_committed_outside() {
        let mut res = ResponseWriter::new();
        res.write_status(StatusCode::FORBIDDEN);

        let mut recorder = StatusRecorder::new(&mut res);
        assert_eq!(recorder.committed(), Some(StatusCode::FORBIDDEN));
        recorder.write_status(StatusCode::OK);
        assert_eq!(recorder.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
