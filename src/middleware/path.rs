//! Exact-path gating.

use tracing::info;

use crate::adapter::Adapter;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::sink::ResponseSink;

/// Sends any request whose path is not exactly `path` to `not_found`.
///
/// Useful when a handler is mounted on a prefix (e.g. `/`) but should only
/// answer the path itself. Pass [`NotFound`](crate::NotFound) for the stock
/// 404, or any handler for a custom page. No prefix or wildcard matching.
pub fn disallow_longer_paths(path: impl Into<String>, not_found: impl Handler) -> Adapter {
    let path = path.into();
    let not_found = boxed(not_found);
    Adapter::new("disallow_longer_paths", move |inner| {
        boxed(ExactPath {
            path: path.clone(),
            not_found: not_found.clone(),
            inner,
        })
    })
}

struct ExactPath {
    path: String,
    not_found: BoxedHandler,
    inner: BoxedHandler,
}

impl Handler for ExactPath {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if req.path() != self.path {
            info!(expected = %self.path, received = %req.path(), "path does not match handler");
            return self.not_found.serve(req, res);
        }
        self.inner.serve(req, res)
    }
}
