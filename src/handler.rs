//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Every adapter holds the handler it wraps without knowing its concrete
//! type, so the wrapped handler is a **trait object** behind an `Arc`:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ handler_fn(hello)
//! HandlerFn(hello)                                 ← implements Handler
//!        ↓ adapt(handler, &[…])
//! Arc<dyn Handler>  = BoxedHandler                 ← what adapters wrap
//!        ↓
//! handler.serve(req, &mut sink)  at request time   ← one vtable dispatch
//! ```
//!
//! The composed handler is built once and shared by every request; a
//! request costs one virtual call per layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{HeaderValue, StatusCode};
use tracing::info;

use crate::request::Request;
use crate::response::{self, IntoResponse};
use crate::sink::{ResponseSink, ResponseWriter};

/// A heap-allocated, type-erased future borrowing the handler and its sink.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// A unit that turns a [`Request`] into a response written to a sink.
///
/// Implement it directly for handlers that need the sink (adapters do), or
/// wrap an `async fn` with [`handler_fn`] / a sync writer with [`writer_fn`].
pub trait Handler: Send + Sync + 'static {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        (**self).serve(req, res)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        (**self).serve(req, res)
    }
}

/// Erases `handler` behind an `Arc`.
pub(crate) fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}

/// Runs `handler` against a fresh [`ResponseWriter`] and returns it.
pub async fn dispatch<H: Handler + ?Sized>(handler: &H, req: Request) -> ResponseWriter {
    let mut res = ResponseWriter::new();
    handler.serve(req, &mut res).await;
    res
}

// ── Function handlers ─────────────────────────────────────────────────────────

/// Wraps an `async fn(Request) -> impl IntoResponse`.
///
/// ```rust
/// use plait::{handler_fn, Request, Response};
///
/// async fn hello(_req: Request) -> Response {
///     Response::text("hello")
/// }
///
/// let handler = handler_fn(hello);
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    HandlerFn(f)
}

/// Handler returned by [`handler_fn`].
#[derive(Clone, Copy, Debug)]
pub struct HandlerFn<F>(F);

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response().write_to(res) })
    }
}

/// Wraps a synchronous function that writes to the sink itself.
///
/// A writer that never calls `write_status` leaves the status at `200 OK`.
pub fn writer_fn<F>(f: F) -> WriterFn<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) + Send + Sync + 'static,
{
    WriterFn(f)
}

/// Handler returned by [`writer_fn`].
#[derive(Clone, Copy, Debug)]
pub struct WriterFn<F>(F);

impl<F> Handler for WriterFn<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) + Send + Sync + 'static,
{
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        (self.0)(&req, res);
        Box::pin(std::future::ready(()))
    }
}

// ── Stock handlers ────────────────────────────────────────────────────────────

/// Standard "not found" responder: `404` with a plain-text body.
#[derive(Clone, Copy, Debug, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn serve<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        response::error(res, "404 page not found", StatusCode::NOT_FOUND);
        Box::pin(std::future::ready(()))
    }
}

/// Redirects every request to a fixed location.
#[derive(Clone, Debug)]
pub struct Redirect {
    location: HeaderValue,
    status: StatusCode,
}

impl Redirect {
    /// Fails if `location` cannot be sent as a header value.
    pub fn new(location: &str, status: StatusCode) -> Result<Self, crate::Error> {
        Ok(Self { location: HeaderValue::from_str(location)?, status })
    }

    /// `307 Temporary Redirect` to `location`.
    pub fn temporary(location: &str) -> Result<Self, crate::Error> {
        Self::new(location, StatusCode::TEMPORARY_REDIRECT)
    }
}

impl Handler for Redirect {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        info!(from = %req.uri(), to = ?self.location, status = %self.status, "redirecting");
        response::redirect(res, self.location.clone(), self.status);
        Box::pin(std::future::ready(()))
    }
}
