//! # plait
//!
//! Declare a handler once, then wrap it in independently written policies.
//!
//! ## The contract
//!
//! An [`Adapter`] turns one [`Handler`] into another. [`adapt`] stacks a
//! list of adapters around a handler, **first adapter outermost**: it sees
//! the request first and the response last. Each adapter either passes the
//! request inward, hands it to a different handler, or answers on its own.
//! Adapters never look inside each other; they only see the [`Request`] and
//! the [`ResponseSink`].
//!
//! What plait leaves to others:
//!
//! - **Connections and TLS**: hyper / your TLS acceptor. [`HandlerService`]
//!   plugs a composed handler into hyper.
//! - **Routing**: the only path logic here is an exact-string comparison.
//! - **Metrics exposition**: collectors go into your `prometheus::Registry`;
//!   rendering it is up to you.
//!
//! ## Quick start
//!
//! ```rust
//! use http::Method;
//! use plait::middleware::{
//!     ResponseCounter, count_http_responses, disallow_longer_paths, ensure_https, notify,
//!     request_method,
//! };
//! use plait::{NotFound, Request, Response, adapt, handler_fn};
//!
//! # fn main() -> Result<(), plait::Error> {
//! let registry = prometheus::Registry::new();
//! let counter = ResponseCounter::register(&registry)?;
//!
//! let login = adapt(
//!     handler_fn(login),
//!     &[
//!         count_http_responses(&counter),
//!         notify(),
//!         ensure_https(true),
//!         request_method(Method::GET),
//!         disallow_longer_paths("/login", NotFound),
//!     ],
//! );
//! # let _ = login;
//! # Ok(())
//! # }
//!
//! async fn login(_req: Request) -> Response {
//!     Response::html("<form method=post>…</form>")
//! }
//! ```

mod adapter;
mod error;
mod handler;
mod request;
mod response;
mod service;
mod sink;

pub mod middleware;

pub use adapter::{Adapter, Chain, adapt};
pub use error::{BoxError, Error};
pub use handler::{
    BoxFuture, BoxedHandler, Handler, HandlerFn, NotFound, Redirect, WriterFn, dispatch,
    handler_fn, writer_fn,
};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder, error, redirect, set_cookie};
pub use service::HandlerService;
pub use sink::{ResponseSink, ResponseWriter, StatusRecorder};
