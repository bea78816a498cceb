//! Header, cookie and per-request value injection.
//!
//! Each adapter does its work before delegating, so the wrapped handler sees
//! the injected header on the sink (and may overwrite it) or the injected
//! value on the request.

use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use tracing::warn;

use crate::adapter::Adapter;
use crate::error::BoxError;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::sink::ResponseSink;

type CookieWriter = Arc<dyn Fn(&mut dyn ResponseSink, &Request) -> Result<(), BoxError> + Send + Sync>;

/// Sets a static response header, then delegates.
pub fn add_header(name: HeaderName, value: HeaderValue) -> Adapter {
    Adapter::new("add_header", move |inner| {
        boxed(AddHeader { name: name.clone(), value: value.clone(), inner })
    })
}

/// Sets `name` to a value produced per request, then delegates.
///
/// Useful for minting per-request tokens (CSRF and the like). A value that is
/// not a valid header is logged and skipped; the request still goes through.
pub fn add_header_with_func<F>(name: HeaderName, generate: F) -> Adapter
where
    F: Fn() -> String + Send + Sync + 'static,
{
    let generate: Arc<dyn Fn() -> String + Send + Sync> = Arc::new(generate);
    Adapter::new("add_header_with_func", move |inner| {
        boxed(AddHeaderWithFunc {
            name: name.clone(),
            generate: Arc::clone(&generate),
            inner,
        })
    })
}

/// Calls `write_cookie` with the sink before delegating. The function writes
/// the cookie itself, typically via [`set_cookie`](crate::set_cookie).
///
/// A failing `write_cookie` is logged at `warn` with `name` and the request
/// continues to the wrapped handler.
pub fn add_cookie_with_func<F>(name: impl Into<String>, write_cookie: F) -> Adapter
where
    F: Fn(&mut dyn ResponseSink) -> Result<(), BoxError> + Send + Sync + 'static,
{
    add_cookie_with_request_func(name, move |res, _req| write_cookie(res))
}

/// Like [`add_cookie_with_func`], but the function also sees the request.
pub fn add_cookie_with_request_func<F>(name: impl Into<String>, write_cookie: F) -> Adapter
where
    F: Fn(&mut dyn ResponseSink, &Request) -> Result<(), BoxError> + Send + Sync + 'static,
{
    let name = name.into();
    let write_cookie: CookieWriter = Arc::new(write_cookie);
    Adapter::new("add_cookie_with_func", move |inner| {
        boxed(AddCookie {
            name: name.clone(),
            write_cookie: Arc::clone(&write_cookie),
            inner,
        })
    })
}

/// Attaches a per-request value to the request's extensions, then delegates.
///
/// The wrapped handler reads it back with [`Request::extension`]:
///
/// ```rust
/// use plait::{adapt, handler_fn, Request};
/// use plait::middleware::inject_value;
///
/// #[derive(Clone)]
/// struct RequestId(String);
///
/// async fn show(req: Request) -> String {
///     req.extension::<RequestId>().map(|id| id.0.clone()).unwrap_or_default()
/// }
///
/// let app = adapt(
///     handler_fn(show),
///     &[inject_value(|req: &Request| RequestId(req.path().to_owned()))],
/// );
/// ```
pub fn inject_value<T, F>(make: F) -> Adapter
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&Request) -> T + Send + Sync + 'static,
{
    let make: Arc<dyn Fn(&Request) -> T + Send + Sync> = Arc::new(make);
    Adapter::new("inject_value", move |inner| {
        boxed(InjectValue { make: Arc::clone(&make), inner })
    })
}

struct AddHeader {
    name: HeaderName,
    value: HeaderValue,
    inner: BoxedHandler,
}

impl Handler for AddHeader {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        res.headers_mut().insert(self.name.clone(), self.value.clone());
        self.inner.serve(req, res)
    }
}

struct AddHeaderWithFunc {
    name: HeaderName,
    generate: Arc<dyn Fn() -> String + Send + Sync>,
    inner: BoxedHandler,
}

impl Handler for AddHeaderWithFunc {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        match HeaderValue::try_from((self.generate)()) {
            Ok(value) => {
                res.headers_mut().insert(self.name.clone(), value);
            }
            Err(e) => warn!(header = %self.name, error = %e, "generated header value is invalid"),
        }
        self.inner.serve(req, res)
    }
}

struct AddCookie {
    name: String,
    write_cookie: CookieWriter,
    inner: BoxedHandler,
}

impl Handler for AddCookie {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if let Err(e) = (self.write_cookie)(&mut *res, &req) {
            warn!(cookie = %self.name, error = %e, "failed to write cookie");
        }
        self.inner.serve(req, res)
    }
}

struct InjectValue<T> {
    make: Arc<dyn Fn(&Request) -> T + Send + Sync>,
    inner: BoxedHandler,
}

impl<T: Clone + Send + Sync + 'static> Handler for InjectValue<T> {
    fn serve<'a>(&'a self, mut req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let value = (self.make)(&req);
        req.extensions_mut().insert(value);
        self.inner.serve(req, res)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;
    use http::header::{CACHE_CONTROL, SET_COOKIE};

    use super::*;
    use crate::adapter::adapt;
    use crate::handler::{dispatch, handler_fn, writer_fn};
    use crate::response::set_cookie;

    fn get() -> Request {
        Request::from(http::Request::get("/form").body(Bytes::new()).unwrap())
    }

    fn ok() -> impl Handler {
        writer_fn(|_req, res| res.write_status(StatusCode::OK))
    }

    #[tokio::test]
    async fn static_header_is_set() {
        let app = adapt(ok(), &[add_header(CACHE_CONTROL, HeaderValue::from_static("no-store"))]);
        let res = dispatch(&app, get()).await;
        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn inner_handler_can_override_header() {
        let inner = writer_fn(|_req, res| {
            res.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        });
        let app = adapt(inner, &[add_header(CACHE_CONTROL, HeaderValue::from_static("no-store"))]);
        let res = dispatch(&app, get()).await;
        assert_eq!(res.headers()[CACHE_CONTROL], "max-age=60");
    }

    #[tokio::test]
    async fn generated_header_is_fresh_per_request() {
        let counter = Arc::new(AtomicUsize::new(0));
        let minted = Arc::clone(&counter);
        let app = adapt(
            ok(),
            &[add_header_with_func(HeaderName::from_static("x-csrf-token"), move || {
                format!("token-{}", minted.fetch_add(1, Ordering::SeqCst))
            })],
        );

        assert_eq!(dispatch(&app, get()).await.headers()["x-csrf-token"], "token-0");
        assert_eq!(dispatch(&app, get()).await.headers()["x-csrf-token"], "token-1");
    }

    #[tokio::test]
    async fn invalid_generated_header_is_skipped() {
        let app = adapt(
            ok(),
            &[add_header_with_func(HeaderName::from_static("x-token"), || "bad\nvalue".to_owned())],
        );
        let res = dispatch(&app, get()).await;
        assert!(res.headers().get("x-token").is_none());
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cookie_writer_sets_cookie() {
        let app = adapt(
            ok(),
            &[add_cookie_with_func("csrf", |res| {
                set_cookie(res, "csrf=abc; Path=/; HttpOnly")?;
                Ok(())
            })],
        );
        let res = dispatch(&app, get()).await;
        assert_eq!(res.headers()[SET_COOKIE], "csrf=abc; Path=/; HttpOnly");
    }

    #[tokio::test]
    async fn cookie_writer_sees_request() {
        let app = adapt(
            ok(),
            &[add_cookie_with_request_func("last", |res, req| {
                set_cookie(res, &format!("last={}", req.path()))?;
                Ok(())
            })],
        );
        let res = dispatch(&app, get()).await;
        assert_eq!(res.headers()[SET_COOKIE], "last=/form");
    }

    #[tokio::test]
    async fn cookie_failure_does_not_stop_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let inner = writer_fn(move |_req, res| {
            seen.fetch_add(1, Ordering::SeqCst);
            res.write_status(StatusCode::OK);
        });
        let failing = add_cookie_with_func("csrf", |_res| Err("token store down".into()));
        let app = adapt(inner, &[failing]);

        let res = dispatch(&app, get()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(SET_COOKIE).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Tx(u32);

    #[tokio::test]
    async fn injected_value_reaches_handler() {
        let app = adapt(
            handler_fn(|req: Request| async move {
                match req.extension::<Tx>() {
                    Some(tx) => format!("tx {}", tx.0),
                    None => "no tx".to_owned(),
                }
            }),
            &[inject_value(|_req: &Request| Tx(7))],
        );
        let res = dispatch(&app, get()).await;
        assert_eq!(res.body(), b"tx 7");
    }
}
