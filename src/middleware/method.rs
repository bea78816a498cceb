//! Method gating.

use http::{Method, StatusCode};

use crate::adapter::Adapter;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::response;
use crate::sink::ResponseSink;

const NOT_ALLOWED: &str = "Request method not allowed";

/// Lets only `method` through. Anything else gets `405 Method Not Allowed`
/// and the wrapped handler is not called.
pub fn request_method(method: Method) -> Adapter {
    Adapter::new("request_method", move |inner| {
        boxed(RequestMethod { method: method.clone(), inner })
    })
}

/// Serves `method` with `other` and GET with the wrapped handler.
/// Every other method gets `405 Method Not Allowed`.
///
/// `method` is checked first, so passing `Method::GET` sends GET to `other`.
///
/// ```rust
/// use http::Method;
/// use plait::{adapt, handler_fn, Request};
/// use plait::middleware::get_and_other_request;
///
/// async fn show_form(_req: Request) -> &'static str { "form" }
/// async fn submit_form(_req: Request) -> &'static str { "thanks" }
///
/// let form = adapt(
///     handler_fn(show_form),
///     &[get_and_other_request(handler_fn(submit_form), Method::POST)],
/// );
/// ```
pub fn get_and_other_request(other: impl Handler, method: Method) -> Adapter {
    let other = boxed(other);
    Adapter::new("get_and_other_request", move |inner| {
        boxed(GetAndOther { method: method.clone(), other: other.clone(), inner })
    })
}

fn method_not_allowed(res: &mut dyn ResponseSink) -> BoxFuture<'_> {
    response::error(res, NOT_ALLOWED, StatusCode::METHOD_NOT_ALLOWED);
    Box::pin(std::future::ready(()))
}

struct RequestMethod {
    method: Method,
    inner: BoxedHandler,
}

impl Handler for RequestMethod {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if *req.method() == self.method {
            self.inner.serve(req, res)
        } else {
            method_not_allowed(res)
        }
    }
}

struct GetAndOther {
    method: Method,
    other: BoxedHandler,
    inner: BoxedHandler,
}

impl Handler for GetAndOther {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if *req.method() == self.method {
            self.other.serve(req, res)
        } else if *req.method() == Method::GET {
            self.inner.serve(req, res)
        } else {
            method_not_allowed(res)
        }
    }
}
