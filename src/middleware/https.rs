//! HTTPS enforcement.
//!
//! Two shapes, depending on how TLS reaches the process:
//!
//! - [`HttpsRedirect`] is a whole handler for a plaintext listener. Bind it
//!   alone on port 80 and every request bounces to the same URL over https.
//! - [`ensure_https`] wraps a handler that may be reached either way and
//!   only redirects requests that did not arrive over TLS. Behind a proxy
//!   that terminates TLS, pass `true` to trust `X-Forwarded-Proto: https`.

use http::{HeaderValue, StatusCode};
use http::uri::Authority;
use tracing::{info, warn};

use crate::adapter::Adapter;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::response;
use crate::sink::ResponseSink;

/// Header set by TLS-terminating proxies.
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Redirects every request to the https URL for the same host, path and
/// query with `307 Temporary Redirect`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpsRedirect {
    port: Option<u16>,
}

impl HttpsRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirect to `port` instead of the port the request came in on.
    pub fn to_port(port: u16) -> Self {
        Self { port: Some(port) }
    }
}

impl Handler for HttpsRedirect {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        let host = match self.port {
            Some(port) => format!("{}:{port}", hostname(req.host())),
            None => req.host().to_owned(),
        };
        redirect_to_https(&req, &host, res);
        Box::pin(std::future::ready(()))
    }
}

/// Delegates requests that arrived over TLS and redirects the rest to https
/// with `307 Temporary Redirect`.
///
/// With `allow_forwarded_proto`, a request carrying `X-Forwarded-Proto: https`
/// also counts as secure.
pub fn ensure_https(allow_forwarded_proto: bool) -> Adapter {
    Adapter::new("ensure_https", move |inner| {
        boxed(EnsureHttps { allow_forwarded_proto, inner })
    })
}

struct EnsureHttps {
    allow_forwarded_proto: bool,
    inner: BoxedHandler,
}

impl Handler for EnsureHttps {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if is_https(&req, self.allow_forwarded_proto) {
            return self.inner.serve(req, res);
        }
        redirect_to_https(&req, req.host(), res);
        Box::pin(std::future::ready(()))
    }
}

fn is_https(req: &Request, allow_forwarded_proto: bool) -> bool {
    req.is_tls() || (allow_forwarded_proto && req.header(X_FORWARDED_PROTO) == Some("https"))
}

/// `https://<host><path>[?<query>]`
fn https_url(req: &Request, host: &str) -> String {
    let mut target = format!("https://{host}{}", req.path());
    if !req.query().is_empty() {
        target.push('?');
        target.push_str(req.query());
    }
    target
}

fn redirect_to_https(req: &Request, host: &str, res: &mut dyn ResponseSink) {
    let target = https_url(req, host);
    match HeaderValue::from_str(&target) {
        Ok(location) => {
            info!(%target, "redirecting to https");
            response::redirect(res, location, StatusCode::TEMPORARY_REDIRECT);
        }
        // Unreachable for hosts read through `Request::host`.
        Err(_) => {
            warn!(host, "cannot build https redirect target");
            response::error(res, "Bad Request", StatusCode::BAD_REQUEST);
        }
    }
}

/// Host part of a `host[:port]` authority, brackets kept for IPv6.
fn hostname(host: &str) -> String {
    host.parse::<Authority>()
        .map(|authority| authority.host().to_owned())
        .unwrap_or_else(|_| host.to_owned())
}
