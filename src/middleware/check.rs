//! Conditional branching on a caller-supplied check.

use std::sync::Arc;

use http::StatusCode;
use tracing::info;

use crate::adapter::Adapter;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, Redirect, boxed};
use crate::request::Request;
use crate::sink::ResponseSink;

/// Decides which of two handlers serves a request.
///
/// Gets the sink as well as the request so a check can, for example, look at
/// headers an outer adapter already set.
pub type HandlerChecker = Arc<dyn Fn(&mut dyn ResponseSink, &Request) -> bool + Send + Sync>;

/// Runs the wrapped handler when `check` returns true, `otherwise` when it
/// returns false. Exactly one of the two runs.
///
/// `log_on_false` is logged each time the check fails.
///
/// ```rust
/// use plait::{adapt, handler_fn, Redirect, Request};
/// use plait::middleware::on_check;
///
/// async fn dashboard(_req: Request) -> &'static str { "dashboard" }
///
/// let app = adapt(
///     handler_fn(dashboard),
///     &[on_check(
///         |_res, req| req.header("cookie").is_some_and(|c| c.contains("session=")),
///         Redirect::temporary("/login").unwrap(),
///         Some("no session"),
///     )],
/// );
/// ```
pub fn on_check<F>(check: F, otherwise: impl Handler, log_on_false: Option<&str>) -> Adapter
where
    F: Fn(&mut dyn ResponseSink, &Request) -> bool + Send + Sync + 'static,
{
    let check: HandlerChecker = Arc::new(check);
    let otherwise = boxed(otherwise);
    let log_on_false = log_on_false.map(str::to_owned);
    Adapter::new("on_check", move |inner| {
        boxed(OnCheck {
            check: Arc::clone(&check),
            otherwise: Arc::clone(&otherwise),
            log_on_false: log_on_false.clone(),
            inner,
        })
    })
}

/// [`on_check`] whose fallback is a redirect handler. The log message gets
/// ` redirecting` appended.
pub fn check_and_redirect<F>(
    check: F,
    redirect: impl Handler,
    log_on_redirect: Option<&str>,
) -> Adapter
where
    F: Fn(&mut dyn ResponseSink, &Request) -> bool + Send + Sync + 'static,
{
    let message = log_on_redirect.map(|m| format!("{m} redirecting"));
    on_check(check, redirect, message.as_deref())
}

/// [`check_and_redirect`] to a fixed `url` with `status`.
///
/// Fails if `url` is not a valid header value.
pub fn check_and_redirect_to<F>(
    check: F,
    url: &str,
    status: StatusCode,
    log_on_redirect: Option<&str>,
) -> Result<Adapter, Error>
where
    F: Fn(&mut dyn ResponseSink, &Request) -> bool + Send + Sync + 'static,
{
    let redirect = Redirect::new(url, status)?;
    Ok(check_and_redirect(check, redirect, log_on_redirect))
}

struct OnCheck {
    check: HandlerChecker,
    otherwise: BoxedHandler,
    log_on_false: Option<String>,
    inner: BoxedHandler,
}

impl Handler for OnCheck {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if (self.check)(&mut *res, &req) {
            return self.inner.serve(req, res);
        }
        if let Some(message) = &self.log_on_false {
            info!(path = %req.path(), "{message}");
        }
        self.otherwise.serve(req, res)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::header::LOCATION;

    use super::*;
    use crate::adapter::adapt;
    use crate::handler::{dispatch, writer_fn};

    fn get(logged_in: bool) -> Request {
        let mut builder = http::Request::get("/dashboard");
        if logged_in {
            builder = builder.header("cookie", "session=abc");
        }
        Request::from(builder.body(Bytes::new()).unwrap())
    }

    fn logged_in(_res: &mut dyn ResponseSink, req: &Request) -> bool {
        req.header("cookie").is_some_and(|c| c.contains("session="))
    }

    fn counting(calls: &Arc<AtomicUsize>, status: StatusCode) -> impl Handler {
        let calls = Arc::clone(calls);
        writer_fn(move |_req, res| {
            calls.fetch_add(1, Ordering::SeqCst);
            res.write_status(status);
        })
    }

    #[tokio::test]
    async fn true_runs_primary_only() {
        let primary = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));
        let app = adapt(
            counting(&primary, StatusCode::OK),
            &[on_check(logged_in, counting(&fallback, StatusCode::UNAUTHORIZED), None)],
        );

        assert_eq!(dispatch(&app, get(true)).await.status(), StatusCode::OK);
        assert_eq!(primary.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn false_runs_fallback_only() {
        let primary = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));
        let app = adapt(
            counting(&primary, StatusCode::OK),
            &[on_check(
                logged_in,
                counting(&fallback, StatusCode::UNAUTHORIZED),
                Some("not logged in"),
            )],
        );

        assert_eq!(dispatch(&app, get(false)).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(primary.load(Ordering::SeqCst), 0);
        assert_eq!(fallback.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_sees_headers_set_by_outer_adapters() {
        let primary = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));
        let app = adapt(
            counting(&primary, StatusCode::OK),
            &[
                crate::middleware::add_header(
                    http::HeaderName::from_static("x-checked"),
                    http::HeaderValue::from_static("yes"),
                ),
                on_check(
                    |res, _req| res.headers().contains_key("x-checked"),
                    counting(&fallback, StatusCode::FORBIDDEN),
                    None,
                ),
            ],
        );

        assert_eq!(dispatch(&app, get(false)).await.status(), StatusCode::OK);
        assert_eq!(primary.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_and_redirect_to_url() {
        let primary = Arc::new(AtomicUsize::new(0));
        let redirect =
            check_and_redirect_to(logged_in, "/login", StatusCode::SEE_OTHER, Some("anonymous"))
                .unwrap();
        let app = adapt(counting(&primary, StatusCode::OK), &[redirect]);

        let res = dispatch(&app, get(false)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/login");
        assert_eq!(primary.load(Ordering::SeqCst), 0);

        assert_eq!(dispatch(&app, get(true)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn check_and_redirect_with_handler() {
        let primary = Arc::new(AtomicUsize::new(0));
        let app = adapt(
            counting(&primary, StatusCode::OK),
            &[check_and_redirect(logged_in, Redirect::temporary("/login").unwrap(), None)],
        );

        let res = dispatch(&app, get(false)).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(primary.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_redirect_url_is_rejected() {
        let err = check_and_redirect_to(logged_in, "/\n", StatusCode::FOUND, None).unwrap_err();
        assert!(matches!(err, Error::InvalidHeaderValue(_)));
    }
}
