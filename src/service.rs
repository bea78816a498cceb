//! Bridge from a composed handler to a hyper service.
//!
//! plait does not accept connections. Drive hyper however you like and hand
//! it a [`HandlerService`]:
//!
//! ```rust,ignore
//! let svc = HandlerService::new(app);
//! ConnBuilder::new(TokioExecutor::new())
//!     .serve_connection(TokioIo::new(stream), svc)
//!     .await?;
//! ```
//!
//! `demos/basic.rs` has the full accept loop with graceful shutdown.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;

use crate::error::BoxError;
use crate::handler::{BoxedHandler, Handler, dispatch};
use crate::request::Request;

/// A hyper [`Service`] running every request through one composed handler.
///
/// Cloning shares the handler.
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedHandler,
    tls: bool,
}

impl HandlerService {
    pub fn new(handler: impl Handler) -> Self {
        Self { handler: Arc::new(handler), tls: false }
    }

    /// Marks every request as having arrived over a completed TLS handshake.
    /// Use when the service is mounted behind a TLS acceptor.
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

impl<B> Service<http::Request<B>> for HandlerService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let tls = self.tls;
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => return Err(e.into()),
            };
            let req = Request::from_parts(parts, body).with_tls(tls);
            Ok::<_, BoxError>(dispatch(&handler, req).await.into_http())
        })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::LOCATION;

    use super::*;
    use crate::adapter::adapt;
    use crate::handler::writer_fn;
    use crate::middleware::ensure_https;

    fn app() -> BoxedHandler {
        adapt(
            writer_fn(|req, res| {
                res.write_status(StatusCode::OK);
                res.write(req.body());
            }),
            &[ensure_https(false)],
        )
    }

    fn request(body: &'static str) -> http::Request<Full<Bytes>> {
        http::Request::post("/echo")
            .header("host", "example.com")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn plaintext_service_redirects() {
        let svc = HandlerService::new(app());
        let res = svc.call(request("hi")).await.unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[LOCATION], "https://example.com/echo");
    }

    #[tokio::test]
    async fn tls_service_reaches_handler_with_body() {
        let svc = HandlerService::new(app()).tls(true);
        let res = svc.call(request("hi")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "hi");
    }
}
