//! Minimal plait demo: a login page behind the usual policies, an https
//! bounce on a second port, and a metrics endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/login                                # 307 to https
//!   curl -i -H 'x-forwarded-proto: https' http://localhost:3000/login  # 200
//!   curl -i -H 'x-forwarded-proto: https' http://localhost:3000/login/x  # 404
//!   curl -i -X DELETE -H 'x-forwarded-proto: https' http://localhost:3000/login  # 405
//!   curl http://localhost:3000/metrics

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use http::{HeaderName, HeaderValue, Method, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use plait::middleware::{
    HttpsRedirect, ResponseCounter, ResponseTimer, add_cookie_with_func, add_header,
    add_header_with_func, count_http_responses, disallow_longer_paths, ensure_https,
    get_and_other_request, notify, track_http_response_times,
};
use plait::{
    BoxFuture, BoxedHandler, Handler, HandlerService, NotFound, Request, Response, ResponseSink,
    adapt, handler_fn, set_cookie,
};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

static TOKENS: AtomicU64 = AtomicU64::new(1);

#[tokio::main]
async fn main() -> Result<(), plait::BoxError> {
    tracing_subscriber::fmt::init();

    let registry = Registry::new();
    let counter = ResponseCounter::register(&registry)?;
    let timer = ResponseTimer::register(&registry)?;

    let login = adapt(
        handler_fn(show_login),
        &[
            count_http_responses(&counter),
            track_http_response_times(&timer),
            notify(),
            ensure_https(true),
            disallow_longer_paths("/login", NotFound),
            get_and_other_request(handler_fn(submit_login), Method::POST),
            add_header(
                HeaderName::from_static("cache-control"),
                HeaderValue::from_static("no-store"),
            ),
            add_header_with_func(HeaderName::from_static("x-csrf-token"), next_token),
            add_cookie_with_func("csrf", |res| {
                set_cookie(res, &format!("csrf={}; Path=/; HttpOnly", next_token()))?;
                Ok(())
            }),
        ],
    );

    let metrics = {
        let registry = registry.clone();
        adapt(
            handler_fn(move |_req: Request| {
                let registry = registry.clone();
                async move { render_metrics(&registry) }
            }),
            &[notify(), disallow_longer_paths("/metrics", NotFound)],
        )
    };

    let app = Routes { login, metrics };

    tokio::try_join!(
        serve("0.0.0.0:3000".parse()?, HandlerService::new(app)),
        serve("0.0.0.0:3080".parse()?, HandlerService::new(HttpsRedirect::to_port(3000))),
    )?;
    Ok(())
}

// GET /login
async fn show_login(_req: Request) -> Response {
    Response::html(r#"<form method="post"><input name="user"><button>Log in</button></form>"#)
}

// POST /login
async fn submit_login(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header("location", "/")
        .no_body()
}

fn next_token() -> String {
    format!("{:016x}", TOKENS.fetch_add(1, Ordering::Relaxed))
}

fn render_metrics(registry: &Registry) -> Response {
    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        Ok(()) => Response::builder().bytes("text/plain; version=0.0.4; charset=utf-8", buffer),
        Err(e) => {
            error!("failed to encode metrics: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// The demo needs something to pick between its two handlers; plait itself
/// stays out of routing.
struct Routes {
    login: BoxedHandler,
    metrics: BoxedHandler,
}

impl Handler for Routes {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        if req.path().starts_with("/metrics") {
            self.metrics.serve(req, res)
        } else {
            self.login.serve(req, res)
        }
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections on `addr` until Ctrl-C / SIGTERM, then drains
/// in-flight connections.
async fn serve(addr: SocketAddr, svc: HandlerService) -> Result<(), plait::BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    let mut tasks = tokio::task::JoinSet::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(%addr, in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let svc = svc.clone();
                tasks.spawn(async move {
                    let io = TokioIo::new(stream);
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    info!(%addr, "stopped");
    Ok(())
}

/// Resolves on the first shutdown signal the process receives.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
