//! Request logging.

use http::{Method, Uri};
use tracing::info;

use crate::adapter::Adapter;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::sink::ResponseSink;

/// Logs when a request starts being handled and when it is finished.
///
/// The completion event comes from a drop guard armed before the inner
/// handler runs, so it is emitted exactly once however control leaves the
/// inner call: a normal return, a panic, or the transport dropping the
/// request future.
pub fn notify() -> Adapter {
    Adapter::new("notify", |inner| boxed(Notify { inner }))
}

struct Notify {
    inner: BoxedHandler,
}

impl Handler for Notify {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        Box::pin(async move {
            info!(method = %req.method(), uri = %req.uri(), "handling request");
            let _done = Handled {
                method: req.method().clone(),
                uri: req.uri().clone(),
            };
            self.inner.serve(req, res).await;
        })
    }
}

struct Handled {
    method: Method,
    uri: Uri,
}

impl Drop for Handled {
    fn drop(&mut self) {
        info!(method = %self.method, uri = %self.uri, "request handled");
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use http::StatusCode;
    use tracing::Subscriber;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    use super::*;
    use crate::adapter::adapt;
    use crate::handler::{dispatch, handler_fn, writer_fn};

    /// Collects the message of every event.
    #[derive(Clone, Default)]
    struct Messages(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor<'a>(&'a mut Option<String>);

    impl Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                *self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Messages {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut message = None;
            event.record(&mut MessageVisitor(&mut message));
            if let Some(message) = message {
                self.0.lock().unwrap().push(message);
            }
        }
    }

    impl Messages {
        fn count(&self, message: &str) -> usize {
            self.0.lock().unwrap().iter().filter(|m| *m == message).count()
        }
    }

    fn get() -> Request {
        Request::from(http::Request::get("/login?next=/").body(Bytes::new()).unwrap())
    }

    #[test]
    fn logs_start_and_completion() {
        let messages = Messages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = adapt(writer_fn(|_req, res| res.write_status(StatusCode::OK)), &[notify()]);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(dispatch(&app, get()));

        assert_eq!(messages.count("handling request"), 1);
        assert_eq!(messages.count("request handled"), 1);
    }

    #[test]
    fn logs_completion_when_request_is_dropped() {
        let messages = Messages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = adapt(
            handler_fn(|_req| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
            &[notify()],
        );
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let outcome =
            rt.block_on(async { tokio::time::timeout(Duration::from_millis(5), dispatch(&app, get())).await });

        assert!(outcome.is_err());
        assert_eq!(messages.count("handling request"), 1);
        assert_eq!(messages.count("request handled"), 1);
    }

    #[test]
    fn logs_completion_when_inner_panics() {
        let messages = Messages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = adapt(writer_fn(|_req, _res| panic!("handler blew up")), &[notify()]);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(dispatch(&app, get()))));

        assert!(outcome.is_err());
        assert_eq!(messages.count("request handled"), 1);
    }
}
