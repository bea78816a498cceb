//! Response instrumentation.
//!
//! Collectors are created by the caller against a `prometheus::Registry` the
//! caller owns (pass `prometheus::default_registry()` for the process-wide
//! one), then handed to the adapter that feeds them. Registering the same
//! collector twice in one registry fails with
//! [`Error::DuplicateCollector`]; treat it as a fatal configuration error.
//!
//! | Collector | Metric | Type | Labels |
//! |---|---|---|---|
//! | [`ResponseCounter`] | `http_requests_total` | counter | `endpoint`, `code`, `method` |
//! | [`ResponseTimer`] | `http_requests_secs` | histogram | `endpoint`, `code`, `method` |
//!
//! `code` is the status the response goes out with: the first one written,
//! including by an outer layer before the collector saw the request, and
//! `200` if none was written.

use std::fmt;
use std::time::Instant;

use http::StatusCode;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::adapter::Adapter;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::request::Request;
use crate::sink::{ResponseSink, StatusRecorder};

const LABELS: [&str; 3] = ["endpoint", "code", "method"];

/// Counts responses by endpoint, status code and method.
#[derive(Clone)]
pub struct ResponseCounter {
    requests: IntCounterVec,
}

impl ResponseCounter {
    pub const NAME: &'static str = "http_requests_total";

    /// Registers `http_requests_total` in `registry`.
    pub fn register(registry: &Registry) -> Result<Self, Error> {
        Self::register_with(
            registry,
            Opts::new(
                Self::NAME,
                "How many HTTP requests processed, partitioned by endpoint, status code, and HTTP method.",
            ),
        )
    }

    /// Registers a counter with custom options (name, namespace, help).
    pub fn register_with(registry: &Registry, opts: Opts) -> Result<Self, Error> {
        let name = opts.fq_name();
        let requests = IntCounterVec::new(opts, &LABELS).map_err(Error::Metrics)?;
        register(registry, &name, Box::new(requests.clone()))?;
        Ok(Self { requests })
    }

    /// Current count for one label triple.
    pub fn get(&self, endpoint: &str, code: StatusCode, method: &http::Method) -> u64 {
        self.requests
            .with_label_values(&[endpoint, code.as_str(), method.as_str()])
            .get()
    }
}

/// Observes response times by endpoint, status code and method.
#[derive(Clone)]
pub struct ResponseTimer {
    seconds: HistogramVec,
}

impl ResponseTimer {
    pub const NAME: &'static str = "http_requests_secs";

    /// Registers `http_requests_secs` in `registry` with the default buckets.
    pub fn register(registry: &Registry) -> Result<Self, Error> {
        Self::register_with(
            registry,
            HistogramOpts::new(
                Self::NAME,
                "The response times to HTTP requests, partitioned by endpoint, status code, and HTTP method.",
            ),
        )
    }

    /// Registers a histogram with custom options (name, help, buckets).
    pub fn register_with(registry: &Registry, opts: HistogramOpts) -> Result<Self, Error> {
        let name = opts.common_opts.fq_name();
        let seconds = HistogramVec::new(opts, &LABELS).map_err(Error::Metrics)?;
        register(registry, &name, Box::new(seconds.clone()))?;
        Ok(Self { seconds })
    }

    /// Number of observations for one label triple.
    pub fn sample_count(&self, endpoint: &str, code: StatusCode, method: &http::Method) -> u64 {
        self.seconds
            .with_label_values(&[endpoint, code.as_str(), method.as_str()])
            .get_sample_count()
    }

    /// The underlying histogram, for reading sums or bucket counts.
    pub fn collector(&self) -> &HistogramVec {
        &self.seconds
    }
}

impl fmt::Debug for ResponseCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCounter").finish_non_exhaustive()
    }
}

impl fmt::Debug for ResponseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseTimer").finish_non_exhaustive()
    }
}

fn register(
    registry: &Registry,
    name: &str,
    collector: Box<dyn prometheus::core::Collector>,
) -> Result<(), Error> {
    registry.register(collector).map_err(|e| match e {
        prometheus::Error::AlreadyReg => Error::DuplicateCollector(name.to_owned()),
        e => Error::Metrics(e),
    })
}

/// Counts every response in `counter` once the wrapped handler completes.
///
/// Clone the returned adapter to count several handlers in the same
/// collector.
pub fn count_http_responses(counter: &ResponseCounter) -> Adapter {
    let counter = counter.clone();
    Adapter::new("count_http_responses", move |inner| {
        boxed(CountResponses { counter: counter.clone(), inner })
    })
}

/// Records the wall-clock time of every response in `timer`.
pub fn track_http_response_times(timer: &ResponseTimer) -> Adapter {
    let timer = timer.clone();
    Adapter::new("track_http_response_times", move |inner| {
        boxed(TrackResponseTimes { timer: timer.clone(), inner })
    })
}

struct CountResponses {
    counter: ResponseCounter,
    inner: BoxedHandler,
}

impl Handler for CountResponses {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        Box::pin(async move {
            let endpoint = req.path().to_owned();
            let method = req.method().clone();
            let mut recorder = StatusRecorder::new(res);
            self.inner.serve(req, &mut recorder).await;
            self.counter
                .requests
                .with_label_values(&[endpoint.as_str(), recorder.status().as_str(), method.as_str()])
                .inc();
        })
    }
}

struct TrackResponseTimes {
    timer: ResponseTimer,
    inner: BoxedHandler,
}

impl Handler for TrackResponseTimes {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseSink) -> BoxFuture<'a> {
        Box::pin(async move {
            let endpoint = req.path().to_owned();
            let method = req.method().clone();
            let mut recorder = StatusRecorder::new(res);
            let start = Instant::now();
            self.inner.serve(req, &mut recorder).await;
            self.timer
                .seconds
                .with_label_values(&[endpoint.as_str(), recorder.status().as_str(), method.as_str()])
                .observe(start.elapsed().as_secs_f64());
        })
    }
}
