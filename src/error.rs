//! Unified error type.

use http::header::InvalidHeaderValue;

/// Boxed error for caller-supplied fallible functions and body errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by plait's fallible setup operations.
///
/// Policy outcomes (405, 404, 307) are expressed as responses written to the
/// [`ResponseSink`](crate::ResponseSink), not as `Error`s. This type surfaces
/// configuration failures while a chain is being built.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A collector with this name is already registered. Treat as fatal.
    #[error("collector `{0}` is already registered")]
    DuplicateCollector(String),

    #[error("metrics: {0}")]
    Metrics(#[source] prometheus::Error),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}
