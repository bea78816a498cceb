//! Policy adapters.
//!
//! Each function here returns an [`Adapter`](crate::Adapter). Stack them
//! with [`adapt`](crate::adapt) or [`Chain`](crate::Chain); the first one
//! listed runs first.
//!
//! | Adapter | Delegates when | Otherwise |
//! |---|---|---|
//! | [`notify`] | always | |
//! | [`request_method`] | method matches | `405` |
//! | [`get_and_other_request`] | GET (other method → second handler) | `405` |
//! | [`disallow_longer_paths`] | path is exact | not-found handler |
//! | [`ensure_https`] | TLS or trusted `X-Forwarded-Proto` | `307` to https |
//! | [`on_check`] / [`check_and_redirect`] | check is true | fallback handler |
//! | [`add_header`] / [`add_header_with_func`] | always, header set first | |
//! | [`add_cookie_with_func`] | always, cookie written first | |
//! | [`inject_value`] | always, value attached first | |
//! | [`count_http_responses`] / [`track_http_response_times`] | always, observed after | |
//!
//! [`HttpsRedirect`] is not an adapter: it is the whole handler for a
//! plaintext listener.

mod check;
mod https;
mod inject;
mod method;
mod metrics;
mod notify;
mod path;

pub use check::{HandlerChecker, check_and_redirect, check_and_redirect_to, on_check};
pub use https::{HttpsRedirect, X_FORWARDED_PROTO, ensure_https};
pub use inject::{
    add_cookie_with_func, add_cookie_with_request_func, add_header, add_header_with_func,
    inject_value,
};
pub use method::{get_and_other_request, request_method};
pub use metrics::{ResponseCounter, ResponseTimer, count_http_responses, track_http_response_times};
pub use notify::notify;
pub use path::disallow_longer_paths;
