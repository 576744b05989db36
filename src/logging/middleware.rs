//! Request span for the HTTP trace layer

use axum::http::Request;
use tracing::Span;

/// Span wrapping one API request.
///
/// Used as `TraceLayer::make_span_with`; the query string is recorded because
/// it carries the selected date range.
pub fn request_span<B>(request: &Request<B>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        query = request.uri().query().unwrap_or(""),
    )
}
