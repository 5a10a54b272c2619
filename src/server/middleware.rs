//! Request-tracking middleware.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::AppState;
use super::metrics::{HttpLabels, HttpLabelsWithStatus, HttpMethod};

/// Record count and latency for every request, labelled by route pattern
/// rather than raw path so ids do not explode the cardinality.
pub(crate) async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = HttpMethod::from(request.method());
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    state
        .metrics
        .http_request_duration_seconds
        .get_or_create(&HttpLabels {
            method: method.clone(),
            endpoint: endpoint.clone(),
        })
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .http_requests_total
        .get_or_create(&HttpLabelsWithStatus {
            method,
            endpoint,
            status: response.status().as_u16(),
        })
        .inc();

    response
}
