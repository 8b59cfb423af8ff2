//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "rabbit_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "rabbit_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "rabbit_http_requests_in_flight";

    // Marketplace metrics
    pub const TASKS_CREATED_TOTAL: &str = "rabbit_tasks_created_total";
    pub const SUBMISSIONS_TOTAL: &str = "rabbit_submissions_total";
    pub const COINS_MOVED_TOTAL: &str = "rabbit_coins_moved_total";
    pub const PAYMENT_EVENTS_TOTAL: &str = "rabbit_payment_events_total";
    pub const WEBHOOK_EVENTS_TOTAL: &str = "rabbit_webhook_events_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "rabbit_rate_limit_hits_total";
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid pattern")
});

static EMAIL_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[^/@]+(@|%40)[^/]+").expect("valid email pattern"));

static INTENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/pi_[A-Za-z0-9]+").expect("valid intent pattern"));

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_task_created() {
    counter!(names::TASKS_CREATED_TOTAL).increment(1);
}

/// Record a submission lifecycle step (`created`, `approved`, `rejected`).
pub fn record_submission(outcome: &'static str) {
    counter!(names::SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record coins entering or leaving circulation.
pub fn record_coins_moved(operation: &'static str, delta: i64) {
    let direction = if delta >= 0 { "credit" } else { "debit" };
    counter!(
        names::COINS_MOVED_TOTAL,
        "operation" => operation,
        "direction" => direction
    )
    .increment(delta.unsigned_abs());
}

pub fn record_payment_event(event: &'static str) {
    counter!(names::PAYMENT_EVENTS_TOTAL, "event" => event).increment(1);
}

pub fn record_webhook_event(event_type: &str) {
    let labels = [("type", event_type.to_string())];
    counter!(names::WEBHOOK_EVENTS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove IDs, emails, etc.).
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    let path = EMAIL_SEGMENT.replace_all(&path, "/:email");
    let path = INTENT_SEGMENT.replace_all(&path, "/:intent_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
