use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder. One per binary, called
/// once at startup; the returned handle is what `/metrics` renders.
/// Grounded on spec.md §6's "`/metrics` endpoint in Prometheus text format,
/// namespaced by service name" requirement.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let buckets = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    Ok(PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("http_request_duration_seconds".to_string()),
            &buckets,
        )?
        .install_recorder()?)
}

/// Axum middleware recording request rate, a latency histogram, and an
/// in-flight gauge for every route, labelled by `service` so binaries can
/// share one Prometheus registry namespace without colliding.
pub async fn track_requests(service: &'static str, request: Request<Body>, next: Next) -> impl IntoResponse {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();

    gauge!("http_requests_in_flight", "service" => service).increment(1.0);
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(
        "http_requests_total",
        "service" => service,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status,
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "service" => service,
        "method" => method,
        "path" => path,
    )
    .record(elapsed);
    gauge!("http_requests_in_flight", "service" => service).decrement(1.0);

    response
}
