// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the storefront, scraped from `GET /metrics`.
//
// - Counter:   only goes up (requests, orders, emails)
// - Gauge:     current value (stock level per product)
// - Histogram: latency distributions
// =============================================================================

use anyhow::Result;
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

// =============================================================================
// METRIC NAMES
// =============================================================================

/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Labels: outcome (placed, or the error code of a rejected order)
pub const ORDERS_PLACED_TOTAL: &str = "orders_placed_total";

/// Sum of order totals placed since start
pub const ORDER_VALUE_TOTAL: &str = "order_value_total";

/// Labels: product (slug)
pub const PRODUCT_STOCK_LEVEL: &str = "product_stock_level";

/// Labels: outcome (sent/failed/dropped)
pub const ORDER_NOTIFICATIONS_TOTAL: &str = "order_notifications_total";

/// Labels: source (ai/template)
pub const CONTENT_GENERATION_TOTAL: &str = "content_generation_total";

/// Labels: operation
pub const DB_TRANSACTION_DURATION_SECONDS: &str = "db_transaction_duration_seconds";

// =============================================================================
// SETUP
// =============================================================================

/// Installs the global Prometheus recorder and returns its render handle.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    let latency_buckets = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_TRANSACTION_DURATION_SECONDS.to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_counter!(ORDERS_PLACED_TOTAL, "Order placement attempts by outcome");
    describe_counter!(ORDER_VALUE_TOTAL, "Total value of placed orders");
    describe_gauge!(PRODUCT_STOCK_LEVEL, "Remaining stock per product after the last order");
    describe_counter!(ORDER_NOTIFICATIONS_TOTAL, "Order confirmation emails by outcome");
    describe_counter!(CONTENT_GENERATION_TOTAL, "Generated marketing copy by source");
    describe_histogram!(
        DB_TRANSACTION_DURATION_SECONDS,
        "Duration of multi-statement database transactions in seconds"
    );

    Ok(handle)
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Records count and latency of every request, labelled by route template
/// (`/products/:slug`) rather than the raw path.
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    record_http_request(
        &method,
        &endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

pub fn record_order(outcome: &str) {
    counter!(ORDERS_PLACED_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_order_value(total_amount: i64) {
    counter!(ORDER_VALUE_TOTAL).increment(total_amount.max(0) as u64);
}

pub fn set_stock_level(product: &str, level: i32) {
    gauge!(PRODUCT_STOCK_LEVEL, "product" => product.to_string()).set(level as f64);
}

pub fn record_notification(outcome: &str) {
    counter!(ORDER_NOTIFICATIONS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_content_generation(source: &str) {
    counter!(CONTENT_GENERATION_TOTAL, "source" => source.to_string()).increment(1);
}

pub fn record_db_transaction(operation: &str, duration_secs: f64) {
    histogram!(
        DB_TRANSACTION_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}
