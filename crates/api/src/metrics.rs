/*!
 * Prometheus metrics exposed on the side listener (§4.8, §6).
 */

use lazy_static::lazy_static;
use prometheus::{
    opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("zebrahook_http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"]
    )
    .expect("metric can be created");

    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "zebrahook_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("metric can be created");

    pub static ref EVENTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        opts!("zebrahook_events_submitted_total", "Total number of events submitted"),
        &["outcome"]
    )
    .expect("metric can be created");
}

/// Render all registered metrics in Prometheus exposition format.
pub fn render_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
