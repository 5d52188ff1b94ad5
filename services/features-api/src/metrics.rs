//! Request metrics, exported through the Prometheus recorder installed in `main`.

use metrics::{counter, histogram};

pub fn record_request(endpoint: &'static str) {
    counter!("features_requests_total", "endpoint" => endpoint).increment(1);
}

pub fn record_failure(endpoint: &'static str, status: u16) {
    counter!("features_request_errors_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
}

pub fn record_items(returned: u64, duration_ms: f64) {
    counter!("features_items_returned").increment(returned);
    histogram!("features_items_duration_ms").record(duration_ms);
}
