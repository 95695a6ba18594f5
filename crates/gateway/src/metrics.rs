use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const METER_NAME: &str = "gateway";

/// Request and inference instruments; no-ops unless a meter provider is installed.
#[derive(Clone)]
pub struct Metrics {
    requests: Counter<u64>,
    inference_duration: Histogram<f64>,
    detections: Counter<u64>,
}

impl Metrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            requests: meter
                .u64_counter("detector_requests_total")
                .with_description("Requests received per endpoint")
                .build(),
            inference_duration: meter
                .f64_histogram("detector_inference_duration_seconds")
                .with_description("Time to run one image through the detector")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            detections: meter
                .u64_counter("detector_detections_total")
                .with_description("Total detections produced")
                .build(),
        }
    }

    pub fn record_request(&self, endpoint: &'static str) {
        self.requests.add(1, &[KeyValue::new("endpoint", endpoint)]);
    }

    pub fn record_inference(&self, elapsed: Duration, detections: usize) {
        self.inference_duration.record(elapsed.as_secs_f64(), &[]);
        self.detections.add(detections as u64, &[]);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
