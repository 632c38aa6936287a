use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    request_counter: Counter<u64>,
    classification_counter: Counter<u64>,
    inference_duration: Histogram<u64>,
    sampled_frames: Histogram<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("deepfake_server");
        global::set_meter_provider(provider);

        let request_counter = meter
            .u64_counter("requests_total")
            .with_description("Total number of requests")
            .build();

        let classification_counter = meter
            .u64_counter("classifications_total")
            .with_description("Classification verdicts by label and media kind")
            .build();

        let inference_duration = meter
            .u64_histogram("inference_duration_ms")
            .with_boundaries(generate_boundaries((5, 50, 100, 500, 5000)))
            .with_description("Duration of decode and inference in milliseconds")
            .build();

        let sampled_frames = meter
            .u64_histogram("sampled_frames")
            .with_boundaries(vec![1.0, 2.0, 5.0, 10.0, 15.0, 20.0, 32.0])
            .with_description("Frames fed to the model per request")
            .build();

        Ok(Metrics {
            request_counter,
            classification_counter,
            inference_duration,
            sampled_frames,
            registry,
        })
    }

    pub fn record_request(&self, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.request_counter.add(1, &attributes);
    }

    pub fn record_classification(&self, label: &str, media: &str, frames: usize) {
        let attributes = vec![
            KeyValue::new("label", label.to_string()),
            KeyValue::new("media", media.to_string()),
        ];
        self.classification_counter.add(1, &attributes);
        self.sampled_frames.record(
            frames as u64,
            &[KeyValue::new("media", media.to_string())],
        );
    }

    pub fn record_inference_duration(&self, duration_ms: u64, media: &str) {
        let attributes = vec![KeyValue::new("media", media.to_string())];
        self.inference_duration.record(duration_ms, &attributes);
    }
}

fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 5;
    let middle_step: usize = 10;
    let end_step: usize = 50;
    let tail_step: usize = 500;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}
